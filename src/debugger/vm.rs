//! Hook surface of the bytecode virtual machine as seen by the debugger agent.
//!
//! The interpreter, its object model and garbage collector live outside this crate,
//! the agent talks to them only through the traits below.

use crate::debugger::debug_info::DebugInfoExtractor;
use std::fmt::Debug;
use std::rc::Rc;

/// Loaded bytecode file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Method inside a bytecode file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

/// VM level code position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BytecodeLocation {
    pub file: FileId,
    pub method: MethodId,
    pub offset: u32,
    /// Url of the source the method was compiled from. For merged bytecode files
    /// this differs between methods of the same file.
    pub source_file: String,
}

impl BytecodeLocation {
    pub fn new(file: FileId, method: MethodId, offset: u32, source_file: impl Into<String>) -> Self {
        Self {
            file,
            method,
            offset,
            source_file: source_file.into(),
        }
    }
}

/// Literal accepted by the textual evaluation mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Undefined,
    String(String),
    Number(f64),
}

/// Runtime class of an object value.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectClass {
    Object,
    Array { length: u32 },
    Function { name: String, constructor: bool, generator: bool },
    Error { name: String, message: String },
    RegExp { source: String },
    Date { repr: String },
    Map { size: u32 },
    Set { size: u32 },
    WeakMap,
    WeakSet,
    Iterator,
    Generator,
    Promise,
    Proxy,
    TypedArray { name: String, length: u32 },
    ArrayBuffer { byte_length: u32 },
    DataView,
    Global,
    SourceTextModule,
    Other { class_name: String },
}

/// Runtime kind of a VM value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    BigInt(String),
    Symbol(String),
    Object(ObjectClass),
}

/// Handle to a VM value. Cloning a handle keeps the value alive.
pub trait VmValue: Clone + Debug {
    fn kind(&self) -> ValueKind;

    fn is_object(&self) -> bool {
        matches!(self.kind(), ValueKind::Object(_))
    }

    fn is_proxy(&self) -> bool {
        matches!(self.kind(), ValueKind::Object(ObjectClass::Proxy))
    }

    fn is_function(&self) -> bool {
        matches!(self.kind(), ValueKind::Object(ObjectClass::Function { .. }))
    }

    fn is_constructor(&self) -> bool {
        matches!(
            self.kind(),
            ValueKind::Object(ObjectClass::Function {
                constructor: true,
                ..
            })
        )
    }

    fn is_error(&self) -> bool {
        matches!(self.kind(), ValueKind::Object(ObjectClass::Error { .. }))
    }
}

/// Snapshot of one activation record, usable to re-enter the frame while the VM stays
/// suspended.
pub trait VmFrame: Clone {
    type Value: VmValue;

    /// Native or foreign frame without bytecode.
    fn is_native(&self) -> bool;
    fn file(&self) -> FileId;
    fn method(&self) -> MethodId;
    fn function_name(&self) -> String;
    fn bytecode_offset(&self) -> u32;
    fn register(&self, index: u32) -> Self::Value;
    /// Named slots of the frame lexical environment, `None` if the environment carries
    /// no scope debug information.
    fn environment(&self) -> Option<Vec<(String, Self::Value)>>;
}

/// Object property as reported by the VM.
#[derive(Debug, Clone)]
pub struct Property<V> {
    pub name: String,
    /// Set for symbol keyed properties.
    pub symbol: Option<V>,
    pub value: Option<V>,
    pub getter: Option<V>,
    pub setter: Option<V>,
    pub writable: bool,
    pub configurable: bool,
    pub enumerable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeapUsage {
    pub used: f64,
    pub total: f64,
}

pub trait Vm {
    type Value: VmValue;
    type Frame: VmFrame<Value = Self::Value>;

    /// Prefix of a serialized precompiled function.
    const BYTECODE_MAGIC: &'static [u8];

    // ------------------------------------ files and debug info ----------------------------------

    fn find_file(&self, file_name: &str) -> Option<FileId>;
    fn file_name(&self, file: FileId) -> String;
    fn main_method(&self, file: FileId, entry_point: &str) -> Option<MethodId>;
    fn extractor(&self, file: FileId) -> Option<Rc<dyn DebugInfoExtractor>>;
    /// Extractor of a hot reload patch that replaces the source with given url.
    fn patch_extractor(&self, url: &str) -> Option<Rc<dyn DebugInfoExtractor>>;
    /// File that was patched by `file` if it is a hot reload patch, `file` itself otherwise.
    fn base_file(&self, file: FileId) -> FileId;
    /// Return true if file is a module file (not a bundle, new bytecode version).
    fn is_module_file(&self, file: FileId) -> bool;

    // ------------------------------------ breakpoints -------------------------------------------

    fn set_breakpoint(&mut self, location: &BytecodeLocation, condition: Option<Self::Value>)
        -> bool;
    fn remove_breakpoint(&mut self, location: &BytecodeLocation) -> bool;
    fn remove_all_breakpoints(&mut self);

    // ------------------------------------ stack -------------------------------------------------

    fn stack_depth(&self) -> u32;
    /// All frames of the current stack, innermost first, native frames included.
    fn walk_stack(&self) -> Vec<Self::Frame>;
    fn current_module(&self) -> Option<Self::Value>;
    /// Local export, indirect export and import bindings of a module.
    fn module_variables(&self, module: &Self::Value) -> Vec<(String, Self::Value)>;

    // ------------------------------------ exceptions --------------------------------------------

    fn take_exception(&mut self) -> Option<Self::Value>;
    fn set_exception(&mut self, exception: Option<Self::Value>);
    fn has_pending_exception(&self) -> bool;
    /// Return true if the pending exception will be caught by user code.
    fn is_exception_caught(&self) -> bool;
    /// Clear the pending exception and return its printable description.
    fn describe_uncaught_exception(&mut self) -> String;

    // ------------------------------------ values ------------------------------------------------

    fn undefined(&self) -> Self::Value;
    fn new_value(&mut self, literal: &Literal) -> Self::Value;
    fn new_object(&mut self) -> Self::Value;
    fn new_eval_error(&mut self, message: &str) -> Self::Value;
    fn global_object(&self) -> Self::Value;
    fn has_property(&self, object: &Self::Value, name: &str) -> bool;
    /// Define writable, enumerable and configurable data property.
    fn define_property(&mut self, object: &Self::Value, name: &str, value: Self::Value);
    fn own_properties(&self, object: &Self::Value) -> Vec<Property<Self::Value>>;
    fn prototype(&self, object: &Self::Value) -> Self::Value;
    /// `prototype` property of a constructor.
    fn function_prototype(&self, function: &Self::Value) -> Self::Value;

    // ------------------------------------ evaluation --------------------------------------------

    /// Build a function from a serialized precompiled payload, `None` if the payload is invalid.
    fn compile_function(&mut self, payload: &[u8]) -> Option<Self::Value>;
    /// Call a compiled function with the frame as its lexical context.
    fn call_on_frame(&mut self, function: &Self::Value, frame: &Self::Frame) -> Self::Value;
    fn frame_variable(&mut self, frame: &Self::Frame, name: &str) -> Option<Self::Value>;
    fn set_frame_variable(&mut self, frame: &Self::Frame, name: &str, value: Self::Value) -> bool;
    /// Register frame that symbol resolution should use during evaluation.
    fn set_eval_frame(&mut self, frame: Option<&Self::Frame>);

    // ------------------------------------ misc --------------------------------------------------

    fn set_mixed_debug_enabled(&mut self, enabled: bool);
    fn heap_usage(&self) -> HeapUsage;
}

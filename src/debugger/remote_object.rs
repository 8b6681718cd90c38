use crate::debugger::error::Error;
use crate::debugger::vm::{ObjectClass, ValueKind, Vm, VmValue};
use crate::protocol::types::{CallFrameId, ObjectSubType, ObjectType, RemoteObject, RemoteObjectId};
use log::debug;
use std::collections::HashMap;

/// Identity of a call frame within one pause cycle.
///
/// Tokens minted in earlier pauses never match the current arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken {
    generation: u64,
    frame: CallFrameId,
}

/// Values and frames exposed to the frontend during a pause.
///
/// The arena owns a handle to every value that has a remote object id, so resetting it
/// releases all of them at once. Ids start from 0 after each reset.
pub struct PauseArena<V: Vm> {
    generation: u64,
    objects: Vec<V::Value>,
    scopes: HashMap<FrameToken, RemoteObjectId>,
    frames: Vec<V::Frame>,
}

impl<V: Vm> Default for PauseArena<V> {
    fn default() -> Self {
        Self {
            generation: 0,
            objects: vec![],
            scopes: HashMap::new(),
            frames: vec![],
        }
    }
}

impl<V: Vm> PauseArena<V> {
    /// Drop every value, scope binding and frame handle, start a new generation.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.objects.clear();
        self.scopes.clear();
        self.frames.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Keep a value alive until the next reset and return its id.
    pub fn register(&mut self, value: V::Value) -> RemoteObjectId {
        self.objects.push(value);
        RemoteObjectId((self.objects.len() - 1) as u32)
    }

    pub fn get(&self, id: RemoteObjectId) -> Option<&V::Value> {
        self.objects.get(id.0 as usize)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Save frame handle for later evaluation, frames are numbered in push order.
    pub fn push_frame(&mut self, frame: V::Frame) -> CallFrameId {
        self.frames.push(frame);
        CallFrameId((self.frames.len() - 1) as u32)
    }

    pub fn frame(&self, id: CallFrameId) -> Option<&V::Frame> {
        self.frames.get(id.0 as usize)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_token(&self, frame: CallFrameId) -> FrameToken {
        FrameToken {
            generation: self.generation,
            frame,
        }
    }

    pub fn bind_scope(&mut self, token: FrameToken, object: RemoteObjectId) {
        self.scopes.insert(token, object);
    }

    pub fn scope_object(&self, token: FrameToken) -> Option<RemoteObjectId> {
        if token.generation != self.generation {
            return None;
        }
        self.scopes.get(&token).copied()
    }

    /// Describe a value without registering it.
    pub fn from_tagged(value: &V::Value) -> RemoteObject {
        RemoteObject::from(value.kind())
    }

    /// Register value if it is an object (proxies excluded) and set the object id.
    pub fn cache_object_if_needed(&mut self, value: &V::Value, remote: &mut RemoteObject) {
        if value.is_object() && !value.is_proxy() {
            remote.object_id = Some(self.register(value.clone()));
        }
    }

    /// Describe a value and register it if needed.
    pub fn mirror(&mut self, value: &V::Value) -> RemoteObject {
        let mut remote = Self::from_tagged(value);
        self.cache_object_if_needed(value, &mut remote);
        remote
    }

    /// Overwrite an existing variable of the local scope object of a frame.
    pub fn update_scope_object(
        &self,
        vm: &mut V,
        token: FrameToken,
        name: &str,
        value: V::Value,
    ) -> Result<(), Error> {
        let scope = self
            .scope_object(token)
            .and_then(|id| self.get(id))
            .ok_or(Error::ScopeNotFound)?;
        if !vm.has_property(scope, name) {
            return Err(Error::VariableNotFound(name.to_string()));
        }
        debug!(target: "debugger", "update scope object: set new value of {name}");
        vm.define_property(scope, name, value);
        Ok(())
    }
}

fn number(n: f64) -> RemoteObject {
    let mut obj = RemoteObject::new(ObjectType::Number);
    if n.is_nan() {
        obj.unserializable_value = Some("NaN".to_string());
    } else if n.is_infinite() {
        let repr = if n > 0.0 { "Infinity" } else { "-Infinity" };
        obj.unserializable_value = Some(repr.to_string());
    } else if n == 0.0 && n.is_sign_negative() {
        obj.unserializable_value = Some("-0".to_string());
    } else {
        obj.value = serde_json::Number::from_f64(n).map(serde_json::Value::Number);
    }
    obj.description = Some(obj.unserializable_value.clone().unwrap_or_else(|| n.to_string()));
    obj
}

fn object(
    subtype: Option<ObjectSubType>,
    class_name: impl Into<String>,
    description: impl Into<String>,
) -> RemoteObject {
    RemoteObject {
        subtype,
        class_name: Some(class_name.into()),
        description: Some(description.into()),
        ..RemoteObject::new(ObjectType::Object)
    }
}

impl From<ValueKind> for RemoteObject {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Undefined => RemoteObject::undefined(),
            ValueKind::Null => RemoteObject {
                subtype: Some(ObjectSubType::Null),
                value: Some(serde_json::Value::Null),
                ..RemoteObject::new(ObjectType::Object)
            },
            ValueKind::Boolean(b) => RemoteObject {
                value: Some(serde_json::Value::Bool(b)),
                ..RemoteObject::new(ObjectType::Boolean)
            },
            ValueKind::Number(n) => number(n),
            ValueKind::String(s) => RemoteObject {
                value: Some(serde_json::Value::String(s)),
                ..RemoteObject::new(ObjectType::String)
            },
            ValueKind::BigInt(digits) => RemoteObject {
                unserializable_value: Some(format!("{digits}n")),
                description: Some(format!("{digits}n")),
                ..RemoteObject::new(ObjectType::Bigint)
            },
            ValueKind::Symbol(description) => RemoteObject {
                description: Some(description),
                ..RemoteObject::new(ObjectType::Symbol)
            },
            ValueKind::Object(class) => match class {
                ObjectClass::Object => object(
                    None,
                    RemoteObject::OBJECT_CLASS,
                    RemoteObject::OBJECT_DESCRIPTION,
                ),
                ObjectClass::Array { length } => {
                    object(Some(ObjectSubType::Array), "Array", format!("Array({length})"))
                }
                ObjectClass::Function {
                    name, generator, ..
                } => {
                    let class_name = if generator {
                        "GeneratorFunction"
                    } else {
                        "Function"
                    };
                    RemoteObject {
                        class_name: Some(class_name.to_string()),
                        description: Some(format!("function {name}() {{ [native code] }}")),
                        ..RemoteObject::new(ObjectType::Function)
                    }
                }
                ObjectClass::Error { name, message } => {
                    let description = if message.is_empty() {
                        name.clone()
                    } else {
                        format!("{name}: {message}")
                    };
                    object(Some(ObjectSubType::Error), name, description)
                }
                ObjectClass::RegExp { source } => {
                    object(Some(ObjectSubType::Regexp), "RegExp", source)
                }
                ObjectClass::Date { repr } => object(Some(ObjectSubType::Date), "Date", repr),
                ObjectClass::Map { size } => {
                    object(Some(ObjectSubType::Map), "Map", format!("Map({size})"))
                }
                ObjectClass::Set { size } => {
                    object(Some(ObjectSubType::Set), "Set", format!("Set({size})"))
                }
                ObjectClass::WeakMap => object(Some(ObjectSubType::Weakmap), "WeakMap", "WeakMap"),
                ObjectClass::WeakSet => object(Some(ObjectSubType::Weakset), "WeakSet", "WeakSet"),
                ObjectClass::Iterator => {
                    object(Some(ObjectSubType::Iterator), "Iterator", "Iterator")
                }
                ObjectClass::Generator => {
                    object(Some(ObjectSubType::Generator), "Generator", "Generator")
                }
                ObjectClass::Promise => object(Some(ObjectSubType::Promise), "Promise", "Promise"),
                ObjectClass::Proxy => object(Some(ObjectSubType::Proxy), "Object", "Proxy"),
                ObjectClass::TypedArray { name, length } => {
                    let description = format!("{name}({length})");
                    object(Some(ObjectSubType::Typedarray), name, description)
                }
                ObjectClass::ArrayBuffer { byte_length } => object(
                    Some(ObjectSubType::Arraybuffer),
                    "ArrayBuffer",
                    format!("ArrayBuffer({byte_length})"),
                ),
                ObjectClass::DataView => {
                    object(Some(ObjectSubType::Dataview), "DataView", "DataView")
                }
                ObjectClass::Global => object(
                    None,
                    RemoteObject::GLOBAL_CLASS,
                    RemoteObject::GLOBAL_DESCRIPTION,
                ),
                ObjectClass::SourceTextModule => {
                    object(None, "SourceTextModule", "SourceTextModule")
                }
                ObjectClass::Other { class_name } => {
                    let description = class_name.clone();
                    object(None, class_name, description)
                }
            },
        }
    }
}

use crate::debugger::debug_info::{DebugInfoBridge, DebugInfoExtractor};
use crate::debugger::error::Error;
use crate::debugger::vm::{ObjectClass, ValueKind, Vm, VmFrame, VmValue};
use crate::debugger::Debugger;
use crate::protocol::types::{
    CallFrame, CallFrameId, Location, RemoteObject, Scope, ScopeType, ScriptId,
};
use log::{debug, error, warn};

/// Local variable table entries that are never shown to the user.
const HIDDEN_LOCALS: [&str; 4] = ["4newTarget", "0this", "0newTarget", "0funcObj"];
/// Slot holding the running closure, shown under the function name.
const FUNC_OBJ_LOCAL: &str = "4funcObj";
const THIS: &str = "this";
const NEW_TARGET_SLOT: &str = "4newTarget";

impl<V: Vm> Debugger<V> {
    /// Snapshot the stack into protocol call frames, innermost first.
    ///
    /// Returns `None` if the innermost bytecode frame cannot be described. A failure on
    /// a deeper frame cuts the list at that frame.
    pub(super) fn generate_call_frames(&mut self, vm: &mut V) -> Option<Vec<CallFrame>> {
        let mut call_frames = vec![];
        for frame in vm.walk_stack() {
            if frame.is_native() {
                debug!(target: "debugger", "generate call frames: skip native frame");
                continue;
            }

            match self.generate_call_frame(vm, &frame) {
                Ok(call_frame) => {
                    self.arena.push_frame(frame);
                    call_frames.push(call_frame);
                }
                Err(e) if call_frames.is_empty() => {
                    error!(target: "debugger", "generate call frames: innermost frame: {e:#}");
                    return None;
                }
                Err(e) => {
                    warn!(target: "debugger", "generate call frames: stack truncated: {e:#}");
                    break;
                }
            }
        }
        Some(call_frames)
    }

    fn generate_call_frame(&mut self, vm: &mut V, frame: &V::Frame) -> Result<CallFrame, Error> {
        let method = frame.method();
        let file = frame.file();
        let extractor = self
            .debug_info
            .for_file(vm, file)
            .ok_or_else(|| Error::NoExtractor(vm.file_name(file)))?;

        let url = extractor.source_file(method);
        let script_id = self
            .scripts
            .find_by_url(&url)
            .map(|s| s.id)
            .ok_or(Error::UnknownFile)?;
        let (line, column) =
            DebugInfoBridge::source_position(extractor.as_ref(), method, frame.bytecode_offset())?;

        let call_frame_id = CallFrameId(self.arena.frame_count() as u32);
        let (local_scope, this) =
            self.local_scope(vm, frame, extractor.as_ref(), script_id, call_frame_id);
        let mut scope_chain = vec![local_scope];
        if vm.is_module_file(file) {
            // commonjs modules have no source text module record
            let module = vm.current_module().filter(|m| {
                matches!(m.kind(), ValueKind::Object(ObjectClass::SourceTextModule))
            });
            if let Some(module) = module {
                scope_chain.push(self.module_scope(vm, &module));
            }
        }
        scope_chain.push(self.global_scope(vm));

        Ok(CallFrame {
            call_frame_id,
            function_name: frame.function_name(),
            location: Location::new(script_id, line, column),
            url,
            scope_chain,
            this,
        })
    }

    fn local_scope(
        &mut self,
        vm: &mut V,
        frame: &V::Frame,
        extractor: &dyn DebugInfoExtractor,
        script_id: ScriptId,
        call_frame_id: CallFrameId,
    ) -> (Scope, RemoteObject) {
        let local = vm.new_object();
        let object_id = self.arena.register(local.clone());
        let token = self.arena.frame_token(call_frame_id);
        self.arena.bind_scope(token, object_id);

        let this_value = Self::local_variables(vm, frame, extractor, &local);
        let this = self.arena.mirror(&this_value);

        let bounds = DebugInfoBridge::line_table_bounds(extractor, frame.method());
        let scope = Scope {
            r#type: ScopeType::Local,
            object: RemoteObject::object(
                RemoteObject::OBJECT_CLASS,
                RemoteObject::OBJECT_DESCRIPTION,
                object_id,
            ),
            start_location: bounds.map(|(start, _)| Location::new(script_id, start, 0)),
            end_location: bounds.map(|(_, end)| Location::new(script_id, end, 0)),
        };
        (scope, this)
    }

    /// Fill the local scope object from the local variable table and the closure
    /// environment, return the `this` value of the frame.
    fn local_variables(
        vm: &mut V,
        frame: &V::Frame,
        extractor: &dyn DebugInfoExtractor,
        local: &V::Value,
    ) -> V::Value {
        // arrow functions have no `this` in the variable table
        let mut this = None;
        for variable in extractor.local_variable_table(frame.method()) {
            let name = variable.name.as_str();
            if HIDDEN_LOCALS.contains(&name) {
                continue;
            }
            let value = frame.register(variable.register);
            if name == THIS {
                this = Some(value);
                continue;
            }
            if name == FUNC_OBJ_LOCAL {
                if let ValueKind::Object(ObjectClass::Function { name, .. }) = value.kind() {
                    vm.define_property(local, &name, value);
                }
                continue;
            }
            vm.define_property(local, name, value);
        }

        // closure variables live in the lexical environment
        let env = match frame.bytecode_offset() {
            0 => None,
            _ => frame.environment(),
        };
        for (name, value) in env.unwrap_or_default() {
            if name == NEW_TARGET_SLOT {
                continue;
            }
            if name == THIS {
                if this.is_none() {
                    this = Some(value);
                }
                continue;
            }
            if vm.has_property(local, &name) {
                continue;
            }
            vm.define_property(local, &name, value);
        }

        this.unwrap_or_else(|| vm.undefined())
    }

    fn module_scope(&mut self, vm: &mut V, module: &V::Value) -> Scope {
        let scope_object = vm.new_object();
        let object_id = self.arena.register(scope_object.clone());
        for (name, value) in vm.module_variables(module) {
            vm.define_property(&scope_object, &name, value);
        }
        Scope {
            r#type: ScopeType::Module,
            object: RemoteObject::object(
                RemoteObject::OBJECT_CLASS,
                RemoteObject::OBJECT_DESCRIPTION,
                object_id,
            ),
            start_location: None,
            end_location: None,
        }
    }

    fn global_scope(&mut self, vm: &V) -> Scope {
        let object_id = self.arena.register(vm.global_object());
        Scope {
            r#type: ScopeType::Global,
            object: RemoteObject::object(
                RemoteObject::GLOBAL_CLASS,
                RemoteObject::GLOBAL_DESCRIPTION,
                object_id,
            ),
            start_location: None,
            end_location: None,
        }
    }
}

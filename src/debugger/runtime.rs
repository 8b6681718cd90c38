use crate::debugger::error::Error;
use crate::debugger::remote_object::PauseArena;
use crate::debugger::vm::{Vm, VmValue};
use crate::debugger::Debugger;
use crate::protocol::types::{PropertyDescriptor, RemoteObject};
use crate::protocol::{GetHeapUsageReturns, GetPropertiesParams};
use log::error;

impl<V: Vm> Debugger<V> {
    /// Describe properties of an object from the remote object table.
    ///
    /// Accessors, symbols and object values get ids of their own so that the frontend
    /// can expand them further.
    pub fn get_properties(
        &mut self,
        vm: &mut V,
        params: &GetPropertiesParams,
    ) -> Result<Vec<PropertyDescriptor>, Error> {
        let Some(value) = self.arena.get(params.object_id).cloned() else {
            error!(target: "debugger", "get properties: unknown object id {}", params.object_id);
            return Err(Error::UnknownObjectId(params.object_id));
        };
        if !value.is_object() {
            error!(target: "debugger", "get properties: {} is not an object", params.object_id);
            return Err(Error::NotAnObject);
        }

        let mut descriptors = vec![];
        for property in vm.own_properties(&value) {
            let is_accessor = property.getter.is_some() || property.setter.is_some();
            if params.accessor_properties_only && !is_accessor {
                continue;
            }

            let writable = property.value.as_ref().map(|_| property.writable);
            descriptors.push(PropertyDescriptor {
                name: property.name,
                value: property.value.map(|v| self.arena.mirror(&v)),
                writable,
                get: property.getter.map(|g| self.register_tagged(g)),
                set: property.setter.map(|s| self.register_tagged(s)),
                configurable: property.configurable,
                enumerable: property.enumerable,
                is_own: true,
                symbol: property.symbol.map(|s| self.register_tagged(s)),
            });
        }

        self.prototype_properties(vm, &value, params, &mut descriptors);
        Ok(descriptors)
    }

    fn register_tagged(&mut self, value: V::Value) -> RemoteObject {
        let mut remote = PauseArena::<V>::from_tagged(&value);
        remote.object_id = Some(self.arena.register(value));
        remote
    }

    /// Append `prototype` and `__proto__` unless only plain own properties are requested.
    fn prototype_properties(
        &mut self,
        vm: &V,
        value: &V::Value,
        params: &GetPropertiesParams,
        descriptors: &mut Vec<PropertyDescriptor>,
    ) {
        if !params.accessor_properties_only && params.own_properties && !value.is_proxy() {
            return;
        }

        if value.is_constructor() {
            let prototype = vm.function_prototype(value);
            descriptors.push(PropertyDescriptor {
                name: "prototype".to_string(),
                value: Some(self.arena.mirror(&prototype)),
                writable: Some(false),
                get: None,
                set: None,
                configurable: false,
                enumerable: false,
                is_own: true,
                symbol: None,
            });
        }

        let proto = vm.prototype(value);
        descriptors.push(PropertyDescriptor {
            name: "__proto__".to_string(),
            value: Some(self.arena.mirror(&proto)),
            writable: Some(true),
            get: None,
            set: None,
            configurable: true,
            enumerable: false,
            is_own: true,
            symbol: None,
        });
    }

    /// Function calls on remote objects are not supported, the answer is an `EvalError`.
    pub fn call_function_on(&mut self, vm: &mut V) -> RemoteObject {
        let error = vm.new_eval_error("Unsupport eval now");
        PauseArena::<V>::from_tagged(&error)
    }

    pub fn get_heap_usage(&self, vm: &V) -> GetHeapUsageReturns {
        let usage = vm.heap_usage();
        GetHeapUsageReturns {
            used_size: usage.used,
            total_size: usage.total,
        }
    }
}

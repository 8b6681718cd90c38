use crate::debugger::error::Error;
use crate::debugger::remote_object::PauseArena;
use crate::debugger::vm::{Literal, Vm, VmFrame};
use crate::debugger::Debugger;
use crate::protocol::types::{CallFrameId, RemoteObject};
use crate::protocol::EvaluateOnCallFrameParams;
use crate::weak_error;
use base64::prelude::{Engine, BASE64_STANDARD};
use log::error;

/// Decode base64 text, return the payload only if it is a serialized precompiled
/// function (longer than and starting with the magic).
pub(super) fn decode_compiled_payload(magic: &[u8], encoded: &str) -> Option<Vec<u8>> {
    let payload = BASE64_STANDARD.decode(encoded).ok()?;
    (payload.len() > magic.len() && payload.starts_with(magic)).then_some(payload)
}

/// Parse the right hand side of a textual assignment.
pub fn parse_literal(text: &str) -> Option<Literal> {
    match text {
        "false" => Some(Literal::Bool(false)),
        "true" => Some(Literal::Bool(true)),
        "undefined" => Some(Literal::Undefined),
        s if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') => {
            Some(Literal::String(s[1..s.len() - 1].to_string()))
        }
        s => s
            .parse::<f64>()
            .ok()
            .filter(|n| !n.is_nan())
            .map(Literal::Number),
    }
}

impl<V: Vm> Debugger<V> {
    /// Evaluate an expression in the context of a call frame of the current pause.
    ///
    /// The expression is either a base64 encoded precompiled function or plain text of
    /// form `name` (read a variable) or `name = literal` (write a variable).
    pub fn evaluate_on_call_frame(
        &mut self,
        vm: &mut V,
        params: &EvaluateOnCallFrameParams,
    ) -> Result<RemoteObject, Error> {
        if !self.paused {
            return Err(Error::NotPaused);
        }
        let call_frame_id = params.call_frame_id;
        let frame = self
            .arena
            .frame(call_frame_id)
            .cloned()
            .ok_or(Error::InvalidCallFrameId)?;

        match decode_compiled_payload(V::BYTECODE_MAGIC, &params.expression) {
            Some(payload) => self.evaluate_compiled(vm, &frame, &payload),
            None => {
                error!(target: "debugger", "evaluate: expression is not a compiled function");
                self.evaluate_text(vm, call_frame_id, &frame, &params.expression)
                    .inspect_err(|_| {
                        error!(target: "debugger", "evaluate fail, expression: {}", params.expression)
                    })
            }
        }
    }

    fn evaluate_compiled(
        &mut self,
        vm: &mut V,
        frame: &V::Frame,
        payload: &[u8],
    ) -> Result<RemoteObject, Error> {
        let Some(function) = vm.compile_function(payload) else {
            return Err(Self::eval_error(vm, "Internal error."));
        };
        let result = vm.call_on_frame(&function, frame);
        if vm.has_pending_exception() {
            error!(target: "debugger", "evaluate: has pending exception");
            let message = vm.describe_uncaught_exception();
            return Err(Self::eval_error(vm, &message));
        }
        Ok(self.arena.mirror(&result))
    }

    fn evaluate_text(
        &mut self,
        vm: &mut V,
        call_frame_id: CallFrameId,
        frame: &V::Frame,
        expression: &str,
    ) -> Result<RemoteObject, Error> {
        if frame.is_native() {
            return Err(Self::eval_error(vm, "Native Frame not support."));
        }
        if self.debug_info.for_file(vm, frame.file()).is_none() {
            return Err(Self::eval_error(vm, "Internal error."));
        }

        let (name, value) = match expression.split_once('=') {
            Some((name, value)) => (name.trim_matches(' '), value.trim_matches(' ')),
            None => (expression.trim_matches(' '), ""),
        };

        if value.is_empty() {
            if let Some(found) = vm.frame_variable(frame, name) {
                return Ok(self.arena.mirror(&found));
            }
        } else {
            let literal = parse_literal(value).ok_or(Error::UnsupportedExpression)?;
            let new_value = vm.new_value(&literal);

            vm.set_eval_frame(Some(frame));
            let written = vm.set_frame_variable(frame, name, new_value.clone());
            vm.set_eval_frame(None);

            if written {
                let token = self.arena.frame_token(call_frame_id);
                weak_error!(
                    self.arena
                        .update_scope_object(vm, token, name, new_value.clone()),
                    "update scope object:"
                );
                return Ok(PauseArena::<V>::from_tagged(&new_value));
            }
        }

        Err(Self::eval_error(vm, "Unsupported expression."))
    }

    /// Wrap a message into an `EvalError` object, the VM exception never leaves the agent.
    fn eval_error(vm: &mut V, message: &str) -> Error {
        let exception = vm.new_eval_error(message);
        Error::Evaluation {
            message: message.to_string(),
            exception: Box::new(PauseArena::<V>::from_tagged(&exception)),
        }
    }
}

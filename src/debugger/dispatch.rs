use crate::agent_error;
use crate::debugger::error::Error;
use crate::debugger::vm::Vm;
use crate::debugger::Debugger;
use crate::protocol::{
    DispatchRequest, EmptyReturns, EnableReturns, EvaluateReturns, GetPossibleBreakpointsReturns,
    GetPropertiesReturns, GetScriptSourceReturns, Request, Response, Returns,
};
use log::{debug, warn};

impl<V: Vm> Debugger<V> {
    /// Execute a request and build the response. Never fails, errors become failure responses.
    pub fn dispatch(&mut self, vm: &mut V, request: DispatchRequest) -> Response {
        let DispatchRequest {
            id,
            method,
            request,
        } = request;
        debug!(target: "debugger", "dispatch [{method}]");

        match request.and_then(|request| self.execute(vm, request)) {
            Ok(returns) => Response::ok(id, returns),
            Err(e) => {
                if e.is_internal() {
                    agent_error!(target: "debugger", "[{method}] failed: {e:#}");
                } else {
                    warn!(target: "debugger", "[{method}] failed: {e:#}");
                }
                Response::fail(id, &e)
            }
        }
    }

    fn execute(&mut self, vm: &mut V, request: Request) -> Result<Returns, Error> {
        let empty = || Returns::Empty(EmptyReturns {});

        let returns = match request {
            Request::Enable(_) => Returns::Enable(EnableReturns {
                debugger_id: self.enable(),
            }),
            Request::Disable => {
                self.disable(vm);
                empty()
            }
            Request::EvaluateOnCallFrame(params) => Returns::Evaluate(EvaluateReturns {
                result: self.evaluate_on_call_frame(vm, &params)?,
            }),
            Request::GetPossibleBreakpoints(params) => {
                Returns::GetPossibleBreakpoints(GetPossibleBreakpointsReturns {
                    locations: self.get_possible_breakpoints(vm, &params)?,
                })
            }
            Request::GetScriptSource(params) => Returns::GetScriptSource(GetScriptSourceReturns {
                script_source: self.get_script_source(params.script_id)?,
            }),
            Request::Pause => {
                self.pause();
                empty()
            }
            Request::RemoveBreakpoint(params) => {
                self.remove_breakpoint(vm, &params.breakpoint_id)?;
                empty()
            }
            Request::Resume(_) => {
                self.resume();
                empty()
            }
            Request::SetAsyncCallStackDepth => {
                return Err(Error::Unsupported("SetAsyncCallStackDepth"))
            }
            Request::SetBreakpointByUrl(params) => {
                Returns::SetBreakpointByUrl(self.set_breakpoint_by_url(vm, params)?)
            }
            Request::SetPauseOnExceptions(params) => {
                self.set_pause_on_exceptions(params.state);
                empty()
            }
            Request::StepInto(_) => {
                self.step_into(vm)?;
                empty()
            }
            Request::StepOut => {
                self.step_out(vm)?;
                empty()
            }
            Request::StepOver => {
                self.step_over(vm)?;
                empty()
            }
            Request::SetMixedDebugEnabled(params) => {
                self.set_mixed_debug_enabled(vm, params.enabled);
                empty()
            }
            Request::ReplyNativeCalling(params) => {
                self.reply_native_calling(params.user_code);
                empty()
            }
            Request::SetBlackboxPatterns => return Err(Error::Unsupported("SetBlackboxPatterns")),
            Request::RuntimeEnable | Request::RuntimeDisable => empty(),
            Request::RunIfWaitingForDebugger => {
                self.run_if_waiting_for_debugger();
                empty()
            }
            Request::GetProperties(params) => Returns::GetProperties(GetPropertiesReturns {
                result: self.get_properties(vm, &params)?,
            }),
            Request::CallFunctionOn(_) => Returns::Evaluate(EvaluateReturns {
                result: self.call_function_on(vm),
            }),
            Request::GetHeapUsage => Returns::GetHeapUsage(self.get_heap_usage(vm)),
        };
        Ok(returns)
    }
}

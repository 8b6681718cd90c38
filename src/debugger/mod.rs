pub mod breakpoint;
mod call_frame;
pub mod debug_info;
mod dispatch;
pub mod error;
pub mod evaluate;
pub mod frontend;
pub mod hooks;
pub mod remote_object;
mod runtime;
pub mod script;
pub mod step;
pub mod vm;

pub use error::Error;
pub use hooks::ExecutionHooks;

use crate::config::AgentConfig;
use crate::debugger::breakpoint::BreakpointSpec;
use crate::debugger::debug_info::DebugInfoBridge;
use crate::debugger::frontend::Frontend;
use crate::debugger::remote_object::PauseArena;
use crate::debugger::script::ScriptRegistry;
use crate::debugger::step::{SingleStepper, StepperKind};
use crate::debugger::vm::{BytecodeLocation, Vm, VmValue};
use crate::protocol::channel::ProtocolChannel;
use crate::protocol::events::{NativeCalling, Notification, Paused};
use crate::protocol::types::{PauseOnExceptionsState, PauseReason};
use crate::{agent_debug, agent_info};
use itertools::Itertools;
use log::error;
use uuid::Uuid;

/// What the debugged VM is doing from the agent point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    #[default]
    Running,
    SteppingInto,
    SteppingOver,
    SteppingOut,
    PausedOnBreakpoint,
    PausedOnException,
    PausedOnEntry,
    PausedOnStep,
    PausedOnNativeCall,
}

impl ExecutionState {
    pub fn stepping(kind: StepperKind) -> Self {
        match kind {
            StepperKind::Into => ExecutionState::SteppingInto,
            StepperKind::Over => ExecutionState::SteppingOver,
            StepperKind::Out => ExecutionState::SteppingOut,
        }
    }

    fn paused(reason: PauseReason, on_breakpoint: bool) -> Self {
        match reason {
            _ if on_breakpoint => ExecutionState::PausedOnBreakpoint,
            PauseReason::Exception => ExecutionState::PausedOnException,
            PauseReason::Step => ExecutionState::PausedOnStep,
            _ => ExecutionState::PausedOnEntry,
        }
    }

    pub fn is_paused(self) -> bool {
        matches!(
            self,
            ExecutionState::PausedOnBreakpoint
                | ExecutionState::PausedOnException
                | ExecutionState::PausedOnEntry
                | ExecutionState::PausedOnStep
                | ExecutionState::PausedOnNativeCall
        )
    }
}

/// Per session switches set by the frontend.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub enabled: bool,
    pub pause_on_exceptions: PauseOnExceptionsState,
    /// Pause at the next bytecode that maps to source (set by `pause` or a job entry).
    pub pause_on_next_bytecode: bool,
    pub mixed_debug: bool,
}

/// Debugger agent of a single VM.
///
/// Agent never owns the VM, each operation borrows it for the duration of the call.
/// All methods must be called on the VM thread.
pub struct Debugger<V: Vm> {
    config: AgentConfig,
    frontend: Frontend,
    scripts: ScriptRegistry,
    debug_info: DebugInfoBridge,
    arena: PauseArena<V>,
    session: Session,
    stepper: Option<SingleStepper>,
    state: ExecutionState,
    /// True while the VM is suspended inside `notify_paused`.
    paused: bool,
}

impl<V: Vm> Debugger<V> {
    pub fn new(config: AgentConfig, channel: Option<Box<dyn ProtocolChannel>>) -> Self {
        Self {
            config,
            frontend: Frontend::new(channel),
            scripts: ScriptRegistry::default(),
            debug_info: DebugInfoBridge::default(),
            arena: PauseArena::default(),
            session: Session::default(),
            stepper: None,
            state: ExecutionState::Running,
            paused: false,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn scripts(&self) -> &ScriptRegistry {
        &self.scripts
    }

    pub fn arena(&self) -> &PauseArena<V> {
        &self.arena
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_waiting(&self) -> bool {
        self.frontend.is_waiting()
    }

    /// Start a session. Every already known script is announced again.
    /// Returns a fresh debugger id.
    pub fn enable(&mut self) -> String {
        self.session.enabled = true;
        for script in self.scripts.iter() {
            self.notify(Notification::ScriptParsed(script.parsed_event()));
        }
        let debugger_id = Uuid::new_v4().to_string();
        agent_info!(target: "debugger", "debugger enabled, id: {debugger_id}");
        debugger_id
    }

    /// Stop the session, remove all breakpoints and let a waiting VM go.
    pub fn disable(&mut self, vm: &mut V) {
        vm.remove_all_breakpoints();
        self.resumed();
        self.run_if_waiting_for_debugger();

        self.session.enabled = false;
        self.session.pause_on_next_bytecode = false;
        self.stepper = None;
        self.arena.reset();
        self.state = ExecutionState::Running;
        agent_info!(target: "debugger", "debugger disabled");
    }

    pub fn pause(&mut self) {
        self.session.pause_on_next_bytecode = true;
    }

    pub fn resume(&mut self) {
        self.resumed();
        self.stepper = None;
    }

    pub fn set_pause_on_exceptions(&mut self, state: PauseOnExceptionsState) {
        self.session.pause_on_exceptions = state;
    }

    pub fn set_mixed_debug_enabled(&mut self, vm: &mut V, enabled: bool) {
        vm.set_mixed_debug_enabled(enabled);
        self.session.mixed_debug = enabled;
    }

    /// Answer to a `nativeCalling` notification. Stepping ends once the native
    /// call runs user code.
    pub fn reply_native_calling(&mut self, user_code: bool) {
        self.resumed();
        if user_code {
            self.stepper = None;
        }
    }

    /// Return true if the pending exception must pause execution under the current policy.
    pub fn check_pause_on_exception(&self, vm: &V) -> bool {
        match self.session.pause_on_exceptions {
            PauseOnExceptionsState::None => false,
            PauseOnExceptionsState::Uncaught => !vm.is_exception_caught(),
            PauseOnExceptionsState::All => true,
        }
    }

    fn clean_up_on_paused(&mut self) {
        self.arena.reset();
    }

    /// Resolve the breakpoint a pause location belongs to.
    fn hit_breakpoint(&self, vm: &V, location: &BytecodeLocation) -> Option<BreakpointSpec> {
        let script = self.scripts.find_by_url(&location.source_file)?;
        let extractor = self.debug_info.for_file(vm, location.file)?;
        let line = extractor.line_for_offset(location.method, location.offset)?;
        let column = extractor.column_for_offset(location.method, location.offset)?;
        Some(BreakpointSpec::new(line, column, script.url.clone()))
    }

    /// Suspend the VM and serve the frontend until a resuming command arrives.
    ///
    /// `location` is a breakpoint location, it is `None` for pauses that are not
    /// caused by a breakpoint. A pending exception is kept aside while paused and
    /// restored afterwards.
    pub fn notify_paused(
        &mut self,
        vm: &mut V,
        location: Option<&BytecodeLocation>,
        reason: PauseReason,
    ) {
        if reason == PauseReason::Exception && !self.check_pause_on_exception(vm) {
            return;
        }

        let exception = vm.take_exception();

        let mut hit_breakpoints = vec![];
        if let Some(location) = location {
            match self.hit_breakpoint(vm, location) {
                Some(spec) => hit_breakpoints.push(spec.to_string()),
                None => {
                    error!(target: "debugger", "notify paused: unknown location in {}", location.source_file);
                    vm.set_exception(exception);
                    return;
                }
            }
        }

        self.clean_up_on_paused();
        let Some(call_frames) = self.generate_call_frames(vm) else {
            error!(target: "debugger", "notify paused: failed to generate call frames");
            vm.set_exception(exception);
            return;
        };

        let data = match &exception {
            Some(e) if reason == PauseReason::Exception && e.is_error() => {
                Some(PauseArena::<V>::from_tagged(e))
            }
            _ => None,
        };

        self.state = ExecutionState::paused(reason, location.is_some());
        agent_debug!(
            target: "debugger",
            "paused, reason: {reason}, frames: {}, hit: [{}]",
            call_frames.len(),
            hit_breakpoints.iter().join(", ")
        );
        self.notify(Notification::Paused(Paused {
            call_frames,
            reason,
            hit_breakpoints,
            data,
        }));

        self.paused = true;
        self.wait_for_debugger(vm);
        self.paused = false;

        vm.set_exception(exception);
        self.restore_state();
    }

    /// Called before the VM enters native code. Only step-into stops here, the
    /// frontend decides whether the callee is user code.
    pub fn notify_native_calling(&mut self, vm: &mut V, native_address: u64) {
        if self.stepper.as_ref().map(SingleStepper::kind) != Some(StepperKind::Into) {
            return;
        }

        self.state = ExecutionState::PausedOnNativeCall;
        self.notify(Notification::NativeCalling(NativeCalling { native_address }));
        self.wait_for_debugger(vm);
        self.restore_state();
    }

    /// A queued job starts: an active step continues as a pause at the first
    /// bytecode of the job.
    pub fn notify_pending_job_entry(&mut self) {
        if self.stepper.take().is_some() {
            self.session.pause_on_next_bytecode = true;
            self.state = ExecutionState::Running;
        }
    }

    fn restore_state(&mut self) {
        self.state = match &self.stepper {
            Some(stepper) => ExecutionState::stepping(stepper.kind()),
            None => ExecutionState::Running,
        };
    }
}

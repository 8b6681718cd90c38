use crate::debugger::debug_info::SPECIAL_LINE_MARK;
use crate::debugger::error::Error;
use crate::debugger::vm::{BytecodeLocation, MethodId, Vm, VmFrame};
use crate::debugger::{Debugger, ExecutionState};
use crate::protocol::types::PauseReason;
use crate::{agent_debug, agent_info};
use log::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperKind {
    Into,
    Over,
    Out,
}

impl StepperKind {
    fn operation(self) -> &'static str {
        match self {
            StepperKind::Into => "StepInto",
            StepperKind::Over => "StepOver",
            StepperKind::Out => "StepOut",
        }
    }
}

/// One in-flight step operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleStepper {
    kind: StepperKind,
    start_depth: u32,
    start_method: MethodId,
    start_line: i32,
}

impl SingleStepper {
    pub fn new(kind: StepperKind, start_depth: u32, start_method: MethodId, start_line: i32) -> Self {
        Self {
            kind,
            start_depth,
            start_method,
            start_line,
        }
    }

    pub fn kind(&self) -> StepperKind {
        self.kind
    }

    /// Return true if the step is done at the given position.
    ///
    /// Into completes on any move to another line or method. Over completes on another
    /// position that is not deeper than the start. Out completes once the start frame
    /// is left, the line does not matter.
    pub fn step_complete(&self, depth: u32, method: MethodId, line: i32) -> bool {
        let moved = method != self.start_method || line != self.start_line;
        match self.kind {
            StepperKind::Into => moved,
            StepperKind::Over => depth <= self.start_depth && moved,
            StepperKind::Out => depth < self.start_depth,
        }
    }
}

impl<V: Vm> Debugger<V> {
    pub fn step_into(&mut self, vm: &V) -> Result<(), Error> {
        self.install_stepper(vm, StepperKind::Into)
    }

    pub fn step_over(&mut self, vm: &V) -> Result<(), Error> {
        self.install_stepper(vm, StepperKind::Over)
    }

    pub fn step_out(&mut self, vm: &V) -> Result<(), Error> {
        self.install_stepper(vm, StepperKind::Out)
    }

    /// Replace any active stepper with a new one starting at the current position
    /// and let the VM continue.
    fn install_stepper(&mut self, vm: &V, kind: StepperKind) -> Result<(), Error> {
        if !self.session.enabled {
            return Err(Error::NotPaused);
        }
        let Some((method, line)) = self.current_position(vm) else {
            error!(target: "debugger", "{}: current position is unknown", kind.operation());
            return Err(Error::StepperUnavailable(kind.operation()));
        };

        self.stepper = Some(SingleStepper::new(kind, vm.stack_depth(), method, line));
        self.state = ExecutionState::stepping(kind);
        self.resumed();
        Ok(())
    }

    /// Method and source line of the innermost bytecode frame.
    fn current_position(&self, vm: &V) -> Option<(MethodId, i32)> {
        let frame = vm.walk_stack().into_iter().find(|f| !f.is_native())?;
        let extractor = self.debug_info.for_file(vm, frame.file())?;
        let line = extractor.line_for_offset(frame.method(), frame.bytecode_offset())?;
        Some((frame.method(), line))
    }

    fn location_line(&self, vm: &V, location: &BytecodeLocation) -> Option<i32> {
        self.debug_info
            .for_file(vm, location.file)?
            .line_for_offset(location.method, location.offset)
    }

    /// Called by the VM on every bytecode boundary. Returns a pause reason if execution
    /// must stop here.
    pub fn notify_single_step(&mut self, vm: &V, location: &BytecodeLocation) -> Option<PauseReason> {
        if self.session.pause_on_next_bytecode {
            if self.is_skip_line(vm, location) {
                return None;
            }
            self.session.pause_on_next_bytecode = false;
            agent_info!(target: "debugger", "step complete: pause on next bytecode");
            return Some(PauseReason::Other);
        }

        let stepper = self.stepper.as_ref()?;
        let line = self.location_line(vm, location)?;
        if !stepper.step_complete(vm.stack_depth(), location.method, line) {
            return None;
        }

        // unknown file or line without source
        if self.is_skip_line(vm, location) {
            return None;
        }

        self.stepper = None;
        agent_info!(target: "debugger", "step complete: pause on current bytecode");
        Some(PauseReason::Step)
    }

    /// Return true if no pause may happen at location: its file is not a known script,
    /// has no debug information or the bytecode has no source line.
    pub fn is_skip_line(&self, vm: &V, location: &BytecodeLocation) -> bool {
        // hot reload patches are matched by the file they replace
        let base_name = vm.file_name(vm.base_file(location.file));
        let extractor = match self.scripts.find_by_file_name(&base_name) {
            Some(_) => self.debug_info.for_file(vm, location.file),
            None => None,
        };
        let Some(extractor) = extractor else {
            agent_debug!(target: "debugger", "step complete: skip unknown file {base_name}");
            return true;
        };

        if extractor.line_for_offset(location.method, location.offset) == Some(SPECIAL_LINE_MARK) {
            agent_debug!(target: "debugger", "step complete: skip line without source");
            return true;
        }
        false
    }

    /// Drop the active stepper once the VM returned from the outermost call.
    pub fn clear_single_stepper(&mut self, vm: &V) {
        if self.stepper.is_some() && vm.stack_depth() == 0 {
            self.stepper = None;
            self.state = ExecutionState::Running;
        }
    }

    pub fn stepper(&self) -> Option<&SingleStepper> {
        self.stepper.as_ref()
    }
}

use crate::debugger::vm::{BytecodeLocation, Vm};
use crate::debugger::Debugger;
use crate::protocol::types::PauseReason;
use crate::{agent_debug, agent_info};

/// Events the VM reports to its debugger agent.
///
/// Hooks are called on the VM thread and never fail, all problems are logged.
pub trait ExecutionHooks<V: Vm> {
    /// A bytecode file was loaded, `entry_point` names its main function.
    fn load_module(&mut self, vm: &mut V, file_name: &str, entry_point: &str);
    /// Execution reached an installed breakpoint (its condition, if any, held).
    fn breakpoint(&mut self, vm: &mut V, location: &BytecodeLocation);
    /// An exception was thrown, the VM has it pending.
    fn exception(&mut self, vm: &mut V);
    /// Execution is about to run the bytecode at `location`.
    fn single_step(&mut self, vm: &mut V, location: &BytecodeLocation);
    /// The program asked for a pause itself, for example with a `debugger` statement.
    fn paused(&mut self, vm: &mut V, reason: PauseReason);
    fn native_calling(&mut self, vm: &mut V, native_address: u64);
    fn pending_job_entry(&mut self, vm: &mut V);
    fn vm_start(&mut self, vm: &mut V);
    fn vm_death(&mut self, vm: &mut V);
}

impl<V: Vm> ExecutionHooks<V> for Debugger<V> {
    fn load_module(&mut self, vm: &mut V, file_name: &str, entry_point: &str) {
        let script_id = self.scripts.next_id();
        if self.notify_script_parsed(vm, script_id, file_name, entry_point) {
            agent_info!(target: "debugger", "script {script_id} parsed from {file_name}");
        }
    }

    fn breakpoint(&mut self, vm: &mut V, location: &BytecodeLocation) {
        self.notify_paused(vm, Some(location), PauseReason::Other);
    }

    fn exception(&mut self, vm: &mut V) {
        self.notify_paused(vm, None, PauseReason::Exception);
    }

    fn single_step(&mut self, vm: &mut V, location: &BytecodeLocation) {
        if let Some(reason) = self.notify_single_step(vm, location) {
            self.notify_paused(vm, None, reason);
        }
    }

    fn paused(&mut self, vm: &mut V, reason: PauseReason) {
        self.notify_paused(vm, None, reason);
    }

    fn native_calling(&mut self, vm: &mut V, native_address: u64) {
        self.notify_native_calling(vm, native_address);
    }

    fn pending_job_entry(&mut self, _vm: &mut V) {
        self.notify_pending_job_entry();
    }

    fn vm_start(&mut self, _vm: &mut V) {
        agent_debug!(target: "debugger", "vm started");
    }

    fn vm_death(&mut self, _vm: &mut V) {
        agent_debug!(target: "debugger", "vm death");
        self.stepper = None;
        self.arena.reset();
        self.restore_state();
    }
}

use crate::common::{methods, paused_events, responses, MockVm, TestEnv, ADD, APP, APP_URL, MAIN};
use scriptdbg::debugger::step::StepperKind;
use scriptdbg::debugger::vm::{BytecodeLocation, FileId, MethodId};
use scriptdbg::debugger::{ExecutionHooks, ExecutionState};
use scriptdbg::protocol::events::Notification;
use scriptdbg::protocol::types::PauseReason;
use serde_json::json;

fn at(method: MethodId, offset: u32) -> BytecodeLocation {
    BytecodeLocation::new(APP, method, offset, APP_URL)
}

fn stepper_kind(env: &TestEnv) -> Option<StepperKind> {
    env.debugger.stepper().map(|s| s.kind())
}

#[test]
fn test_step_over_skips_callee() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);

    let response = env.call(1, "Debugger.stepOver", json!({}));
    assert!(response.is_ok());
    assert_eq!(stepper_kind(&env), Some(StepperKind::Over));
    assert_eq!(env.debugger.state(), ExecutionState::SteppingOver);
    assert_eq!(methods(&env.outgoing()), ["Debugger.resumed"]);

    // inside `add`, one frame deeper
    env.vm.depth = 2;
    env.debugger.single_step(&mut env.vm, &at(ADD, 0));
    env.debugger.single_step(&mut env.vm, &at(ADD, 8));
    assert!(env.outgoing().is_empty());

    // back on the start line
    env.vm.depth = 1;
    env.debugger.single_step(&mut env.vm, &at(MAIN, 12));
    assert!(env.outgoing().is_empty());

    env.vm.stop_in_main(20);
    env.queue(2, "Debugger.resume", json!({}));
    env.debugger.single_step(&mut env.vm, &at(MAIN, 20));

    let out = env.outgoing();
    assert_eq!(methods(&out), ["Debugger.paused", "Debugger.resumed"]);
    let paused = &paused_events(&out)[0];
    assert_eq!(paused.reason, PauseReason::Step);
    assert!(paused.hit_breakpoints.is_empty());
    assert_eq!(paused.call_frames[0].location.line_number, 6);
    assert!(responses(&out)[0].is_ok());

    assert!(env.debugger.stepper().is_none());
    assert_eq!(env.debugger.state(), ExecutionState::Running);
}

#[test]
fn test_step_into_stops_in_callee() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepInto", json!({}));
    assert_eq!(env.debugger.state(), ExecutionState::SteppingInto);

    env.vm.depth = 2;
    assert_eq!(
        env.debugger.notify_single_step(&env.vm, &at(ADD, 0)),
        Some(PauseReason::Step)
    );
    assert!(env.debugger.stepper().is_none());
}

#[test]
fn test_new_step_replaces_active_one() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepInto", json!({}));
    env.call(2, "Debugger.stepOver", json!({}));
    assert_eq!(stepper_kind(&env), Some(StepperKind::Over));

    // a callee no longer completes the step
    env.vm.depth = 2;
    assert_eq!(env.debugger.notify_single_step(&env.vm, &at(ADD, 0)), None);
}

#[test]
fn test_step_out() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_add(0);
    env.call(1, "Debugger.stepOut", json!({}));
    assert_eq!(env.debugger.state(), ExecutionState::SteppingOut);

    assert_eq!(env.debugger.notify_single_step(&env.vm, &at(ADD, 8)), None);

    env.vm.depth = 1;
    assert_eq!(
        env.debugger.notify_single_step(&env.vm, &at(MAIN, 10)),
        Some(PauseReason::Step)
    );
}

#[test]
fn test_step_failures() {
    let mut env = TestEnv::with_app();
    // no bytecode frame to start from
    let response = env.call(1, "Debugger.stepOver", json!({}));
    assert_eq!(response.error_message(), Some("Failed to StepOver"));
    assert!(env.debugger.stepper().is_none());

    let mut env = TestEnv::new(MockVm::with_app());
    env.vm.stop_in_main(10);
    let response = env.call(2, "Debugger.stepInto", json!({}));
    assert_eq!(
        response.error_message(),
        Some("Can only perform operation while paused")
    );
}

#[test]
fn test_pause_on_next_bytecode() {
    let mut env = TestEnv::with_app();
    env.call(1, "Debugger.pause", json!({}));
    assert!(env.debugger.session().pause_on_next_bytecode);

    // no source line
    assert_eq!(env.debugger.notify_single_step(&env.vm, &at(MAIN, 30)), None);
    // not a parsed script
    let foreign = BytecodeLocation::new(FileId(9), MAIN, 0, "lib.js");
    assert!(env.debugger.is_skip_line(&env.vm, &foreign));
    assert_eq!(env.debugger.notify_single_step(&env.vm, &foreign), None);
    assert!(env.debugger.session().pause_on_next_bytecode);

    assert_eq!(
        env.debugger.notify_single_step(&env.vm, &at(MAIN, 0)),
        Some(PauseReason::Other)
    );
    assert!(!env.debugger.session().pause_on_next_bytecode);
    assert_eq!(env.debugger.notify_single_step(&env.vm, &at(MAIN, 10)), None);
}

#[test]
fn test_native_calling_during_step_into() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepInto", json!({}));
    env.outgoing();

    env.queue(2, "Debugger.replyNativeCalling", json!({"userCode": true}));
    env.debugger.native_calling(&mut env.vm, 0x1000);

    let out = env.outgoing();
    assert_eq!(methods(&out), ["Debugger.nativeCalling", "Debugger.resumed"]);
    assert!(out.iter().any(|o| matches!(
        o,
        scriptdbg::protocol::channel::Outgoing::Notification(Notification::NativeCalling(n))
            if n.native_address == 0x1000
    )));
    assert!(responses(&out)[0].is_ok());
    assert!(env.debugger.stepper().is_none());
    assert_eq!(env.debugger.state(), ExecutionState::Running);
}

#[test]
fn test_native_calling_keeps_step_for_native_code() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepInto", json!({}));
    env.outgoing();

    env.queue(2, "Debugger.replyNativeCalling", json!({"userCode": false}));
    env.debugger.native_calling(&mut env.vm, 0x2000);
    assert_eq!(stepper_kind(&env), Some(StepperKind::Into));
    assert_eq!(env.debugger.state(), ExecutionState::SteppingInto);

    // only step-into stops before native code
    env.call(3, "Debugger.stepOver", json!({}));
    env.outgoing();
    env.debugger.native_calling(&mut env.vm, 0x2000);
    assert!(env.outgoing().is_empty());
}

#[test]
fn test_pending_job_entry_turns_step_into_pause() {
    let mut env = TestEnv::with_app();
    // nothing to continue
    env.debugger.pending_job_entry(&mut env.vm);
    assert!(!env.debugger.session().pause_on_next_bytecode);

    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepOver", json!({}));
    env.debugger.pending_job_entry(&mut env.vm);
    assert!(env.debugger.stepper().is_none());
    assert!(env.debugger.session().pause_on_next_bytecode);
    assert_eq!(env.debugger.state(), ExecutionState::Running);
}

#[test]
fn test_clear_single_stepper() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepOver", json!({}));

    env.debugger.clear_single_stepper(&env.vm);
    assert!(env.debugger.stepper().is_some());

    env.vm.depth = 0;
    env.debugger.clear_single_stepper(&env.vm);
    assert!(env.debugger.stepper().is_none());
    assert_eq!(env.debugger.state(), ExecutionState::Running);
}

#[test]
fn test_resume_drops_stepper() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.call(1, "Debugger.stepOver", json!({}));
    env.call(2, "Debugger.resume", json!({}));
    assert!(env.debugger.stepper().is_none());

    env.call(3, "Debugger.stepOver", json!({}));
    env.debugger.vm_death(&mut env.vm);
    assert!(env.debugger.stepper().is_none());
    assert_eq!(env.debugger.state(), ExecutionState::Running);
}

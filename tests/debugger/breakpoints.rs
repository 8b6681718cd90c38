use crate::common::{methods, notifications, paused_events, responses, TestEnv, ADD, APP, APP_URL};
use scriptdbg::debugger::vm::BytecodeLocation;
use scriptdbg::debugger::ExecutionHooks;
use scriptdbg::protocol::events::Notification;
use scriptdbg::protocol::types::{Location, ScriptId};
use scriptdbg::protocol::Returns;
use serde_json::json;

#[test]
fn test_set_and_remove_breakpoint() {
    let mut env = TestEnv::with_app();

    let response = env.call(
        1,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 1, "columnNumber": 0}),
    );
    let Some(Returns::SetBreakpointByUrl(returns)) = response.result else {
        panic!("unexpected response {response:?}");
    };
    assert_eq!(returns.breakpoint_id, "id:1:0:app.js");
    assert_eq!(returns.locations, vec![Location::new(ScriptId(0), 1, 4)]);
    assert_eq!(
        env.vm.breakpoints[0].0,
        BytecodeLocation::new(APP, ADD, 0, APP_URL)
    );
    assert!(env.vm.breakpoints[0].1.is_none());

    let events = notifications(&env.outgoing());
    assert!(matches!(
        &events[..],
        [Notification::BreakpointResolved(r)] if r.breakpoint_id == "id:1:0:app.js"
    ));

    let response = env.call(
        2,
        "Debugger.removeBreakpoint",
        json!({"breakpointId": returns.breakpoint_id}),
    );
    assert!(response.is_ok());
    assert!(env.vm.breakpoints.is_empty());

    let response = env.call(
        3,
        "Debugger.removeBreakpoint",
        json!({"breakpointId": "id:1:0:app.js"}),
    );
    assert_eq!(response.error_message(), Some("Breakpoint not found."));
}

#[test]
fn test_set_breakpoint_failures() {
    let mut env = TestEnv::with_app();

    let response = env.call(
        1,
        "Debugger.setBreakpointByUrl",
        json!({"url": "other.js", "lineNumber": 1}),
    );
    assert_eq!(response.error_message(), Some("Unknown file name."));

    // line 3 is a closing brace without bytecode
    let response = env.call(
        2,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 3}),
    );
    assert_eq!(response.error_message(), Some("Breakpoint not found."));

    let response = env.call(
        3,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 1, "condition": "bm90IGEgZnVuY3Rpb24="}),
    );
    assert!(!response.is_ok());
    assert!(env.vm.breakpoints.is_empty());

    let response = env.call(4, "Debugger.removeBreakpoint", json!({"breakpointId": "1:0"}));
    assert_eq!(response.error_message(), Some("Parse breakpoint id failed"));

    env.call(5, "Debugger.disable", json!({}));
    let response = env.call(
        6,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 1}),
    );
    assert_eq!(
        response.error_message(),
        Some("SetBreakpointByUrl: debugger agent is not enabled")
    );
}

#[test]
fn test_conditional_breakpoint() {
    use base64::prelude::{Engine, BASE64_STANDARD};

    let mut env = TestEnv::with_app();
    let mut payload = crate::common::MAGIC.to_vec();
    payload.extend_from_slice(b"sum");
    let response = env.call(
        1,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 2, "condition": BASE64_STANDARD.encode(payload)}),
    );
    assert!(response.is_ok());
    assert!(env.vm.breakpoints[0].1.is_some());
}

#[test]
fn test_get_possible_breakpoints() {
    let mut env = TestEnv::with_app();

    let response = env.call(
        1,
        "Debugger.getPossibleBreakpoints",
        json!({"start": {"scriptId": "0", "lineNumber": 0}, "end": {"scriptId": "0", "lineNumber": 7}}),
    );
    let Some(Returns::GetPossibleBreakpoints(returns)) = response.result else {
        panic!("unexpected response {response:?}");
    };
    let lines: Vec<i32> = returns.locations.iter().map(|l| l.line_number).collect();
    assert_eq!(lines, [1, 2, 4, 5, 6]);

    let response = env.call(
        2,
        "Debugger.getPossibleBreakpoints",
        json!({"start": {"scriptId": "0", "lineNumber": 3}}),
    );
    let Some(Returns::GetPossibleBreakpoints(returns)) = response.result else {
        panic!("unexpected response {response:?}");
    };
    assert!(returns.locations.is_empty());
    // nothing is installed
    assert!(env.vm.breakpoints.is_empty());

    let response = env.call(
        3,
        "Debugger.getPossibleBreakpoints",
        json!({"start": {"scriptId": "9", "lineNumber": 0}}),
    );
    assert_eq!(response.error_message(), Some("Unknown file name."));
}

#[test]
fn test_get_possible_breakpoints_range_bounded_by_script() {
    let mut env = TestEnv::with_app();
    let before = env.vm.files[0].extractor.location_queries.get();

    let response = env.call(
        1,
        "Debugger.getPossibleBreakpoints",
        json!({
            "start": {"scriptId": "0", "lineNumber": 0},
            "end": {"scriptId": "0", "lineNumber": i32::MAX}
        }),
    );
    let Some(Returns::GetPossibleBreakpoints(returns)) = response.result else {
        panic!("unexpected response {response:?}");
    };
    let lines: Vec<i32> = returns.locations.iter().map(|l| l.line_number).collect();
    assert_eq!(lines, [1, 2, 4, 5, 6]);

    // lines 0..=7 of the script only
    let after = env.vm.files[0].extractor.location_queries.get();
    assert_eq!(after - before, 8);
}

#[test]
fn test_breakpoint_hit() {
    let mut env = TestEnv::with_app();
    env.call(
        1,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 1}),
    );
    env.outgoing();

    env.vm.stop_in_add(0);
    env.queue(2, "Debugger.resume", json!({}));
    let location = env.vm.breakpoints[0].0.clone();
    env.debugger.breakpoint(&mut env.vm, &location);

    let out = env.outgoing();
    assert_eq!(methods(&out), ["Debugger.paused", "Debugger.resumed"]);
    let paused = &paused_events(&out)[0];
    assert_eq!(paused.hit_breakpoints, ["id:1:4:app.js"]);
    assert_eq!(paused.call_frames.len(), 2);
    assert_eq!(paused.call_frames[0].function_name, "add");
    assert_eq!(paused.call_frames[0].location, Location::new(ScriptId(0), 1, 4));
    assert_eq!(paused.call_frames[1].location, Location::new(ScriptId(0), 5, 0));
    assert!(responses(&out)[0].is_ok());
    assert!(!env.debugger.is_paused());
}

#[test]
fn test_breakpoint_hit_in_unknown_script_is_dropped() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_add(0);

    let location = BytecodeLocation::new(APP, ADD, 0, "other.js");
    // no resume is queued: the pause must not wait
    env.debugger.breakpoint(&mut env.vm, &location);
    assert!(env.outgoing().is_empty());
}

use crate::common::{
    methods, paused_events, responses, test_config, MockFrame, MockValue, TestEnv, ADD, APP_URL,
};
use base64::prelude::{Engine, BASE64_STANDARD};
use scriptdbg::config::AgentConfig;
use scriptdbg::debugger::vm::{FileId, VmValue};
use scriptdbg::debugger::{ExecutionHooks, ExecutionState};
use scriptdbg::protocol::channel::Outgoing;
use scriptdbg::protocol::events::Notification;
use scriptdbg::protocol::types::{
    ObjectSubType, ObjectType, PauseOnExceptionsState, PauseReason, RemoteObjectId, ScopeType,
};
use scriptdbg::protocol::Returns;
use serde_json::json;
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};

fn throwing_env(policy: &str) -> TestEnv {
    let mut env = TestEnv::with_app();
    env.call(1, "Debugger.setPauseOnExceptions", json!({"state": policy}));
    env.vm.stop_in_add(8);
    env.vm.exception = Some(MockValue::error("TypeError", "bad operand"));
    env
}

#[test]
fn test_pause_on_exception_policy() {
    let mut env = throwing_env("none");
    assert_eq!(
        env.debugger.session().pause_on_exceptions,
        PauseOnExceptionsState::None
    );
    env.debugger.exception(&mut env.vm);
    assert!(env.outgoing().iter().all(|o| matches!(o, Outgoing::Response(_))));
    assert!(env.vm.exception.is_some());

    let mut env = throwing_env("uncaught");
    env.vm.exception_caught = true;
    env.debugger.exception(&mut env.vm);
    assert!(paused_events(&env.outgoing()).is_empty());

    let mut env = throwing_env("uncaught");
    env.outgoing();
    env.queue(2, "Debugger.resume", json!({}));
    env.debugger.exception(&mut env.vm);
    assert_eq!(paused_events(&env.outgoing()).len(), 1);
}

#[test]
fn test_exception_pause_keeps_exception_pending() {
    let mut env = throwing_env("all");
    env.vm.exception_caught = true;
    env.outgoing();

    env.queue(2, "Debugger.resume", json!({}));
    env.debugger.exception(&mut env.vm);

    let out = env.outgoing();
    let paused = &paused_events(&out)[0];
    assert_eq!(paused.reason, PauseReason::Exception);
    assert!(paused.hit_breakpoints.is_empty());
    let data = paused.data.as_ref().unwrap();
    assert_eq!(data.subtype, Some(ObjectSubType::Error));
    assert_eq!(data.description.as_deref(), Some("TypeError: bad operand"));

    assert!(env.vm.exception.as_ref().is_some_and(|e| e.is_error()));
    assert_eq!(env.debugger.state(), ExecutionState::Running);
}

#[test]
fn test_exception_is_hidden_while_paused() {
    let mut env = throwing_env("all");
    env.outgoing();

    // evaluation inside the pause sees no pending exception
    let mut payload = crate::common::MAGIC.to_vec();
    payload.extend_from_slice(b"sum");
    env.queue(
        2,
        "Debugger.evaluateOnCallFrame",
        json!({"callFrameId": "0", "expression": BASE64_STANDARD.encode(payload)}),
    );
    env.queue(3, "Debugger.resume", json!({}));
    env.debugger.exception(&mut env.vm);

    let responses = responses(&env.outgoing());
    assert!(responses[0].is_ok(), "{:?}", responses[0]);
    assert!(env.vm.exception.is_some());
}

#[test]
fn test_call_frames_and_scopes() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_add(8);
    env.queue(1, "Debugger.resume", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::DebugCommand);

    let out = env.outgoing();
    let paused = &paused_events(&out)[0];
    assert_eq!(paused.reason, PauseReason::DebugCommand);

    let frames = &paused.call_frames;
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].function_name, "add");
    assert_eq!(frames[0].url, APP_URL);
    assert_eq!(frames[0].location.line_number, 2);
    assert_eq!(frames[1].function_name, "func_main_0");
    assert_eq!(frames[1].location.line_number, 5);

    let scopes: Vec<ScopeType> = frames[0].scope_chain.iter().map(|s| s.r#type).collect();
    assert_eq!(scopes, [ScopeType::Local, ScopeType::Global]);
    let local = &frames[0].scope_chain[0];
    assert_eq!(local.object.object_id, Some(RemoteObjectId(0)));
    assert_eq!(local.start_location.as_ref().map(|l| l.line_number), Some(1));
    assert_eq!(local.end_location.as_ref().map(|l| l.line_number), Some(3));
    assert_eq!(frames[0].this.object_id, Some(RemoteObjectId(1)));
    assert_eq!(
        frames[0].scope_chain[1].object.object_id,
        Some(RemoteObjectId(2))
    );

    // main has no `this`
    assert_eq!(frames[1].scope_chain[0].object.object_id, Some(RemoteObjectId(3)));
    assert!(frames[1].this.object_id.is_none());
    assert_eq!(frames[1].scope_chain[1].object.object_id, Some(RemoteObjectId(4)));
}

#[test]
fn test_module_scope() {
    use scriptdbg::debugger::vm::ObjectClass;

    let mut env = TestEnv::with_app();
    env.vm.files[0].module = true;
    let module = MockValue::object(ObjectClass::SourceTextModule);
    module.set("config", MockValue::string("release"));
    env.vm.module = Some(module);
    env.vm.stop_in_main(10);

    env.queue(1, "Runtime.getProperties", json!({"objectId": "1", "ownProperties": true}));
    env.queue(2, "Debugger.resume", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::Other);

    let out = env.outgoing();
    let frame = &paused_events(&out)[0].call_frames[0];
    let scopes: Vec<ScopeType> = frame.scope_chain.iter().map(|s| s.r#type).collect();
    assert_eq!(scopes, [ScopeType::Local, ScopeType::Module, ScopeType::Global]);

    let Some(Returns::GetProperties(props)) = &responses(&out)[0].result else {
        panic!("unexpected response {out:?}");
    };
    assert_eq!(props.result[0].name, "config");
}

#[test]
fn test_object_ids_restart_each_pause() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_add(8);

    env.queue(1, "Debugger.resume", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::Other);
    let first = env.debugger.arena().generation();
    // ids stay queryable after the pause
    assert_eq!(env.debugger.arena().object_count(), 5);

    env.queue(2, "Runtime.getProperties", json!({"objectId": "0", "ownProperties": true}));
    env.queue(3, "Debugger.resume", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::Other);
    assert!(env.debugger.arena().generation() > first);
    // the expanded scope registered the `add` closure
    assert_eq!(env.debugger.arena().object_count(), 6);

    let out = env.outgoing();
    let paused = paused_events(&out);
    assert_eq!(paused.len(), 2);
    assert_eq!(
        paused[0].call_frames[0].scope_chain[0].object.object_id,
        paused[1].call_frames[0].scope_chain[0].object.object_id
    );

    let Some(Returns::GetProperties(props)) = &responses(&out)[1].result else {
        panic!("unexpected response {out:?}");
    };
    let names: Vec<&str> = props.result.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "sum", "add"]);
}

fn closure_env() -> Vec<(String, MockValue)> {
    vec![
        ("this".to_string(), MockValue::function("bound")),
        ("x".to_string(), MockValue::number(99.0)),
        ("z".to_string(), MockValue::string("closure")),
        ("4newTarget".to_string(), MockValue::undefined()),
    ]
}

/// Pause on the current stack, return the innermost frame `this` type and the names
/// and values of its local scope.
fn local_scope_of(env: &mut TestEnv) -> (ObjectType, Vec<(String, Option<serde_json::Value>)>) {
    env.queue(1, "Runtime.getProperties", json!({"objectId": "0", "ownProperties": true}));
    env.queue(2, "Debugger.resume", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::Other);

    let out = env.outgoing();
    let this = paused_events(&out)[0].call_frames[0].this.r#type;
    let Some(Returns::GetProperties(props)) = &responses(&out)[0].result else {
        panic!("unexpected response {out:?}");
    };
    let locals = props
        .result
        .iter()
        .map(|p| (p.name.clone(), p.value.as_ref().and_then(|v| v.value.clone())))
        .collect();
    (this, locals)
}

#[test]
fn test_local_scope_with_closure_environment() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(10);
    env.vm.stack[0] = env.vm.stack[0].clone().with_env(closure_env());

    let (this, locals) = local_scope_of(&mut env);
    // main has no `this` local, the closure slot fills it
    assert_eq!(this, ObjectType::Function);
    // local `x` wins over the closure `x`, `4newTarget` is hidden
    assert_eq!(
        locals,
        [
            ("x".to_string(), Some(json!(1.0))),
            ("y".to_string(), None),
            ("z".to_string(), Some(json!("closure"))),
        ]
    );
}

#[test]
fn test_local_this_wins_over_closure_this() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_add(8);
    env.vm.stack[0] = env.vm.stack[0].clone().with_env(closure_env());

    let (this, locals) = local_scope_of(&mut env);
    assert_eq!(this, ObjectType::Object);
    let names: Vec<&str> = locals.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["a", "b", "sum", "add", "x", "z"]);
}

#[test]
fn test_environment_ignored_at_function_entry() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_main(0);
    env.vm.stack[0] = env.vm.stack[0].clone().with_env(closure_env());

    let (this, locals) = local_scope_of(&mut env);
    assert_eq!(this, ObjectType::Undefined);
    let names: Vec<&str> = locals.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["x", "y"]);
}

#[test]
fn test_failed_innermost_frame_drops_pause() {
    let mut env = TestEnv::with_app();
    env.call(1, "Debugger.setPauseOnExceptions", json!({"state": "all"}));
    env.outgoing();
    env.vm.stack = vec![MockFrame {
        file: FileId(9),
        ..MockFrame::new(ADD, "lib", 0, vec![])
    }];
    env.vm.depth = 1;
    env.vm.exception = Some(MockValue::error("Error", "lost"));

    // no resume is queued: the pause must not wait
    env.debugger.exception(&mut env.vm);
    assert!(env.outgoing().is_empty());
    assert!(env.vm.exception.is_some());
    assert!(!env.debugger.state().is_paused());
}

#[test]
fn test_native_frames_skipped_and_stack_truncated() {
    let mut env = TestEnv::with_app();
    env.vm.stop_in_add(0);
    let add = env.vm.stack.remove(0);
    env.vm.stack = vec![
        MockFrame::native(),
        add,
        MockFrame {
            file: FileId(9),
            ..MockFrame::new(ADD, "lib", 0, vec![])
        },
        MockFrame::new(crate::common::MAIN, "func_main_0", 10, vec![]),
    ];

    env.queue(1, "Debugger.resume", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::Other);

    let out = env.outgoing();
    let frames = &paused_events(&out)[0].call_frames;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].function_name, "add");
    assert_eq!(env.debugger.arena().frame_count(), 1);
}

#[test]
fn test_disable_while_paused() {
    let mut env = TestEnv::with_app();
    env.call(
        1,
        "Debugger.setBreakpointByUrl",
        json!({"url": APP_URL, "lineNumber": 2}),
    );
    env.vm.stop_in_add(8);
    env.outgoing();

    env.queue(2, "Debugger.disable", json!({}));
    env.debugger.paused(&mut env.vm, PauseReason::Other);

    let out = env.outgoing();
    assert_eq!(methods(&out), ["Debugger.paused", "Debugger.resumed"]);
    assert!(responses(&out)[0].is_ok());
    assert!(env.vm.breakpoints.is_empty());
    assert!(!env.debugger.session().enabled);
    assert_eq!(env.debugger.state(), ExecutionState::Running);
    assert!(!env.debugger.is_paused());
}

#[test]
#[serial]
fn test_pause_timeout_resumes() {
    let mut env = TestEnv::with_app_config(AgentConfig {
        pause_timeout_ms: Some(50),
        ..test_config()
    });
    env.vm.stop_in_main(10);

    let start = Instant::now();
    env.debugger.paused(&mut env.vm, PauseReason::Other);
    assert!(start.elapsed() >= Duration::from_millis(50));

    let out = env.outgoing();
    assert_eq!(methods(&out), ["Debugger.paused", "Debugger.resumed"]);
    assert!(responses(&out).is_empty());
    // session survives a timeout
    assert!(env.debugger.session().enabled);
}

#[test]
fn test_disconnect_while_paused() {
    let TestEnv {
        mut vm,
        mut debugger,
        transport,
    } = TestEnv::with_app();
    debugger.dispatch(
        &mut vm,
        scriptdbg::protocol::DispatchRequest::new(
            1,
            "Debugger.setBreakpointByUrl",
            json!({"url": APP_URL, "lineNumber": 1}),
        ),
    );
    assert_eq!(vm.breakpoints.len(), 1);
    drop(transport);

    vm.stop_in_main(10);
    debugger.paused(&mut vm, PauseReason::Other);
    assert!(!debugger.session().enabled);
    assert!(vm.breakpoints.is_empty());

    // detached agent never waits again
    debugger.paused(&mut vm, PauseReason::Other);
    assert!(!debugger.is_waiting());
}

#[test]
#[serial]
fn test_frontend_on_transport_thread() {
    let TestEnv {
        mut vm,
        mut debugger,
        transport,
    } = TestEnv::with_app();

    let frontend = thread::spawn(move || {
        let paused = loop {
            match transport.recv_timeout(Duration::from_secs(5)) {
                Some(Outgoing::Notification(Notification::Paused(p))) => break p,
                Some(_) => continue,
                None => panic!("no paused notification"),
            }
        };
        transport
            .send_json(
                r#"{"id": 7, "method": "Debugger.evaluateOnCallFrame",
                    "params": {"callFrameId": "0", "expression": "sum"}}"#,
            )
            .unwrap();
        transport
            .send_json(r#"{"id": 8, "method": "Debugger.resume"}"#)
            .unwrap();

        let mut responses = vec![];
        while responses.len() < 2 {
            match transport.recv_timeout(Duration::from_secs(5)) {
                Some(Outgoing::Response(r)) => responses.push(r),
                Some(_) => {}
                None => break,
            }
        }
        (paused, responses)
    });

    vm.stop_in_add(8);
    debugger.paused(&mut vm, PauseReason::DebugCommand);
    let (paused, responses) = frontend.join().unwrap();

    assert_eq!(paused.call_frames.len(), 2);
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, 7);
    let Some(Returns::Evaluate(evaluated)) = &responses[0].result else {
        panic!("unexpected response {:?}", responses[0]);
    };
    assert_eq!(evaluated.result.value, Some(json!(3.0)));
    assert_eq!(responses[1].id, 8);
    assert!(!debugger.is_paused());
}

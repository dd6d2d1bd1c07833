use super::*;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

fn lua_adapter() -> RuntimeAdapter {
    RuntimeAdapter::create(&lua_factory(LuaOptions::default()), TerminateHandle::new())
        .expect("lua runtime")
}

#[test]
fn expression_results_are_rendered() {
    let mut adapter = lua_adapter();
    assert_eq!(adapter.execute("1+1"), Ok("2".to_string()));
    assert_eq!(adapter.execute("1/2"), Ok("0.5".to_string()));
    assert_eq!(adapter.execute("'hi' .. 1"), Ok("hi1".to_string()));
    assert_eq!(adapter.execute("true"), Ok("true".to_string()));
    assert_eq!(adapter.execute("1, 'two'"), Ok("1\ttwo".to_string()));
}

#[test]
fn statements_without_value_are_undefined() {
    let mut adapter = lua_adapter();
    assert_eq!(adapter.execute("x = 41"), Ok(UNDEFINED_RESULT.to_string()));
    assert_eq!(adapter.execute("x + 1"), Ok("42".to_string()));
    assert_eq!(adapter.execute("nil"), Ok(UNDEFINED_RESULT.to_string()));
    assert_eq!(adapter.execute(""), Ok(UNDEFINED_RESULT.to_string()));
}

#[test]
fn undefined_globals_are_errors() {
    let mut adapter = lua_adapter();
    let err = adapter.execute("undefinedVar").expect_err("undefined global");
    assert!(err.contains("undefinedVar"), "unexpected message: {err}");
}

#[test]
fn syntax_errors_report_a_message() {
    let mut adapter = lua_adapter();
    let err = adapter.execute("local = =").expect_err("syntax error");
    assert!(!err.is_empty());
}

#[test]
fn runtime_errors_report_the_raised_message() {
    let mut adapter = lua_adapter();
    let err = adapter.execute("error('boom')").expect_err("raised error");
    assert!(err.contains("boom"), "unexpected message: {err}");
}

#[test]
fn host_functions_receive_arguments_and_return_values() {
    let mut adapter = lua_adapter();
    let seen: Arc<Mutex<Vec<HostValue>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let record: HostFunction = Arc::new(move |args: &[HostValue]| {
        sink.lock().unwrap().extend(args.iter().cloned());
        Ok(HostValue::Text("ack".into()))
    });
    let noop: HostFunction = Arc::new(|_: &[HostValue]| Ok(HostValue::Nil));
    let failing: HostFunction = Arc::new(|_: &[HostValue]| Err("host said no".to_string()));
    adapter
        .install_host_functions(&HostFunctions {
            print: Arc::clone(&record),
            println: Arc::clone(&noop),
            clear: Arc::clone(&noop),
            prompt: failing,
            sleep: noop,
        })
        .expect("install");

    assert_eq!(adapter.execute("print(1, 2.5, 'x', nil, false)"), Ok("ack".into()));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            HostValue::Integer(1),
            HostValue::Number(2.5),
            HostValue::Text("x".into()),
            HostValue::Nil,
            HostValue::Boolean(false),
        ]
    );
    let err = adapter.execute("prompt('?')").expect_err("host error");
    assert!(err.contains("host said no"), "unexpected message: {err}");
}

#[test]
fn terminate_aborts_a_running_loop() {
    let terminate = TerminateHandle::new();
    let mut adapter = RuntimeAdapter::create(&lua_factory(LuaOptions::default()), terminate.clone())
        .expect("lua runtime");
    let remote = terminate.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.terminate();
    });
    let started = Instant::now();
    let err = adapter.execute("while true do end").expect_err("terminated");
    trigger.join().unwrap();
    assert!(err.contains(INTERRUPTED_MESSAGE), "unexpected message: {err}");
    assert!(started.elapsed() < Duration::from_secs(5));

    terminate.reset();
    assert_eq!(adapter.execute("2*3"), Ok("6".to_string()));
    adapter.dispose();
}

#[test]
fn terminate_is_idempotent() {
    let terminate = TerminateHandle::new();
    terminate.terminate();
    terminate.terminate();
    assert!(terminate.is_requested());
    terminate.reset();
    assert!(!terminate.is_requested());
}

#[test]
fn sleep_completes_without_termination() {
    let terminate = TerminateHandle::new();
    let started = Instant::now();
    assert!(terminate.sleep(Duration::from_millis(20)));
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[test]
fn sleep_wakes_on_terminate() {
    let terminate = TerminateHandle::new();
    let remote = terminate.clone();
    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        remote.terminate();
    });
    let started = Instant::now();
    assert!(!terminate.sleep(Duration::from_secs(30)));
    assert!(started.elapsed() < Duration::from_secs(5));
    trigger.join().unwrap();
}

#[test]
fn failing_factory_surfaces_runtime_error() {
    let factory: RuntimeFactory =
        Arc::new(|_: &TerminateHandle| Err(RuntimeError::Init("no runtime".into())));
    let err = RuntimeAdapter::create(&factory, TerminateHandle::new())
        .err()
        .expect("factory error");
    assert!(err.to_string().contains("no runtime"));
}

#[test]
fn host_value_numeric_coercion() {
    assert_eq!(HostValue::Integer(3).as_f64(), Some(3.0));
    assert_eq!(HostValue::Text(" 2.5 ".into()).as_f64(), Some(2.5));
    assert_eq!(HostValue::Boolean(true).as_f64(), None);
    assert_eq!(HostValue::Nil.to_string(), "nil");
}

use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};

fn combined_output(output: &Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn scriptline_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_scriptline").expect("scriptline test binary not built")
}

fn run_with_input(args: &[&str], input: &str) -> Output {
    let mut child = Command::new(scriptline_bin())
        .args(args)
        .env("SCRIPTLINE_NO_LOGS", "true")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn scriptline");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait for scriptline")
}

#[test]
fn help_mentions_console() {
    let output = Command::new(scriptline_bin())
        .arg("--help")
        .output()
        .expect("run scriptline --help");
    assert!(output.status.success());
    assert!(combined_output(&output).contains("scripting console"));
}

#[test]
fn rejects_invalid_poll_interval() {
    let output = Command::new(scriptline_bin())
        .args(["--poll-interval-ms", "1"])
        .output()
        .expect("run scriptline");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--poll-interval-ms"));
}

#[test]
fn console_evaluates_piped_lines_in_order() {
    let output = run_with_input(&[], "x = 20\nx + 22\nprintln('hi')\nmissing\n");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stdout, "=> undefined\n=> 42\nhi\n=> undefined\n");
    assert!(stderr.contains("error:"), "stderr: {stderr}");
    assert!(stderr.contains("missing"), "stderr: {stderr}");
}

#[test]
fn console_runs_preloads_and_script() {
    let dir = tempfile::TempDir::new().expect("tempdir");
    fs::write(dir.path().join("lib.lua"), "function double(n) return n * 2 end").unwrap();
    let scripts = tempfile::TempDir::new().expect("tempdir");
    let script = scripts.path().join("main.lua");
    fs::write(&script, "println('main ran')").unwrap();

    let output = run_with_input(
        &[
            "--source-dir",
            dir.path().to_str().unwrap(),
            "--script",
            script.to_str().unwrap(),
        ],
        "double(21)\n:history\n",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("main ran\n"), "stdout: {stdout}");
    assert!(stdout.contains("=> 42\n"), "stdout: {stdout}");
    assert!(stdout.contains("0  double(21)"), "stdout: {stdout}");
}

#[test]
fn console_restart_forgets_globals() {
    let output = run_with_input(&[], "kept = 1\n:restart\nkept\n");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kept"), "stderr: {stderr}");
}

#[test]
fn json_bridge_reports_events() {
    let output = run_with_input(
        &["--json"],
        "{\"cmd\":\"status\"}\nnot json\n",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout.lines().next().expect("capabilities line");
    let capabilities: serde_json::Value = serde_json::from_str(first).expect("json line");
    assert_eq!(capabilities["event"], "capabilities");
    assert_eq!(capabilities["runtime"], "lua");
    assert!(stdout.contains("\"event\":\"status\""), "stdout: {stdout}");
    assert!(stdout.contains("Invalid command"), "stdout: {stdout}");
}

use std::process::{Command, Output};

const TRACE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/trace.json");
const FUNCS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/funcs.json");
const MALFORMED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/malformed_trace.json");

fn chainscope(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chainscope"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run chainscope")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_inspector_output() {
    let output = chainscope(&[TRACE, "-s", FUNCS, "--all", "-q"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.starts_with("receive: 3/3 chains match (10 calls)"));
    assert!(text.contains("→ ip_rcv"));
    assert!(text.contains("→ tcp_v4_rcv"));
}

#[test]
fn test_thread_filter_and_listing() {
    let output = chainscope(&[TRACE, "--all", "--thread", "102", "-q"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("receive: 1/3 chains match"));

    let output = chainscope(&[TRACE, "--all", "--list-threads"]);
    assert_eq!(stdout(&output), "101\n102\n");
}

#[test]
fn test_graph_output_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("graph.json");
    let export_arg = export.to_str().unwrap();

    let output =
        chainscope(&[TRACE, "-s", FUNCS, "--all", "--graph", "--export", export_arg, "-q"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("Aggregated call graph"));
    assert!(text.contains("receive_16 → receive_32  ×2"));

    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(parsed["graph"]["nodes"].as_array().unwrap().len(), 4);
    assert!(parsed["durationRange"]["min"].as_f64().unwrap() > 9.9);
}

/// Function names listed in the graph table
fn graph_rows(args: &[&str]) -> Vec<String> {
    let mut argv = vec![TRACE, "-s", FUNCS, "--all", "--graph", "-q"];
    argv.extend_from_slice(args);
    let output = chainscope(&argv);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let names = ["ip_rcv", "tcp_v4_rcv", "tcp_sendmsg", "ip_output"];
    let mut rows: Vec<String> = stdout(&output)
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|first| names.contains(first))
        .map(str::to_string)
        .collect();
    rows.sort();
    rows
}

#[test]
fn test_duration_window() {
    let output = chainscope(&[
        TRACE, "--all", "--graph", "--min-duration", "1000", "--max-duration", "2000", "-q",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("(no functions in range)"));

    // averages: ip_rcv 63.3, tcp_sendmsg 40, tcp_v4_rcv 30, ip_output 10
    let rows = graph_rows(&["--min-duration", "25", "--max-duration", "45"]);
    assert_eq!(rows, ["tcp_sendmsg", "tcp_v4_rcv"]);
}

#[test]
fn test_max_duration_only() {
    let output = chainscope(&[TRACE, "--all", "--graph", "--max-duration", "5", "-q"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("(no functions in range)"));

    assert_eq!(graph_rows(&["--max-duration", "31"]), ["ip_output", "tcp_v4_rcv"]);
}

#[test]
fn test_min_duration_only() {
    assert_eq!(graph_rows(&["--min-duration", "35"]), ["ip_rcv", "tcp_sendmsg"]);
    assert!(graph_rows(&["--min-duration", "100"]).is_empty());
}

#[test]
fn test_reversed_duration_window_is_usage_error() {
    let output = chainscope(&[
        TRACE, "--all", "--graph", "--min-duration", "100", "--max-duration", "50",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("is greater than --max-duration"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_exit_codes() {
    let output = chainscope(&[MALFORMED]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("has 3 fields, expected 4"));

    let output = chainscope(&["/nonexistent/trace.json"]);
    assert_eq!(output.status.code(), Some(1));

    let output = chainscope(&[TRACE, "--srcip", ""]);
    assert_eq!(output.status.code(), Some(2));

    let output = chainscope(&[TRACE, "--chain", "1"]);
    assert_eq!(output.status.code(), Some(2));
}

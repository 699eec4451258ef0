use chainscope::analysis::{CallFilter, CallTypeFilter, ThreadFilter};
use chainscope::domain::{CallType, ChainScope};
use chainscope::export::JsonExporter;
use chainscope::session::Session;
use chainscope::source::{FileTraceSource, TraceRequest, TraceSource};
use chainscope_common::Category;

const TRACE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/trace.json");
const FUNCS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/funcs.json");

fn session(request: &TraceRequest) -> Session {
    let source = FileTraceSource::new(TRACE).with_symbols(FUNCS);
    let trace = source.fetch(request).expect("Failed to fetch fixture trace");
    let symbols = source.symbol_table().expect("Failed to load fixture symbols");
    Session::new(trace, symbols)
}

fn request() -> TraceRequest {
    TraceRequest::new("192.168.1.10", "192.168.1.20", 51514, 443)
}

#[test]
fn test_export_creates_valid_json() {
    let request = request().all_history();
    let mut session = session(&request);

    let mut exporter = JsonExporter::new();
    exporter.set_duration_range(session.duration_range());
    exporter.add_inspector(
        Category::Receive,
        session.inspector(Category::Receive, &CallFilter::unconstrained()),
    );
    exporter.set_graph(session.graph(request.default_scope(), None));

    let file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    exporter.export_to_path(file.path()).expect("Failed to export");

    let json_str = std::fs::read_to_string(file.path()).expect("Failed to read export");
    let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("Invalid JSON");

    assert_eq!(parsed["generator"], "chainscope");
    assert_eq!(parsed["inspector"]["receive"]["totalChains"], 3);
    assert_eq!(parsed["inspector"]["receive"]["totalCalls"], 10);

    let graph = &parsed["graph"];
    assert_eq!(graph["scope"], "all");
    let nodes = graph["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    let ip_rcv = nodes.iter().find(|n| n["id"] == "receive_16").unwrap();
    assert_eq!(ip_rcv["fullName"], "ip_rcv");
    assert_eq!(ip_rcv["callCount"], 3);

    let edges = graph["edges"].as_array().unwrap();
    let hot = edges.iter().find(|e| e["source"] == "receive_16").unwrap();
    assert_eq!(hot["target"], "receive_32");
    assert_eq!(hot["weight"], 2);

    let legend = graph["legend"].as_array().unwrap();
    assert_eq!(legend.len(), 2);
    assert_eq!(legend[1]["name"], "send");
}

#[test]
fn test_filtered_inspector_export() {
    let mut session = session(&request().all_history());
    let filter = CallFilter::new("TCP", CallTypeFilter::Only(CallType::Call), ThreadFilter::All);
    let view = session.inspector(Category::Receive, &filter);

    // the third chain never enters tcp_v4_rcv
    assert_eq!(view.filtered_chains, 2);
    assert!(!view.chains[2].visible);
    assert_eq!(view.chains[0].visible_calls, 1);
    assert_eq!(view.chains[0].roots[0].record.func_name, "tcp_v4_rcv");

    let mut exporter = JsonExporter::new();
    exporter.add_inspector(Category::Receive, view);
    let mut buffer = Vec::new();
    exporter.export(&mut buffer).unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(parsed["inspector"]["receive"]["filteredChains"], 2);
    assert_eq!(parsed["inspector"]["receive"]["chains"][2]["visible"], false);
}

#[test]
fn test_single_sample_request_scopes_to_latest_chain() {
    let request = request();
    let mut session = session(&request);
    assert_eq!(session.trace().receive.len(), 1);

    let graph = session.graph(request.default_scope(), None);
    assert_eq!(graph.scope, ChainScope::Single(0));
    assert_eq!(graph.thread_id, Some(101));
    // latest receive chain: ip_rcv only; latest send chain: ip_output plus an orphan return
    assert_eq!(graph.nodes.len(), 2);
    assert!(graph.edges.is_empty());
    assert!(graph.nodes.iter().any(|n| n.full_name == "ip_output"));
}

#[test]
fn test_export_to_unwritable_path_fails() {
    let exporter = JsonExporter::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.json");
    assert!(exporter.export_to_path(&path).is_err());
}

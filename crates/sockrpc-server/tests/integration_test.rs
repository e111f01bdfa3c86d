// Integration tests for sockrpc-server
//
// These tests bind a real RpcServer with the stock handlers on a socket in
// a temporary directory, then talk to it through the client transport.

use serde_json::json;
use sockrpc_common::config::{ClientConfig, ServerConfig};
use sockrpc_common::protocol::{FaultKind, Request, Response};
use sockrpc_common::transport::UnixTransport;
use sockrpc_common::SockrpcError;
use sockrpc_server::{FnHandler, HandlerRegistry, RpcServer};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// Start a server in a background thread and return its socket path
fn start_test_server(dir: &TempDir, registry: HandlerRegistry) -> PathBuf {
    let path = dir.path().join("rpc.sock");
    let server = RpcServer::bind(ServerConfig::new(&path), registry)
        .expect("Failed to bind server");

    thread::spawn(move || {
        server.run().expect("Server failed");
    });

    path
}

fn call(path: &Path, request: &Request) -> Response {
    let transport = UnixTransport::new(ClientConfig::new(path));
    let mut conn = transport.connect().expect("Failed to connect");
    conn.send_request(request).expect("Request failed")
}

// ============================================================================
// Stock Handlers
// ============================================================================

#[test]
fn test_reverse() {
    let dir = TempDir::new().unwrap();
    let path = start_test_server(&dir, HandlerRegistry::with_builtin_handlers());

    let request = Request::new("reverse", vec![json!("hello world")]);
    let response = call(&path, &request);

    assert_eq!(response.id, request.id);
    assert_eq!(response.result, json!("dlrow olleh"));
    assert_eq!(response.result_type, "str");
}

#[test]
fn test_valid_anagram() {
    let dir = TempDir::new().unwrap();
    let path = start_test_server(&dir, HandlerRegistry::with_builtin_handlers());

    let response = call(&path, &Request::new("valid_anagram", vec![json!("knee"), json!("keen")]));
    assert_eq!(response.result, json!(true));
    assert_eq!(response.result_type, "bool");

    let response = call(&path, &Request::new("valid_anagram", vec![json!("knee"), json!("kee")]));
    assert_eq!(response.result, json!(false));
}

#[test]
fn test_floor_sort_and_nroot() {
    let dir = TempDir::new().unwrap();
    let path = start_test_server(&dir, HandlerRegistry::with_builtin_handlers());

    let response = call(&path, &Request::new("floor", vec![json!(3.9)]));
    assert_eq!(response.result, json!(3));
    assert_eq!(response.result_type, "int");

    let response = call(&path, &Request::new("sort", vec![json!(["c", "a", "b"])]));
    assert_eq!(response.result, json!(["a", "b", "c"]));
    assert_eq!(response.result_type, "list");

    let response = call(&path, &Request::new("nroot", vec![json!(3), json!(8)]));
    assert_eq!(response.result_type, "float");
    assert!((response.result.as_f64().unwrap() - 2.0).abs() < 1e-9);
}

// ============================================================================
// Dispatch Failures
// ============================================================================

#[test]
fn test_unknown_method() {
    let dir = TempDir::new().unwrap();
    let path = start_test_server(&dir, HandlerRegistry::with_builtin_handlers());

    let request = Request::new("nonexistent", vec![]);
    let response = call(&path, &request);

    assert_eq!(response.id, request.id);
    assert_eq!(response.result_type, "error");
    assert!(matches!(
        response.into_result(),
        Err(SockrpcError::UnknownMethod(_))
    ));
}

#[test]
fn test_arity_and_type_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = start_test_server(&dir, HandlerRegistry::with_builtin_handlers());

    let response = call(&path, &Request::new("reverse", vec![json!("a"), json!("b")]));
    assert_eq!(response.error.unwrap().kind, FaultKind::ArityMismatch);

    let response = call(&path, &Request::new("reverse", vec![json!(42)]));
    assert_eq!(response.error.unwrap().kind, FaultKind::TypeMismatch);
}

#[test]
fn test_handler_panic_keeps_server_alive() {
    let dir = TempDir::new().unwrap();
    let registry = HandlerRegistry::builder()
        .builtin_handlers()
        .unwrap()
        .register(FnHandler::new("boom", &[], |_| panic!("boom")))
        .unwrap()
        .build();
    let path = start_test_server(&dir, registry);

    let response = call(&path, &Request::new("boom", vec![]));
    assert_eq!(response.error.unwrap().kind, FaultKind::Handler);

    let response = call(&path, &Request::new("reverse", vec![json!("ok")]));
    assert_eq!(response.result, json!("ko"));
}

// ============================================================================
// Concurrency and Timeouts
// ============================================================================

#[test]
fn test_concurrent_clients_get_their_own_responses() {
    let dir = TempDir::new().unwrap();
    let path = start_test_server(&dir, HandlerRegistry::with_builtin_handlers());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let path = path.clone();
            thread::spawn(move || {
                let word = format!("word-{}", i);
                let request = Request::new("reverse", vec![json!(word.as_str())]);
                let response = call(&path, &request);

                assert_eq!(response.id, request.id);
                let expected: String = word.chars().rev().collect();
                assert_eq!(response.result, json!(expected));
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("client thread panicked");
    }
}

#[test]
fn test_slow_handler_times_out_client() {
    let dir = TempDir::new().unwrap();
    let registry = HandlerRegistry::builder()
        .register(FnHandler::new("sleep", &[], |_| {
            thread::sleep(Duration::from_millis(500));
            Ok(json!(null))
        }))
        .unwrap()
        .build();
    let path = start_test_server(&dir, registry);

    let transport = UnixTransport::new(
        ClientConfig::new(&path).with_read_timeout(Duration::from_millis(100)),
    );
    let mut conn = transport.connect().unwrap();
    let result = conn.send_request(&Request::new("sleep", vec![]));

    assert!(matches!(result, Err(SockrpcError::Timeout(_))));
}

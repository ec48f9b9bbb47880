// tests/gateway_tests.rs
use aggregation_gateway::gateway::{build_http_client, Gateway};
use aggregation_gateway::server::{RequestHandler, ServerBuilder};
use hyper::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;

// The returned mock must be kept alive; mockito removes it on drop.
async fn mock_greeting(server: &mut mockito::Server, name: &str) -> mockito::Mock {
    server
        .mock("GET", format!("/{}", name).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "message": format!("hello {}", name) }).to_string())
        .create_async()
        .await
}

#[tokio::test]
async fn test_check_joins_both_upstreams() {
    let mut server = mockito::Server::new_async().await;
    let alice = mock_greeting(&mut server, "alice").await;
    let bob = mock_greeting(&mut server, "bob").await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/check/alice/bob").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    let body = common::body_json(response).await;
    assert_eq!(body["name1"], json!({ "message": "hello alice" }));
    assert_eq!(body["name2"], json!({ "message": "hello bob" }));
    assert!(body["requestTime"].is_string());
    alice.assert_async().await;
    bob.assert_async().await;
}

#[tokio::test]
async fn test_check_substitutes_fallback_for_failed_branch() {
    let mut server = mockito::Server::new_async().await;
    let _alice = mock_greeting(&mut server, "alice").await;
    let _mock = server
        .mock("GET", "/bob")
        .with_status(500)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/check/alice/bob").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["name1"], json!({ "message": "hello alice" }));
    assert_eq!(body["name2"], json!({ "name": "bob" }));
}

#[tokio::test]
async fn test_check_answers_200_when_upstream_is_down() {
    let addr = common::closed_addr().await;
    let handler = common::handler_for(&common::config_for(&format!("http://{}/", addr)));

    let started = chrono::Utc::now();
    let response = common::get(&handler, "/check/alice/bob").await;

    assert_eq!(response.status(), StatusCode::OK);
    let mut body = common::body_json(response).await;
    let request_time = body
        .as_object_mut()
        .unwrap()
        .remove("requestTime")
        .unwrap();
    let request_time = chrono::DateTime::parse_from_rfc3339(request_time.as_str().unwrap()).unwrap();
    assert!(request_time >= started);
    assert_eq!(
        body,
        json!({ "name1": { "name": "alice" }, "name2": { "name": "bob" } })
    );
}

#[tokio::test]
async fn test_check_preserves_label_order_in_body() {
    let mut server = mockito::Server::new_async().await;
    let _zed = mock_greeting(&mut server, "zed").await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/check/zed/amy").await;
    let text = common::body_text(response).await;

    let name1 = text.find("\"name1\"").unwrap();
    let name2 = text.find("\"name2\"").unwrap();
    let request_time = text.find("\"requestTime\"").unwrap();
    assert!(name1 < name2 && name2 < request_time);
}

#[tokio::test]
async fn test_check_repeated_calls_are_structurally_identical() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/alice")
        .with_status(200)
        .with_body(r#"{"message":"hello alice"}"#)
        .expect(2)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let mut first = common::body_json(common::get(&handler, "/check/alice/bob").await).await;
    let mut second = common::body_json(common::get(&handler, "/check/alice/bob").await).await;
    first.as_object_mut().unwrap().remove("requestTime");
    second.as_object_mut().unwrap().remove("requestTime");

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_branch_deadline_bounds_slow_upstream() {
    let addr = common::start_silent_backend().await;
    let mut config = common::config_for(&format!("http://{}/", addr));
    config.upstream.branch_deadline_ms = Some(200);
    let handler = common::handler_for(&config);

    let started = Instant::now();
    let response = common::get(&handler, "/check/alice/bob").await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["name1"], json!({ "name": "alice" }));
    assert_eq!(body["name2"], json!({ "name": "bob" }));
}

#[tokio::test]
async fn test_invalid_identifier_is_internal_error() {
    let server = mockito::Server::new_async().await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/check/../bob").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = common::body_text(response).await;
    assert!(text.contains("invalid identifier"), "body was: {text}");
}

#[tokio::test]
async fn test_fallback_carries_decoded_identifier() {
    let addr = common::closed_addr().await;
    let handler = common::handler_for(&common::config_for(&format!("http://{}/", addr)));

    let response = common::get(&handler, "/check/hello%20world/caf%C3%A9").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["name1"], json!({ "name": "hello world" }));
    assert_eq!(body["name2"], json!({ "name": "café" }));
}

#[tokio::test]
async fn test_decoded_identifier_is_reencoded_upstream() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/hello%20world")
        .with_status(200)
        .with_body(r#"{"message":"hello hello world"}"#)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&format!("{}/api/", server.url())));

    let body = common::body_json(common::get(&handler, "/check/hello%20world/bob").await).await;

    assert_eq!(body["name1"], json!({ "message": "hello hello world" }));
}

#[tokio::test]
async fn test_identifier_with_scheme_stays_under_base() {
    let mut server = mockito::Server::new_async().await;
    let root = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(r#"{"secret":"root of host"}"#)
        .expect(0)
        .create_async()
        .await;
    let scoped = server
        .mock("GET", "/api/https:evil.example")
        .with_status(200)
        .with_body(r#"{"message":"scoped"}"#)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&format!("{}/api/", server.url())));

    let response = common::get(&handler, "/check/https:evil.example/mailto:x").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["name1"], json!({ "message": "scoped" }));
    assert_eq!(body["name2"], json!({ "name": "mailto:x" }));
    scoped.assert_async().await;
    root.assert_async().await;
}

#[tokio::test]
async fn test_encoded_dot_segment_is_internal_error() {
    let mut server = mockito::Server::new_async().await;
    let root = server
        .mock("GET", "/")
        .with_status(200)
        .with_body(r#"{"secret":"root of host"}"#)
        .expect(0)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&format!("{}/api/", server.url())));

    for path in ["/check/%2E%2E/bob", "/check/%2e./bob", "/check/a%2Fb/bob"] {
        let response = common::get(&handler, path).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{path}");
        let text = common::body_text(response).await;
        assert!(text.contains("invalid identifier"), "{path}: {text}");
    }
    root.assert_async().await;
}

#[tokio::test]
async fn test_non_utf8_segment_is_internal_error() {
    let server = mockito::Server::new_async().await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/check/%FF/bob").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = common::body_text(response).await;
    assert!(text.contains("percent-encoded UTF-8"), "body was: {text}");
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let server = mockito::Server::new_async().await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/products").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = hyper::Request::post("/health")
        .body(hyper::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(handler.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let server = mockito::Server::new_async().await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let request = hyper::Request::get("/nowhere")
        .header("x-request-id", "abc-123")
        .body(hyper::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(handler.clone(), request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");

    let response = common::get(&handler, "/nowhere").await;
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}

#[tokio::test]
async fn test_health_all_up() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/test")
        .with_status(200)
        .with_body(r#"{"message":"hello test"}"#)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(response).await,
        json!({ "producerAvailability": "UP", "availabilityItself": "UP" })
    );
}

#[tokio::test]
async fn test_health_down_when_probe_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/test")
        .with_status(503)
        .create_async()
        .await;
    let handler = common::handler_for(&common::config_for(&server.url()));

    let response = common::get(&handler, "/health").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        common::body_json(response).await,
        json!({ "producerAvailability": "DOWN", "availabilityItself": "UP" })
    );
}

#[tokio::test]
async fn test_health_probe_timeout_is_bounded() {
    let addr = common::start_silent_backend().await;
    let mut config = common::config_for(&format!("http://{}/", addr));
    config.health.unhealthy_status = 500;
    let handler = common::handler_for(&config);

    let started = Instant::now();
    let response = common::get(&handler, "/health").await;

    // probe timeout is 300ms; the client's own timeout is 5s
    assert!(started.elapsed() < Duration::from_millis(1_500));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        common::body_json(response).await["producerAvailability"],
        json!("DOWN")
    );
}

#[tokio::test]
async fn test_served_over_tcp_with_graceful_shutdown() {
    let mut server = mockito::Server::new_async().await;
    let _alice = mock_greeting(&mut server, "alice").await;
    let _bob = mock_greeting(&mut server, "bob").await;

    let config = common::config_for(&server.url());
    let client = build_http_client(&config.upstream).unwrap();
    let gateway = Arc::new(Gateway::from_config(&config, client, None).unwrap());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let serving = tokio::spawn(
        ServerBuilder::new(addr)
            .with_handler(RequestHandler::new(gateway))
            .with_shutdown(async move {
                let _ = stop_rx.await;
            })
            .serve_on(listener),
    );

    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{}/check/alice/bob", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name1"]["message"], "hello alice");
    assert_eq!(body["name2"]["message"], "hello bob");

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(1), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

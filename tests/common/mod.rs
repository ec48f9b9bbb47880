//! Shared helpers for gateway integration tests.

use aggregation_gateway::config::Config;
use aggregation_gateway::gateway::{build_http_client, Gateway};
use aggregation_gateway::server::RequestHandler;
use hyper::{Body, Request, Response};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;

/// Gateway config pointing both the upstream and the probe at `base`.
pub fn config_for(base: &str) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = Url::parse(base).unwrap();
    config.probe.url = Url::parse(base).unwrap().join("test").unwrap();
    config.probe.timeout_ms = 300;
    config
}

pub fn handler_for(config: &Config) -> RequestHandler {
    let client = build_http_client(&config.upstream).unwrap();
    let gateway = Gateway::from_config(config, client, None).unwrap();
    RequestHandler::new(Arc::new(gateway))
}

pub async fn get(handler: &RequestHandler, path: &str) -> Response<Body> {
    let request = Request::get(path).body(Body::empty()).unwrap();
    handler.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// An address where nothing is listening.
#[allow(dead_code)]
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A server that accepts connections and never answers.
#[allow(dead_code)]
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

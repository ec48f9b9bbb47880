//! src/bin/producer.rs
//! Demo upstream for the gateway.
//! Run: cargo run --bin producer -- [port]

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr};
use tracing::info;

// GET / greets "fellow", GET /{name} greets the name.
async fn hello(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path().trim_start_matches('/');
    if req.method() != Method::GET || path.contains('/') {
        let mut response = Response::new(Body::from("Not Found"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        return Ok(response);
    }

    let message = if path.is_empty() {
        "hello fellow".to_string()
    } else {
        format!("hello {}", path)
    };
    let body = json!({
        "message": message,
        "date": Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true),
    });

    let mut response = Response::new(Body::from(body.to_string()));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("producer=info".parse()?),
        )
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "8080".into())
        .parse()?;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(hello)) });

    info!("Producer listening on http://{}", addr);
    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}

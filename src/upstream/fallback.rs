// src/upstream/fallback.rs
use super::{JsonObject, UpstreamIdentifier};
use serde_json::Value;

/// Produces the substitute payload for a branch whose upstream call failed.
///
/// Implementations must be pure functions of the identifier and must not fail.
pub trait FallbackPolicy: Send + Sync {
    fn on_failure(&self, identifier: &UpstreamIdentifier) -> JsonObject;
}

/// Default policy: `{"name": <identifier>}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameFallback;

impl FallbackPolicy for NameFallback {
    fn on_failure(&self, identifier: &UpstreamIdentifier) -> JsonObject {
        let mut payload = JsonObject::new();
        payload.insert("name".to_string(), Value::String(identifier.to_string()));
        payload
    }
}

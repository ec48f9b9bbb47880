// src/upstream/mod.rs
mod client;
mod fallback;
mod identifier;

pub use client::{BranchSource, UpstreamClient, UpstreamError};
pub use fallback::{FallbackPolicy, NameFallback};
pub use identifier::{IdentifierError, UpstreamIdentifier};

/// JSON object payload exchanged with upstreams.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

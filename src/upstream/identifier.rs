// src/upstream/identifier.rs
use std::fmt;

/// A single path segment naming the upstream resource a branch targets.
///
/// Holds the decoded text; encoding for the outbound URL happens in
/// `UpstreamClient::url_for`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamIdentifier(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier must not be empty")]
    Empty,

    #[error("identifier '{0}' is not a single path segment")]
    NotASegment(String),
}

impl UpstreamIdentifier {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if raw == "."
            || raw == ".."
            || raw.contains(|c: char| matches!(c, '/' | '\\' | '?' | '#') || c.is_control())
        {
            return Err(IdentifierError::NotASegment(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpstreamIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for UpstreamIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

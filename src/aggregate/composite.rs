// src/aggregate/composite.rs
use crate::upstream::JsonObject;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const REQUEST_TIME_FIELD: &str = "requestTime";

/// How one branch was resolved. Exactly one per branch.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchResult {
    Success(JsonObject),
    Fallback(JsonObject),
}

impl BranchResult {
    pub fn payload(&self) -> &JsonObject {
        match self {
            BranchResult::Success(payload) | BranchResult::Fallback(payload) => payload,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, BranchResult::Fallback(_))
    }
}

/// Joined result of a fan-out, serialized as
/// `{"<label>": <payload>, ..., "requestTime": "<RFC 3339>"}` in declaration order.
#[derive(Debug, Clone)]
pub struct CompositeResponse {
    branches: Vec<(String, BranchResult)>,
    request_time: DateTime<Utc>,
}

impl CompositeResponse {
    pub(crate) fn new(branches: Vec<(String, BranchResult)>, request_time: DateTime<Utc>) -> Self {
        Self {
            branches,
            request_time,
        }
    }

    pub fn get(&self, label: &str) -> Option<&BranchResult> {
        self.branches
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, result)| result)
    }

    pub fn branches(&self) -> impl Iterator<Item = (&str, &BranchResult)> {
        self.branches.iter().map(|(l, r)| (l.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn fallback_count(&self) -> usize {
        self.branches.iter().filter(|(_, r)| r.is_fallback()).count()
    }

    pub fn request_time(&self) -> DateTime<Utc> {
        self.request_time
    }
}

impl Serialize for CompositeResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.branches.len() + 1))?;
        for (label, result) in &self.branches {
            map.serialize_entry(label, result.payload())?;
        }
        map.serialize_entry(
            REQUEST_TIME_FIELD,
            &self.request_time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        )?;
        map.end()
    }
}

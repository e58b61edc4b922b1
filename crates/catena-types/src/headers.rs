use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Commit metadata: author, message, timestamp, and caller-defined pairs.
///
/// Headers are part of the hashed commit content, so two commits that
/// differ only in metadata still have distinct ids. The `extra` map is
/// ordered so serialization (and therefore the commit id) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitHeaders {
    /// Who created the commit.
    pub author: String,
    /// Human-readable commit message.
    pub message: String,
    /// Creation time, microseconds since the Unix epoch. Caller-supplied.
    pub created_at: i64,
    /// Caller-defined key/value pairs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CommitHeaders {
    /// Create headers with the given author and message.
    pub fn new(author: impl Into<String>, message: impl Into<String>, created_at: i64) -> Self {
        Self {
            author: author.into(),
            message: message.into(),
            created_at,
            extra: BTreeMap::new(),
        }
    }

    /// Add a caller-defined header pair.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

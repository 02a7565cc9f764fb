use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of identities produced by [`AggregateId::generate`].
pub const GENERATED_ID_LEN: usize = 11;

/// Unique identifier for an aggregate instance.
///
/// Identities are opaque strings assigned by whoever issues the aggregate,
/// never by the engine itself. They are immutable for the aggregate's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Wraps a caller-provided identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh 11-character uppercase token from a random UUID.
    pub fn generate() -> Self {
        let mut token = Uuid::new_v4().to_string();
        token.truncate(GENERATED_ID_LEN);
        Self(token.to_uppercase())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identity begins with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<AggregateId> for String {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

impl AsRef<str> for AggregateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

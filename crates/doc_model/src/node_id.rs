//! Block identity: persistent ids, creation timestamps and id generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Persistent identifier of a block node.
///
/// Ids are opaque strings so that documents written by other clients (or
/// older versions) keep their ids verbatim. Freshly generated ids are UUID v4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Create a new random BlockId
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Uuid> for BlockId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

/// Attributes shared by every block node.
///
/// `id` and `created_at` are the identity pair maintained by the identity
/// pass. Attributes this model does not know about are kept in `extra` so a
/// load/save cycle does not drop them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockAttrs {
    pub id: Option<BlockId>,
    pub created_at: Option<DateTime<Utc>>,
    pub extra: Map<String, Value>,
}

impl BlockAttrs {
    /// Attributes carrying a complete identity
    pub fn with_identity(id: BlockId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Some(id),
            created_at: Some(created_at),
            extra: Map::new(),
        }
    }

    /// Check whether both identity fields are present
    pub fn has_identity(&self) -> bool {
        self.id.is_some() && self.created_at.is_some()
    }
}

/// Source of fresh block ids and creation timestamps.
///
/// The identity pass and the content synthesizers go through this trait so
/// tests can substitute deterministic ids and a fixed clock.
pub trait IdGenerator {
    /// Produce an id that has never been handed out before
    fn next_id(&mut self) -> BlockId;

    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Convenience: a complete identity for a brand-new block
    fn fresh_attrs(&mut self) -> BlockAttrs {
        let id = self.next_id();
        BlockAttrs::with_identity(id, self.now())
    }
}

/// Default generator: UUID v4 ids and the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> BlockId {
        BlockId::new()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic generator yielding `<prefix>-1`, `<prefix>-2`, ... with a
/// fixed timestamp. Used by tests and by hosts that replay documents.
#[derive(Debug, Clone)]
pub struct SequentialGenerator {
    prefix: String,
    counter: u64,
    timestamp: DateTime<Utc>,
}

impl SequentialGenerator {
    pub fn new(prefix: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            timestamp,
        }
    }

    /// Move the fixed clock
    pub fn set_now(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.counter
    }
}

impl IdGenerator for SequentialGenerator {
    fn next_id(&mut self) -> BlockId {
        self.counter += 1;
        BlockId(format!("{}-{}", self.prefix, self.counter))
    }

    fn now(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_uuid_ids_are_unique() {
        let mut generator = UuidGenerator;
        let a = generator.next_id();
        let b = generator.next_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_sequential_generator() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut generator = SequentialGenerator::new("blk", ts);
        assert_eq!(generator.next_id().as_str(), "blk-1");
        let attrs = generator.fresh_attrs();
        assert_eq!(attrs.id, Some(BlockId::from("blk-2")));
        assert_eq!(attrs.created_at, Some(ts));
        assert_eq!(generator.issued(), 2);
    }
}

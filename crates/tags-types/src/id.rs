use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an anchor within one repository.
///
/// Ids are assigned from a persisted counter when the anchor is created and
/// are never reused, even after the anchor is deleted. Zero is never issued.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(u64);

impl AnchorId {
    /// Wrap a raw id value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value, as stored in the graph table.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnchorId({})", self.0)
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Identifier of a relation within one repository.
///
/// Relation ids increase monotonically, so ordering by id is insertion order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(u64);

impl RelationId {
    /// Wrap a raw id value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value, as stored in the graph table.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationId({})", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_roundtrip() {
        assert_eq!(AnchorId::from_raw(42).get(), 42);
        assert_eq!(RelationId::from_raw(7).get(), 7);
    }

    #[test]
    fn display_prefixes() {
        assert_eq!(AnchorId::from_raw(3).to_string(), "a3");
        assert_eq!(RelationId::from_raw(9).to_string(), "r9");
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(AnchorId::from_raw(1) < AnchorId::from_raw(2));
        assert!(RelationId::from_raw(10) > RelationId::from_raw(9));
    }

    #[test]
    fn serde_roundtrip() {
        let id = AnchorId::from_raw(1234);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: AnchorId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}

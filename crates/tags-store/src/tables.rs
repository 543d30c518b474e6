//! Table definitions and persisted row formats.
//!
//! The logical *graph* table is one primary table plus three indexes. The
//! logical *config* table holds repository settings and root bindings.

use redb::{MultimapTableDefinition, TableDefinition};
use serde::{Deserialize, Serialize};
use tags_codec::CodecResult;
use tags_types::{
    Anchor, AnchorId, AnchorValue, Fingerprint, Label, Relation, RelationId, ScalarKind, Shape,
};

use crate::error::{RepoError, RepoResult};

/// Schema version written at creation and checked on open.
pub const SCHEMA_VERSION: u32 = 1;

/// Row kind discriminator for anchor rows in [`GRAPH_TABLE`].
pub const ROW_ANCHOR: u8 = 0;
/// Row kind discriminator for relation rows in [`GRAPH_TABLE`].
pub const ROW_RELATION: u8 = 1;

/// Table: Graph
/// Key:   `(u8, u64)` # (row kind, anchor id | relation id)
/// Value: `Vec<u8>`   # bincode `AnchorRow` | `RelationRow`
pub const GRAPH_TABLE: TableDefinition<(u8, u64), &[u8]> = TableDefinition::new("graph-1");

/// Table: Anchors by fingerprint
/// Key:   `[u8; 32]` # Fingerprint
/// Value: `u64`      # AnchorId (several on collision)
pub const FINGERPRINT_INDEX: MultimapTableDefinition<&[u8; 32], u64> =
    MultimapTableDefinition::new("graph-by-fingerprint-1");

/// Table: Relations by subject
/// Key:   `(u64, &str, u8, u64)` # (subject, label, has_ordinal, ordinal)
/// Value: `u64`                  # RelationId
///
/// Unordered relations use `(subject, label, 0, 0)`, so the key doubles as
/// the uniqueness constraint for both relation flavours.
pub const SUBJECT_INDEX: TableDefinition<SubjectKey, u64> =
    TableDefinition::new("graph-by-subject-1");
pub type SubjectKey<'a> = (u64, &'a str, u8, u64);

/// Table: Relations by object
/// Key:   `(u64, u64)` # (object, relation id)
/// Value: `()`
pub const OBJECT_INDEX: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("graph-by-object-1");

/// Table: Config
/// Key:   `&str`    # setting name
/// Value: `Vec<u8>` # bincode value
pub const CONFIG_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("config-1");

pub const KEY_SCHEMA_VERSION: &str = "schema_version";
pub const KEY_REPOSITORY_ID: &str = "repository_id";
pub const KEY_NEXT_ANCHOR: &str = "next_anchor_id";
pub const KEY_NEXT_RELATION: &str = "next_relation_id";
/// Prefix of root binding keys: `root/<name>`.
pub const ROOT_PREFIX: &str = "root/";
/// First key sorting after every `root/` key.
pub const ROOT_PREFIX_END: &str = "root0";

pub fn root_key(name: &str) -> String {
    format!("{ROOT_PREFIX}{name}")
}

/// Subject index key for a relation slot.
pub fn subject_key(subject: AnchorId, label: &Label, ordinal: Option<u64>) -> SubjectKey<'_> {
    match ordinal {
        Some(o) => (subject.get(), label.as_str(), 1, o),
        None => (subject.get(), label.as_str(), 0, 0),
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// Persisted anchor payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Scalar {
        kind: ScalarKind,
        bytes: Vec<u8>,
        fingerprint: Fingerprint,
    },
    Structural(Shape),
}

/// Persisted anchor row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRow {
    pub payload: Payload,
    pub refcount: u64,
    pub pins: u32,
}

impl AnchorRow {
    pub fn is_unreferenced(&self) -> bool {
        self.refcount == 0 && self.pins == 0
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match &self.payload {
            Payload::Scalar { fingerprint, .. } => Some(fingerprint),
            Payload::Structural(_) => None,
        }
    }

    /// Decode into the public record type.
    pub fn into_anchor(self, id: AnchorId) -> CodecResult<Anchor> {
        let (value, fingerprint) = match self.payload {
            Payload::Scalar {
                kind,
                bytes,
                fingerprint,
            } => (
                AnchorValue::Scalar(tags_codec::decode(&bytes, kind)?),
                Some(fingerprint),
            ),
            Payload::Structural(shape) => (AnchorValue::Structural(shape), None),
        };
        Ok(Anchor {
            id,
            value,
            fingerprint,
            refcount: self.refcount,
            pins: self.pins,
        })
    }
}

/// Persisted relation row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRow {
    pub subject: AnchorId,
    pub label: Label,
    pub object: AnchorId,
    pub ordinal: Option<u64>,
}

impl RelationRow {
    pub fn into_relation(self, id: RelationId) -> Relation {
        Relation {
            id,
            subject: self.subject,
            label: self.label,
            object: self.object,
            ordinal: self.ordinal,
        }
    }
}

pub fn encode_row<T: Serialize>(row: &T) -> RepoResult<Vec<u8>> {
    Ok(bincode::serialize(row)?)
}

pub fn decode_row<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> RepoResult<T> {
    bincode::deserialize(bytes).map_err(|e| RepoError::Serialization(e.to_string()))
}

/// Order relations for `out_edges`: ordinals ascending first, then
/// unordered relations in insertion order.
pub fn sort_out_edges(relations: &mut [Relation]) {
    relations.sort_by_key(|r| (r.ordinal.is_none(), r.ordinal, r.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tags_types::Scalar;

    #[test]
    fn anchor_row_roundtrip() {
        let enc = tags_codec::encode(&Scalar::from("hello")).unwrap();
        let row = AnchorRow {
            payload: Payload::Scalar {
                kind: enc.kind,
                fingerprint: enc.fingerprint(),
                bytes: enc.bytes,
            },
            refcount: 3,
            pins: 1,
        };
        let bytes = encode_row(&row).unwrap();
        let back: AnchorRow = decode_row(&bytes).unwrap();
        assert_eq!(back, row);

        let anchor = back.into_anchor(AnchorId::from_raw(5)).unwrap();
        assert_eq!(anchor.value, AnchorValue::Scalar(Scalar::from("hello")));
        assert_eq!(anchor.refcount, 3);
        assert_eq!(anchor.pins, 1);
        assert!(anchor.fingerprint.is_some());
    }

    #[test]
    fn structural_row_has_no_fingerprint() {
        let row = AnchorRow {
            payload: Payload::Structural(Shape::Sequence),
            refcount: 0,
            pins: 0,
        };
        assert!(row.fingerprint().is_none());
        assert!(row.is_unreferenced());
    }

    #[test]
    fn subject_key_separates_ordered_and_unordered() {
        let label = Label::item();
        let s = AnchorId::from_raw(1);
        assert_eq!(subject_key(s, &label, None), (1, "item", 0, 0));
        assert_eq!(subject_key(s, &label, Some(0)), (1, "item", 1, 0));
    }

    #[test]
    fn root_keys_sort_inside_prefix_range() {
        let k = root_key("zzz");
        assert!(k.as_str() >= ROOT_PREFIX);
        assert!(k.as_str() < ROOT_PREFIX_END);
    }

    #[test]
    fn out_edge_order() {
        let rel = |id: u64, ordinal: Option<u64>| Relation {
            id: RelationId::from_raw(id),
            subject: AnchorId::from_raw(1),
            label: Label::item(),
            object: AnchorId::from_raw(2),
            ordinal,
        };
        let mut edges = vec![rel(1, None), rel(2, Some(5)), rel(3, Some(0)), rel(4, None)];
        sort_out_edges(&mut edges);
        let ids: Vec<u64> = edges.iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![3, 2, 1, 4]);
    }

    #[test]
    fn decode_garbage_row_fails() {
        assert!(matches!(
            decode_row::<RelationRow>(&[0xff]),
            Err(RepoError::Serialization(_))
        ));
    }
}

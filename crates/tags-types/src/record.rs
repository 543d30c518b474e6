use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::id::{AnchorId, RelationId};
use crate::label::Label;
use crate::value::AnchorValue;

/// A decoded anchor record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Stable identifier.
    pub id: AnchorId,
    /// Scalar payload or structural marker.
    pub value: AnchorValue,
    /// Content fingerprint. `None` for structural anchors, which are never
    /// deduplicated.
    pub fingerprint: Option<Fingerprint>,
    /// Number of relation endpoints referencing this anchor. A relation
    /// from an anchor to itself counts twice.
    pub refcount: u64,
    /// Number of root bindings naming this anchor.
    pub pins: u32,
}

impl Anchor {
    /// Whether nothing references or pins this anchor.
    pub fn is_unreferenced(&self) -> bool {
        self.refcount == 0 && self.pins == 0
    }
}

/// A decoded relation record: `subject --label[ordinal]--> object`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub subject: AnchorId,
    pub label: Label,
    pub object: AnchorId,
    /// Element position when `subject` is an ordered composite.
    pub ordinal: Option<u64>,
}

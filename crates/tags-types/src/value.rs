use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a scalar value. The discriminant is the persisted tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScalarKind {
    Null = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Text = 4,
    Bytes = 5,
}

impl ScalarKind {
    /// Persisted one-byte tag.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a persisted tag.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        Ok(match tag {
            0 => Self::Null,
            1 => Self::Bool,
            2 => Self::Int,
            3 => Self::Float,
            4 => Self::Text,
            5 => Self::Bytes,
            other => return Err(TypeError::UnknownKind(other)),
        })
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Text => write!(f, "text"),
            Self::Bytes => write!(f, "bytes"),
        }
    }
}

/// A storable scalar value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Opaque binary blob.
    Bytes(Vec<u8>),
}

impl Scalar {
    /// The kind of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Null => ScalarKind::Null,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Float(_) => ScalarKind::Float,
            Self::Text(_) => ScalarKind::Text,
            Self::Bytes(_) => ScalarKind::Bytes,
        }
    }

    /// Borrow the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// The composite role of a structural anchor.
///
/// A structural anchor carries no scalar payload; it exists to be the
/// subject of relations. The shape records how its out-edges are meant to
/// be read back, so that empty composites keep their kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Shape {
    /// Plain relation endpoint. Readers classify it by its edges.
    Node = 0,
    /// Ordered composite: out-edges carry ordinals.
    Sequence = 1,
    /// Keyed composite: one out-edge per label, no ordinals.
    Mapping = 2,
}

impl Shape {
    /// Persisted one-byte tag.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a persisted tag.
    pub fn from_tag(tag: u8) -> Result<Self, TypeError> {
        Ok(match tag {
            0 => Self::Node,
            1 => Self::Sequence,
            2 => Self::Mapping,
            other => return Err(TypeError::UnknownShape(other)),
        })
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Sequence => write!(f, "sequence"),
            Self::Mapping => write!(f, "mapping"),
        }
    }
}

/// What an anchor holds: a scalar, or the structural-only marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnchorValue {
    Scalar(Scalar),
    Structural(Shape),
}

impl AnchorValue {
    /// Returns `true` for structural-only anchors.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }

    /// Borrow the scalar payload, if any.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Structural(_) => None,
        }
    }
}

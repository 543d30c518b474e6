//! Scalar wire format.
//!
//! ```text
//! Null   -> []
//! Bool   -> [0 | 1]
//! Int    -> 8 bytes, big-endian two's complement
//! Float  -> 8 bytes, big-endian IEEE-754 bits (NaN rejected)
//! Text   -> UTF-8 bytes
//! Bytes  -> raw bytes
//! ```
//!
//! The kind travels beside the bytes (it is a separate column of the anchor
//! row), so payloads carry no tag of their own.

use tags_types::{Fingerprint, Scalar, ScalarKind};

use crate::error::{CodecError, CodecResult};
use crate::hasher::Fingerprinter;

/// An encoded scalar: kind tag plus payload bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Encoded {
    pub kind: ScalarKind,
    pub bytes: Vec<u8>,
}

impl Encoded {
    /// Content fingerprint of this encoding.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(self.kind, &self.bytes)
    }
}

/// Encode a scalar into its persisted form.
pub fn encode(value: &Scalar) -> CodecResult<Encoded> {
    let kind = value.kind();
    let bytes = match value {
        Scalar::Null => Vec::new(),
        Scalar::Bool(b) => vec![u8::from(*b)],
        Scalar::Int(i) => i.to_be_bytes().to_vec(),
        Scalar::Float(f) => {
            if f.is_nan() {
                return Err(CodecError::UnsupportedValueKind(
                    "NaN float has no stable equality".into(),
                ));
            }
            f.to_bits().to_be_bytes().to_vec()
        }
        Scalar::Text(s) => s.as_bytes().to_vec(),
        Scalar::Bytes(b) => b.clone(),
    };
    Ok(Encoded { kind, bytes })
}

/// Decode persisted bytes of the given kind.
pub fn decode(bytes: &[u8], kind: ScalarKind) -> CodecResult<Scalar> {
    let malformed = |reason: String| CodecError::Malformed { kind, reason };
    Ok(match kind {
        ScalarKind::Null => {
            if !bytes.is_empty() {
                return Err(malformed(format!("expected 0 bytes, got {}", bytes.len())));
            }
            Scalar::Null
        }
        ScalarKind::Bool => match bytes {
            [0] => Scalar::Bool(false),
            [1] => Scalar::Bool(true),
            _ => return Err(malformed(format!("invalid bool payload {bytes:?}"))),
        },
        ScalarKind::Int => Scalar::Int(i64::from_be_bytes(fixed8(bytes).map_err(malformed)?)),
        ScalarKind::Float => {
            let f = f64::from_bits(u64::from_be_bytes(fixed8(bytes).map_err(malformed)?));
            if f.is_nan() {
                return Err(malformed("NaN payload".into()));
            }
            Scalar::Float(f)
        }
        ScalarKind::Text => Scalar::Text(
            String::from_utf8(bytes.to_vec()).map_err(|e| malformed(e.to_string()))?,
        ),
        ScalarKind::Bytes => Scalar::Bytes(bytes.to_vec()),
    })
}

/// Fingerprint encoded bytes of the given kind.
pub fn fingerprint(kind: ScalarKind, bytes: &[u8]) -> Fingerprint {
    Fingerprinter::ANCHOR.fingerprint(kind, bytes)
}

fn fixed8(bytes: &[u8]) -> Result<[u8; 8], String> {
    bytes
        .try_into()
        .map_err(|_| format!("expected 8 bytes, got {}", bytes.len()))
}

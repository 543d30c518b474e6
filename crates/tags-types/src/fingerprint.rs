use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed-width content fingerprint of an encoded scalar value.
///
/// Two anchors holding equal values always have equal fingerprints. The
/// converse is not assumed: callers must confirm equality on the encoded
/// bytes before treating two anchors as the same value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from a pre-computed hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Fingerprint {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        let fp = Fingerprint::from_hash([0xab; 32]);
        assert_eq!(fp.to_hex(), "ab".repeat(32));
        assert_eq!(fp.to_string(), fp.to_hex());
        assert_eq!(fp.short_hex(), "abababab");
        assert_eq!(format!("{fp:?}"), "Fingerprint(abababab)");
    }

    #[test]
    fn raw_bytes() {
        let fp = Fingerprint::from([7; 32]);
        assert_eq!(fp.as_bytes(), &[7; 32]);
        assert_eq!(fp, Fingerprint::from_hash([7; 32]));
    }
}

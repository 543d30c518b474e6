use tags_types::{Fingerprint, ScalarKind};

/// Domain-separated BLAKE3 fingerprinter.
///
/// Each fingerprinter carries a domain tag that is prepended to every hash
/// computation, followed by the scalar kind tag. A text value and a blob
/// with identical bytes therefore never share a fingerprint.
pub struct Fingerprinter {
    domain: &'static str,
}

impl Fingerprinter {
    /// Fingerprinter for anchor values.
    pub const ANCHOR: Self = Self {
        domain: "tags-anchor-v1",
    };

    /// Create a fingerprinter with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Fingerprint encoded bytes of the given kind.
    pub fn fingerprint(&self, kind: ScalarKind, bytes: &[u8]) -> Fingerprint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(&[kind.tag()]);
        hasher.update(bytes);
        Fingerprint::from_hash(*hasher.finalize().as_bytes())
    }

    /// The domain tag used by this fingerprinter.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

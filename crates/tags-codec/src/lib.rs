//! Value codec for TAGS.
//!
//! Converts [`Scalar`] values to and from their persisted byte form and
//! computes the content [`Fingerprint`] used to deduplicate anchors.
//!
//! Hashing is BLAKE3 via the `blake3` crate.
//!
//! # Guarantees
//!
//! 1. Encoding is deterministic: equal values always produce equal bytes.
//! 2. Encoding is injective per kind: distinct values of one kind never
//!    share bytes, and the kind tag keeps kinds apart.
//! 3. Fingerprints are hints, not proof of equality. Stores compare the
//!    encoded bytes before reusing an anchor.
//! 4. Values with no stable identity are rejected at encode time with
//!    [`CodecError::UnsupportedValueKind`].
//!
//! [`Scalar`]: tags_types::Scalar
//! [`Fingerprint`]: tags_types::Fingerprint

pub mod codec;
pub mod error;
pub mod hasher;

pub use codec::{decode, encode, fingerprint, Encoded};
pub use error::{CodecError, CodecResult};
pub use hasher::Fingerprinter;

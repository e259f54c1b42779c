//! Canonical serialization and fingerprinting (spec.md §4.9).
//!
//! A fingerprint is SHA-256 over a fixed-width big-endian encoding: each
//! field is prefixed by its *bit*-length as a 64-bit big-endian unsigned
//! integer, followed by its bytes, zero-padded on the left to a multiple
//! of 8 bits. Container fingerprints hash the concatenation of their
//! children's fingerprint bytes in declared order. This mirrors the
//! domain-separated transcript builder pattern used for action signing
//! elsewhere in this codebase, but accumulates a fingerprint pre-image
//! instead of a signing transcript.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// Accumulates a canonical fingerprint pre-image.
pub struct FingerprintBuilder {
    buffer: Vec<u8>,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self { buffer: Vec::with_capacity(256) }
    }

    /// Append a field's raw bytes, prefixed by its bit-length (`len * 8`)
    /// as a 64-bit big-endian unsigned integer.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        let bit_len = (bytes.len() as u64) * 8;
        self.buffer.extend_from_slice(&bit_len.to_be_bytes());
        self.buffer.extend_from_slice(bytes);
    }

    /// Append a `BigUint` in big-endian form, bit-length-prefixed.
    pub fn append_biguint(&mut self, value: &BigUint) {
        self.append_bytes(&value.to_bytes_be());
    }

    /// Append a `u64` as its 8-byte big-endian representation,
    /// bit-length-prefixed (bit-length is always 64).
    pub fn append_u64(&mut self, value: u64) {
        self.append_bytes(&value.to_be_bytes());
    }

    /// Append a `u32` as its 4-byte big-endian representation.
    pub fn append_u32(&mut self, value: u32) {
        self.append_bytes(&value.to_be_bytes());
    }

    /// Append another object's already-computed fingerprint bytes
    /// (used to build container fingerprints over child fingerprints).
    pub fn append_fingerprint(&mut self, fp: &FingerprintBytes) {
        self.buffer.extend_from_slice(&fp.0);
    }

    pub fn finish(self) -> FingerprintBytes {
        let digest = Sha256::digest(&self.buffer);
        FingerprintBytes(digest.into())
    }
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A SHA-256 fingerprint: 32 bytes, printable as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerprintBytes(pub [u8; 32]);

impl FingerprintBytes {
    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for FingerprintBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl std::fmt::Display for FingerprintBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Implemented by every object that participates in fingerprinting.
pub trait Fingerprint {
    /// Append this value's canonical representation to the builder.
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder);

    /// Compute the SHA-256 fingerprint over this value's canonical
    /// pre-image.
    fn get_fingerprint(&self) -> FingerprintBytes {
        let mut builder = FingerprintBuilder::new();
        self.write_fingerprint(&mut builder);
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_equal_inputs() {
        let mut a = FingerprintBuilder::new();
        a.append_u64(7);
        a.append_biguint(&BigUint::from(42u32));
        let fp_a = a.finish();

        let mut b = FingerprintBuilder::new();
        b.append_u64(7);
        b.append_biguint(&BigUint::from(42u32));
        let fp_b = b.finish();

        assert_eq!(fp_a.as_bytes(), fp_b.as_bytes());
    }

    #[test]
    fn differs_on_field_order() {
        let mut a = FingerprintBuilder::new();
        a.append_u64(1);
        a.append_u64(2);
        let fp_a = a.finish();

        let mut b = FingerprintBuilder::new();
        b.append_u64(2);
        b.append_u64(1);
        let fp_b = b.finish();

        assert_ne!(fp_a.as_bytes(), fp_b.as_bytes());
    }
}

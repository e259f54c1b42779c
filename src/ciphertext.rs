//! ElGamal ciphertexts (spec.md §4.3).

use num_bigint::BigUint;

use crate::error::PvResult;
use crate::fingerprint::{Fingerprint, FingerprintBuilder, FingerprintBytes};
use crate::wire::{self, Cursor};

const FILE_VERSION: u8 = 1;

/// An ordered sequence of ElGamal blocks `(gamma_i, delta_i)` together
/// with the bit-length `L` of the cleartext, so decryption can discard
/// the padding added to fill the final block.
///
/// Immutable except for the internal `append` used by `PublicKey::
/// encrypt_bytes` and by the shuffle operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    cryptosystem_fp: FingerprintBytes,
    bit_len: usize,
    blocks: Vec<(BigUint, BigUint)>,
}

impl Ciphertext {
    pub(crate) fn new(cryptosystem_fp: FingerprintBytes, bit_len: usize) -> Self {
        Self { cryptosystem_fp, bit_len, blocks: Vec::new() }
    }

    /// Construct a ciphertext directly from its blocks, e.g. when loading
    /// from the file format of spec.md §6.
    pub fn from_blocks(
        cryptosystem_fp: FingerprintBytes,
        bit_len: usize,
        blocks: Vec<(BigUint, BigUint)>,
    ) -> Self {
        Self { cryptosystem_fp, bit_len, blocks }
    }

    pub(crate) fn append(&mut self, gamma: BigUint, delta: BigUint) {
        self.blocks.push((gamma, delta));
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn blocks(&self) -> &[(BigUint, BigUint)] {
        &self.blocks
    }

    pub fn cryptosystem_fingerprint(&self) -> FingerprintBytes {
        self.cryptosystem_fp
    }

    /// Serialize to the ciphertext file format of spec.md §6:
    /// `(version, cryptosystem fp, bit-length L, m, [(gamma_i, delta_i)])`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, &self.cryptosystem_fp);
        wire::write_u64(&mut out, self.bit_len as u64);
        wire::write_u64(&mut out, self.blocks.len() as u64);
        for (gamma, delta) in &self.blocks {
            wire::write_biguint(&mut out, gamma);
            wire::write_biguint(&mut out, delta);
        }
        out
    }

    /// Parse the ciphertext file format produced by `to_bytes`. The caller
    /// is responsible for checking `cryptosystem_fingerprint()` against the
    /// cryptosystem it intends to use this ciphertext under.
    pub fn from_bytes(bytes: &[u8]) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let cryptosystem_fp = cursor.read_fingerprint()?;
        let bit_len = cursor.read_u64()? as usize;
        let block_count = cursor.read_u64()? as usize;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let gamma = cursor.read_biguint()?;
            let delta = cursor.read_biguint()?;
            blocks.push((gamma, delta));
        }
        cursor.finish()?;
        Ok(Self { cryptosystem_fp, bit_len, blocks })
    }

    pub fn get_fingerprint(&self) -> FingerprintBytes {
        Fingerprint::get_fingerprint(self)
    }
}

impl Fingerprint for Ciphertext {
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder) {
        builder.append_fingerprint(&self.cryptosystem_fp);
        builder.append_u64(self.bit_len as u64);
        for (gamma, delta) in &self.blocks {
            builder.append_biguint(gamma);
            builder.append_biguint(delta);
        }
    }
}

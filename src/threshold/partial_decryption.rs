//! Per-trustee partial decryption of a `Ciphertext` (spec.md §4.5).

use num_bigint::BigUint;
use rand::RngCore;

use crate::ciphertext::Ciphertext;
use crate::error::{PvError, PvResult};
use crate::fingerprint::FingerprintBytes;
use crate::group;
use crate::wire::{self, Cursor};

use super::chaum_pedersen::ChaumPedersenProof;
use super::keys::ThresholdPrivateKey;

const LOG_TARGET: &str = "votecrypto::threshold::partial_decryption";
const FILE_VERSION: u8 = 1;

/// One block's partial decryption value plus its correctness proof.
#[derive(Clone, Debug)]
pub struct PartialDecryptionBlock {
    pub d: BigUint,
    pub proof: ChaumPedersenProof,
}

/// A trustee's contribution toward decrypting a `Ciphertext`: one
/// `(d, proof)` pair per block.
#[derive(Clone, Debug)]
pub struct PartialDecryption {
    cryptosystem_fp: FingerprintBytes,
    trustee: u32,
    threshold_pub_fp: FingerprintBytes,
    ciphertext_fp: FingerprintBytes,
    blocks: Vec<PartialDecryptionBlock>,
}

impl PartialDecryption {
    pub fn cryptosystem_fingerprint(&self) -> FingerprintBytes {
        self.cryptosystem_fp
    }

    pub fn trustee(&self) -> u32 {
        self.trustee
    }

    pub fn threshold_pub_fingerprint(&self) -> FingerprintBytes {
        self.threshold_pub_fp
    }

    pub fn ciphertext_fingerprint(&self) -> FingerprintBytes {
        self.ciphertext_fp
    }

    pub fn blocks(&self) -> &[PartialDecryptionBlock] {
        &self.blocks
    }

    /// Mutable access to the per-block values, e.g. to re-serialize a
    /// decoded wire message in place.
    pub fn blocks_mut(&mut self) -> &mut [PartialDecryptionBlock] {
        &mut self.blocks
    }

    /// Serialize to the partial-decryption file format of spec.md §6:
    /// `(version, cryptosystem fp, threshold pub fp, ciphertext fp,
    /// trustee i, [(d_b, t1_b, t2_b, u_b)])`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, &self.cryptosystem_fp);
        wire::write_fingerprint(&mut out, &self.threshold_pub_fp);
        wire::write_fingerprint(&mut out, &self.ciphertext_fp);
        wire::write_u32(&mut out, self.trustee);
        wire::write_u32(&mut out, self.blocks.len() as u32);
        for block in &self.blocks {
            wire::write_biguint(&mut out, &block.d);
            wire::write_biguint(&mut out, &block.proof.t1);
            wire::write_biguint(&mut out, &block.proof.t2);
            wire::write_biguint(&mut out, &block.proof.u);
        }
        out
    }

    /// Parse the partial-decryption file format produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let cryptosystem_fp = cursor.read_fingerprint()?;
        let threshold_pub_fp = cursor.read_fingerprint()?;
        let ciphertext_fp = cursor.read_fingerprint()?;
        let trustee = cursor.read_u32()?;
        let block_count = cursor.read_u32()? as usize;
        let mut blocks = Vec::with_capacity(block_count);
        for _ in 0..block_count {
            let d = cursor.read_biguint()?;
            let t1 = cursor.read_biguint()?;
            let t2 = cursor.read_biguint()?;
            let u = cursor.read_biguint()?;
            blocks.push(PartialDecryptionBlock { d, proof: ChaumPedersenProof { t1, t2, u } });
        }
        cursor.finish()?;
        Ok(Self { cryptosystem_fp, trustee, threshold_pub_fp, ciphertext_fp, blocks })
    }
}

impl ThresholdPrivateKey {
    /// Compute `d_b = gamma_b^{s_i} mod p` for every block of `ct`, each
    /// with a Chaum-Pedersen proof that `d_b` was raised with the same
    /// exponent as the trustee's public share `Y_i`.
    pub fn generate_partial_decryption<R: RngCore>(
        &self,
        ct: &Ciphertext,
        rng: &mut R,
    ) -> PvResult<PartialDecryption> {
        if ct.cryptosystem_fingerprint().as_bytes() != self.public().cryptosystem_fingerprint().as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }

        let p = self.public().p();
        let q = self.public().q();
        let g = self.public().g();
        let y_i = self.public().y_i(self.index())?;

        let mut blocks = Vec::with_capacity(ct.len());
        for (gamma, _delta) in ct.blocks() {
            let d = group::pow_mod(gamma, self.share(), p);
            let proof = ChaumPedersenProof::prove(g, y_i, gamma, &d, self.share(), p, q, rng);
            blocks.push(PartialDecryptionBlock { d, proof });
        }

        tracing::debug!(
            target: LOG_TARGET,
            trustee = self.index(),
            blocks = blocks.len(),
            "generated partial decryption"
        );

        Ok(PartialDecryption {
            cryptosystem_fp: self.public().cryptosystem_fingerprint(),
            trustee: self.index(),
            threshold_pub_fp: self.public().get_fingerprint(),
            ciphertext_fp: ct.get_fingerprint(),
            blocks,
        })
    }
}

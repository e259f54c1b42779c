//! An ordered collection of ciphertexts under one threshold public key,
//! with re-encryption shuffling (spec.md §4.7).

use num_bigint::BigUint;
use rand::seq::SliceRandom;
use rand::RngCore;

use crate::ciphertext::Ciphertext;
use crate::error::{PvError, PvResult};
use crate::fingerprint::{Fingerprint, FingerprintBuilder, FingerprintBytes};
use crate::group;
use crate::shuffle::proof::ShufflingProof;
use crate::threshold::keys::ThresholdPublicKey;

const LOG_TARGET: &str = "votecrypto::collection";

/// Append-only ordered collection of `Ciphertext`s, all encrypted under
/// the same `ThresholdPublicKey`'s combined `Y`.
#[derive(Clone, Debug)]
pub struct CiphertextCollection {
    cryptosystem_fp: FingerprintBytes,
    threshold_pub_fp: FingerprintBytes,
    p: BigUint,
    q: BigUint,
    g: BigUint,
    y: BigUint,
    ciphertexts: Vec<Ciphertext>,
}

impl CiphertextCollection {
    pub fn new(threshold_public: &ThresholdPublicKey) -> Self {
        Self {
            cryptosystem_fp: threshold_public.cryptosystem_fingerprint(),
            threshold_pub_fp: threshold_public.get_fingerprint(),
            p: threshold_public.p().clone(),
            q: threshold_public.q().clone(),
            g: threshold_public.g().clone(),
            y: threshold_public.y().clone(),
            ciphertexts: Vec::new(),
        }
    }

    /// Reject ciphertexts bound to a different `Cryptosystem`, or whose
    /// block count does not match the rest of the collection. Whether a
    /// ciphertext was actually encrypted to this collection's `Y` cannot
    /// be checked without the matching private key; callers are
    /// responsible for that invariant.
    pub fn add_ciphertext(&mut self, ct: Ciphertext) -> PvResult<()> {
        if ct.cryptosystem_fingerprint().as_bytes() != self.cryptosystem_fp.as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }
        if let Some(first) = self.ciphertexts.first() {
            if first.len() != ct.len() {
                return Err(PvError::InvalidCiphertext("block count does not match collection"));
            }
        }
        self.ciphertexts.push(ct);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ciphertexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ciphertexts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ciphertext> {
        self.ciphertexts.iter()
    }

    pub fn ciphertexts(&self) -> &[Ciphertext] {
        &self.ciphertexts
    }

    pub fn threshold_pub_fingerprint(&self) -> FingerprintBytes {
        self.threshold_pub_fp
    }

    pub fn get_fingerprint(&self) -> FingerprintBytes {
        Fingerprint::get_fingerprint(self)
    }

    pub(crate) fn p(&self) -> &BigUint {
        &self.p
    }

    pub(crate) fn q(&self) -> &BigUint {
        &self.q
    }

    pub(crate) fn g(&self) -> &BigUint {
        &self.g
    }

    pub(crate) fn y(&self) -> &BigUint {
        &self.y
    }

    pub(crate) fn cryptosystem_fp(&self) -> FingerprintBytes {
        self.cryptosystem_fp
    }

    /// Build a collection directly from its parts, bypassing
    /// `add_ciphertext`'s incremental validation. Used by the shuffle
    /// proof to assemble intermediate and reconstructed collections that
    /// are already known to be well-formed.
    pub(crate) fn from_parts(
        cryptosystem_fp: FingerprintBytes,
        threshold_pub_fp: FingerprintBytes,
        p: BigUint,
        q: BigUint,
        g: BigUint,
        y: BigUint,
        ciphertexts: Vec<Ciphertext>,
    ) -> Self {
        Self { cryptosystem_fp, threshold_pub_fp, p, q, g, y, ciphertexts }
    }

    /// Sample a uniform random permutation and fresh re-randomizers, and
    /// produce the re-encrypted output collection together with a
    /// `ShufflingProof` attesting to its correctness.
    pub fn shuffle_with_proof<R: RngCore>(
        &self,
        rng: &mut R,
    ) -> PvResult<(CiphertextCollection, ShufflingProof)> {
        let n = self.ciphertexts.len();
        let block_count = self.ciphertexts.first().map(Ciphertext::len).unwrap_or(0);

        let mut permutation: Vec<usize> = (0..n).collect();
        permutation.shuffle(rng);

        let re_randomizers: Vec<Vec<BigUint>> = (0..n)
            .map(|_| (0..block_count).map(|_| group::random_scalar(&self.q, rng)).collect())
            .collect();

        let output = apply_shuffle(self, &permutation, &re_randomizers);

        tracing::info!(target: LOG_TARGET, n, "shuffled ciphertext collection");

        let proof = ShufflingProof::prove(self, &output, &permutation, &re_randomizers, rng)?;
        Ok((output, proof))
    }
}

impl Fingerprint for CiphertextCollection {
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder) {
        builder.append_fingerprint(&self.threshold_pub_fp);
        builder.append_u64(self.ciphertexts.len() as u64);
        for ct in &self.ciphertexts {
            builder.append_fingerprint(&ct.get_fingerprint());
        }
    }
}

/// `(gamma * g^r mod p, delta * y^r mod p)` — one block's re-encryption.
pub(crate) fn reencrypt_block(
    gamma: &BigUint,
    delta: &BigUint,
    r: &BigUint,
    g: &BigUint,
    y: &BigUint,
    p: &BigUint,
) -> (BigUint, BigUint) {
    let gamma_out = group::reduce(&(gamma * group::pow_mod(g, r, p)), p);
    let delta_out = group::reduce(&(delta * group::pow_mod(y, r, p)), p);
    (gamma_out, delta_out)
}

/// Apply `permutation` and `re_randomizers` to `input`, producing the
/// collection where `output[permutation[j]] = reenc(input[j], re_randomizers[j])`.
pub(crate) fn apply_shuffle(
    input: &CiphertextCollection,
    permutation: &[usize],
    re_randomizers: &[Vec<BigUint>],
) -> CiphertextCollection {
    let n = input.ciphertexts.len();
    let mut out_blocks: Vec<Option<Ciphertext>> = vec![None; n];

    for (j, &target) in permutation.iter().enumerate() {
        let source = &input.ciphertexts[j];
        let bit_len = source.bit_len();
        let mut ct = Ciphertext::new(input.cryptosystem_fp, bit_len);
        for (b, (gamma, delta)) in source.blocks().iter().enumerate() {
            let r = &re_randomizers[j][b];
            let (gamma_out, delta_out) = reencrypt_block(gamma, delta, r, &input.g, &input.y, &input.p);
            ct.append(gamma_out, delta_out);
        }
        out_blocks[target] = Some(ct);
    }

    CiphertextCollection {
        cryptosystem_fp: input.cryptosystem_fp,
        threshold_pub_fp: input.threshold_pub_fp,
        p: input.p.clone(),
        q: input.q.clone(),
        g: input.g.clone(),
        y: input.y.clone(),
        ciphertexts: out_blocks.into_iter().map(|c| c.expect("every slot filled by a permutation target")).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::small_cryptosystem;
    use crate::threshold::setup::ThresholdEncryptionSetUp;

    fn single_trustee_threshold(seed: u64) -> (crate::cryptosystem::Cryptosystem, crate::threshold::keys::ThresholdKeyPair) {
        let (cs, mut rng) = small_cryptosystem(seed);
        let kp = cs.new_key_pair(&mut rng);
        let mut setup = ThresholdEncryptionSetUp::new(cs.clone(), 0, 2, 2).unwrap();
        let kp2 = cs.new_key_pair(&mut rng);
        setup.add_trustee_public_key(0, kp.public.clone()).unwrap();
        setup.add_trustee_public_key(1, kp2.public.clone()).unwrap();
        let cm0 = setup.generate_commitment(&mut rng).unwrap();

        let mut setup2 = ThresholdEncryptionSetUp::new(cs.clone(), 1, 2, 2).unwrap();
        setup2.add_trustee_public_key(0, kp.public.clone()).unwrap();
        setup2.add_trustee_public_key(1, kp2.public.clone()).unwrap();
        let cm1 = setup2.generate_commitment(&mut rng).unwrap();

        setup.add_trustee_commitment(1, cm1).unwrap();
        setup2.add_trustee_commitment(0, cm0).unwrap();

        let threshold_kp = setup.generate_key_pair(0, &kp.private).unwrap();
        (cs, threshold_kp)
    }

    #[test]
    fn rejects_cryptosystem_mismatch() {
        let (cs1, tkp) = single_trustee_threshold(61);
        let (cs2, mut rng2) = small_cryptosystem(62);
        let other_kp = cs2.new_key_pair(&mut rng2);

        let mut collection = CiphertextCollection::new(&tkp.public);
        let foreign_ct = other_kp.public.encrypt_bytes(b"x", &mut rng2);
        let result = collection.add_ciphertext(foreign_ct);
        assert!(matches!(result, Err(PvError::IncompatibleCryptosystem)));
        let _ = cs1;
    }

    #[test]
    fn shuffle_preserves_multiset_and_block_counts() {
        use rand::SeedableRng;
        let (cs, tkp) = single_trustee_threshold(63);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(200);

        let pk = crate::keys::PublicKey::from_element(&cs, tkp.public.y().clone()).unwrap();
        let mut collection = CiphertextCollection::new(&tkp.public);
        for i in 0..5 {
            let ct = pk.encrypt_bytes(format!("Dummy vote #{i}").as_bytes(), &mut rng);
            collection.add_ciphertext(ct).unwrap();
        }

        let (shuffled, proof) = collection.shuffle_with_proof(&mut rng).unwrap();
        assert_eq!(shuffled.len(), collection.len());
        assert!(proof.verify(&collection, &shuffled).unwrap());
    }
}

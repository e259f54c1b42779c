//! Combines `k` accepted `PartialDecryption`s into plaintext via Lagrange
//! interpolation in the exponent (spec.md §4.6).

use std::collections::BTreeMap;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::Zero;

use crate::bitstream::BitStream;
use crate::ciphertext::Ciphertext;
use crate::error::{PvError, PvResult};
use crate::group;
use crate::threshold::keys::ThresholdPublicKey;
use crate::threshold::partial_decryption::PartialDecryption;

const LOG_TARGET: &str = "votecrypto::threshold::combinator";

pub struct ThresholdDecryptionCombinator {
    threshold_public: ThresholdPublicKey,
    ciphertext: Ciphertext,
    accepted: BTreeMap<u32, PartialDecryption>,
}

impl ThresholdDecryptionCombinator {
    pub fn new(threshold_public: ThresholdPublicKey, ciphertext: Ciphertext) -> Self {
        Self { threshold_public, ciphertext, accepted: BTreeMap::new() }
    }

    /// Verify every per-block proof of `pd` against `Y_i` and the
    /// ciphertext's `gamma`s, then accept it.
    pub fn add_partial_decryption(&mut self, pd: PartialDecryption) -> PvResult<()> {
        if pd.threshold_pub_fingerprint().as_bytes() != self.threshold_public.get_fingerprint().as_bytes() {
            return Err(PvError::ThresholdKeyMismatch);
        }
        if pd.ciphertext_fingerprint().as_bytes() != self.ciphertext.get_fingerprint().as_bytes() {
            return Err(PvError::ThresholdKeyMismatch);
        }
        if self.accepted.contains_key(&pd.trustee()) {
            return Err(PvError::DuplicatePartialDecryption(pd.trustee()));
        }
        if pd.blocks().len() != self.ciphertext.len() {
            return Err(PvError::InvalidPartialDecryptionProof { trustee: pd.trustee() });
        }

        let y_i = self.threshold_public.y_i(pd.trustee())?.clone();
        let g = self.threshold_public.g();
        let p = self.threshold_public.p();
        let q = self.threshold_public.q();

        for ((gamma, _delta), block) in self.ciphertext.blocks().iter().zip(pd.blocks()) {
            if !block.proof.verify(g, &y_i, gamma, &block.d, p, q) {
                return Err(PvError::InvalidPartialDecryptionProof { trustee: pd.trustee() });
            }
        }

        tracing::info!(target: LOG_TARGET, trustee = pd.trustee(), "accepted partial decryption");
        self.accepted.insert(pd.trustee(), pd);
        Ok(())
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted.len()
    }

    /// Combine the `k` smallest accepted trustee indices to recover the
    /// plaintext bytes.
    pub fn decrypt_to_bytes(&self) -> PvResult<Vec<u8>> {
        let k = self.threshold_public.k() as usize;
        if self.accepted.len() < k {
            return Err(PvError::NotEnoughShares { have: self.accepted.len(), k });
        }

        let subset: Vec<u32> = self.accepted.keys().take(k).copied().collect();
        let q = self.threshold_public.q();
        let p = self.threshold_public.p();

        let lambdas: Vec<BigUint> = subset.iter().map(|&i| lagrange_coefficient(i, &subset, q)).collect();

        let block_bits = (p.bits() - 1) as usize;
        let mut stream = BitStream::new();
        for (b_idx, (_gamma, delta)) in self.ciphertext.blocks().iter().enumerate() {
            let mut d = BigUint::from(1u8);
            for (i, lambda) in subset.iter().zip(&lambdas) {
                let pd = &self.accepted[i];
                let d_i = &pd.blocks()[b_idx].d;
                d = group::reduce(&(&d * group::pow_mod(d_i, lambda, p)), p);
            }
            let d_inv = group::inv_mod_prime(&d, p);
            let plus_one = group::reduce(&(delta * &d_inv), p);
            if plus_one.is_zero() {
                return Err(PvError::InvalidCiphertext("block decodes to value below zero"));
            }
            let b = plus_one - BigUint::from(1u8);
            stream.append(&BitStream::from_biguint(&b, block_bits));
        }

        if self.ciphertext.bit_len() > stream.len() {
            return Err(PvError::InvalidCiphertext("bit-length header exceeds payload"));
        }
        stream.truncate(self.ciphertext.bit_len());
        Ok(stream.to_bytes())
    }
}

/// `λ_i = Π_{j∈S, j≠i} (j+1) · ((j+1) − (i+1))^{-1} mod q`.
fn lagrange_coefficient(i: u32, subset: &[u32], q: &BigUint) -> BigUint {
    let q_signed = BigInt::from_biguint(Sign::Plus, q.clone());
    let xi = BigInt::from(i as i64 + 1);

    let mut num = BigInt::from(1);
    let mut den = BigInt::from(1);
    for &j in subset {
        if j == i {
            continue;
        }
        let xj = BigInt::from(j as i64 + 1);
        num *= &xj;
        den *= &xj - &xi;
    }

    let num_mod = num.mod_floor(&q_signed).to_biguint().expect("mod_floor is non-negative");
    let den_mod = den.mod_floor(&q_signed).to_biguint().expect("mod_floor is non-negative");
    let den_inv = group::inv_mod_prime(&den_mod, q);
    group::reduce(&(&num_mod * &den_inv), q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::small_cryptosystem;
    use crate::threshold::setup::ThresholdEncryptionSetUp;

    fn setup_threshold(
        n: u32,
        k: u32,
        seed: u64,
    ) -> (crate::cryptosystem::Cryptosystem, Vec<crate::threshold::keys::ThresholdKeyPair>) {
        let (cs, mut rng) = small_cryptosystem(seed);
        let trustee_keys: Vec<_> = (0..n).map(|_| cs.new_key_pair(&mut rng)).collect();
        let mut setups: Vec<_> = (0..n)
            .map(|i| ThresholdEncryptionSetUp::new(cs.clone(), i, n, k).unwrap())
            .collect();
        for setup in setups.iter_mut() {
            for (j, kp) in trustee_keys.iter().enumerate() {
                setup.add_trustee_public_key(j as u32, kp.public.clone()).unwrap();
            }
        }
        let commitments: Vec<_> =
            setups.iter_mut().map(|s| s.generate_commitment(&mut rng).unwrap()).collect();
        for setup in setups.iter_mut() {
            for cm in &commitments {
                setup.add_trustee_commitment(cm.dealer(), cm.clone()).unwrap();
            }
        }
        let key_pairs: Vec<_> = setups
            .iter_mut()
            .enumerate()
            .map(|(i, s)| s.generate_key_pair(i as u32, &trustee_keys[i].private).unwrap())
            .collect();
        (cs, key_pairs)
    }

    #[test]
    fn decrypts_with_exactly_k_of_n_shares() {
        use rand::SeedableRng;
        let (cs, key_pairs) = setup_threshold(3, 2, 51);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(99);

        let pk = crate::keys::PublicKey::from_element(&cs, key_pairs[0].public.y().clone()).unwrap();
        let message = b"Dummy vote #0";
        let ct = pk.encrypt_bytes(message, &mut rng);

        let mut combinator = ThresholdDecryptionCombinator::new(key_pairs[0].public.clone(), ct.clone());
        for kp in key_pairs.iter().take(2) {
            let pd = kp.private.generate_partial_decryption(&ct, &mut rng).unwrap();
            combinator.add_partial_decryption(pd).unwrap();
        }

        let recovered = combinator.decrypt_to_bytes().unwrap();
        assert_eq!(recovered, message);
    }

    #[test]
    fn fewer_than_k_shares_is_rejected() {
        use rand::SeedableRng;
        let (cs, key_pairs) = setup_threshold(3, 2, 52);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(100);

        let pk = crate::keys::PublicKey::from_element(&cs, key_pairs[0].public.y().clone()).unwrap();
        let ct = pk.encrypt_bytes(b"Dummy vote #1", &mut rng);

        let mut combinator = ThresholdDecryptionCombinator::new(key_pairs[0].public.clone(), ct.clone());
        let pd = key_pairs[0].private.generate_partial_decryption(&ct, &mut rng).unwrap();
        combinator.add_partial_decryption(pd).unwrap();

        let result = combinator.decrypt_to_bytes();
        assert!(matches!(result, Err(PvError::NotEnoughShares { .. })));
    }

    #[test]
    fn tampered_proof_is_rejected() {
        let (cs, key_pairs) = setup_threshold(3, 2, 53);
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(101);

        let pk = crate::keys::PublicKey::from_element(&cs, key_pairs[0].public.y().clone()).unwrap();
        let ct = pk.encrypt_bytes(b"Dummy vote #2", &mut rng);

        let mut combinator = ThresholdDecryptionCombinator::new(key_pairs[0].public.clone(), ct.clone());
        let mut pd = key_pairs[0].private.generate_partial_decryption(&ct, &mut rng).unwrap();
        let tampered_block = &mut pd.blocks_mut()[0];
        tampered_block.d = group::reduce(&(&tampered_block.d + BigUint::from(1u8)), cs.p());

        let result = combinator.add_partial_decryption(pd);
        assert!(matches!(result, Err(PvError::InvalidPartialDecryptionProof { .. })));
    }
}

//! Shared fixtures for the black-box integration suite.
//!
//! Exercising these scenarios against a freshly generated `nbits=1024`
//! safe prime would make the suite slow; the same fixed 64-bit test
//! prime used by the crate's own unit tests (`src/test_support.rs`) is
//! reused here so the suite stays fast and deterministic. Production
//! deployments go through `votecrypto::config::CryptosystemConfig`,
//! which defaults to `>= 1024` bits.

use std::str::FromStr;

use num_bigint::BigUint;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use votecrypto::keys::KeyPair;
use votecrypto::threshold::{
    ThresholdEncryptionCommitment, ThresholdEncryptionSetUp, ThresholdKeyPair,
};
use votecrypto::Cryptosystem;

const TEST_P: &str = "16589043530874512723";
const TEST_Q: &str = "8294521765437256361";
const TEST_G: &str = "4";

pub fn test_cryptosystem(seed: u64) -> (Cryptosystem, ChaCha20Rng) {
    let p = BigUint::from_str(TEST_P).unwrap();
    let q = BigUint::from_str(TEST_Q).unwrap();
    let g = BigUint::from_str(TEST_G).unwrap();
    let cs = Cryptosystem::from_parameters(64, p, q, g).expect("fixture parameters must verify");
    (cs, ChaCha20Rng::seed_from_u64(seed))
}

/// Run a full `n`-trustee, `k`-threshold distributed key generation and
/// return each trustee's registered public key, its sealed
/// `ThresholdEncryptionSetUp`'s final fingerprint, and its assembled
/// `ThresholdKeyPair`.
pub fn run_dkg(
    cs: &Cryptosystem,
    n: u32,
    k: u32,
    rng: &mut ChaCha20Rng,
) -> (Vec<KeyPair>, Vec<[u8; 32]>, Vec<ThresholdKeyPair>) {
    let trustee_keys: Vec<KeyPair> = (0..n).map(|_| cs.new_key_pair(rng)).collect();

    let mut setups: Vec<ThresholdEncryptionSetUp> =
        (0..n).map(|i| ThresholdEncryptionSetUp::new(cs.clone(), i, n, k).unwrap()).collect();

    for setup in setups.iter_mut() {
        for (j, kp) in trustee_keys.iter().enumerate() {
            setup.add_trustee_public_key(j as u32, kp.public.clone()).unwrap();
        }
    }

    let commitments: Vec<ThresholdEncryptionCommitment> =
        setups.iter_mut().map(|s| s.generate_commitment(rng).unwrap()).collect();

    for setup in setups.iter_mut() {
        for cm in &commitments {
            // Each dealer's own commitment is already registered by
            // `generate_commitment`; re-registering it is a harmless no-op
            // rejected as a duplicate.
            let _ = setup.add_trustee_commitment(cm.dealer(), cm.clone());
        }
    }

    let mut fingerprints = Vec::with_capacity(n as usize);
    let mut key_pairs = Vec::with_capacity(n as usize);
    for (i, setup) in setups.iter_mut().enumerate() {
        let fp = setup.get_fingerprint().unwrap();
        fingerprints.push(*fp.as_bytes());
        let kp = setup.generate_key_pair(i as u32, &trustee_keys[i].private).unwrap();
        key_pairs.push(kp);
    }

    (trustee_keys, fingerprints, key_pairs)
}

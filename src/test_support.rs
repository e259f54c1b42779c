//! Shared fixtures for unit and integration tests.
//!
//! Generating a fresh safe prime per test would make the suite slow and
//! non-deterministic; instead tests reuse a small precomputed safe-prime
//! cryptosystem (64 bits, well below `DEFAULT_MIN_NBITS`) and a seeded
//! RNG, mirroring the fixed `example_election_parameters()`-style
//! fixtures common to this kind of crate.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::cryptosystem::Cryptosystem;

/// A 64-bit test safe prime: `p = 2q + 1`, both prime, `g` a generator of
/// the order-`q` subgroup.
const TEST_P: &str = "16589043530874512723";
const TEST_Q: &str = "8294521765437256361";
const TEST_G: &str = "4";

/// Build the shared test cryptosystem and a seeded RNG for deterministic
/// test runs. `seed` only varies the RNG, not the parameters, so multiple
/// calls in one test module stay independent of each other.
pub fn small_cryptosystem(seed: u64) -> (Cryptosystem, ChaCha20Rng) {
    use num_bigint::BigUint;
    use std::str::FromStr;

    let p = BigUint::from_str(TEST_P).unwrap();
    let q = BigUint::from_str(TEST_Q).unwrap();
    let g = BigUint::from_str(TEST_G).unwrap();
    let cs = Cryptosystem::from_parameters(64, p, q, g).expect("fixture parameters must verify");
    (cs, ChaCha20Rng::seed_from_u64(seed))
}

//! Safe-prime cryptosystem parameters (spec.md §4.1).

use num_bigint::BigUint;
use num_traits::One;
use rand::RngCore;

use crate::error::{PvError, PvResult};
use crate::fingerprint::{Fingerprint, FingerprintBuilder, FingerprintBytes};
use crate::group::{self, MIN_MILLER_RABIN_ROUNDS};
use crate::wire::{self, Cursor};

const FILE_VERSION: u8 = 1;

const LOG_TARGET: &str = "votecrypto::cryptosystem";

/// Default minimum bit length accepted by `Cryptosystem::generate`.
pub const DEFAULT_MIN_NBITS: u64 = 1024;

/// Safe-prime group parameters `(p, q, g)` with `p = 2q + 1`, `g` a
/// generator of the order-`q` subgroup `G` of `Z*_p`.
///
/// Immutable once constructed. Every public element used under a
/// `Cryptosystem` is a member of `G`; keys and ciphertexts carry the
/// cryptosystem's fingerprint and are compared against it by equality,
/// not identity.
#[derive(Clone, Debug)]
pub struct Cryptosystem {
    nbits: u64,
    p: BigUint,
    q: BigUint,
    g: BigUint,
}

impl Cryptosystem {
    /// Generate fresh parameters of bit-length `nbits`, rejecting values
    /// below `min_nbits`.
    pub fn generate<R: RngCore>(nbits: u64, min_nbits: u64, rng: &mut R) -> PvResult<Self> {
        if nbits < min_nbits {
            return Err(PvError::WeakParameters("nbits below configured minimum"));
        }
        tracing::info!(target: LOG_TARGET, nbits, "generating cryptosystem parameters");
        let (p, q) = group::generate_safe_prime(nbits, MIN_MILLER_RABIN_ROUNDS, rng);
        let g = group::find_generator(&p, &q, rng);
        Ok(Self { nbits, p, q, g })
    }

    /// Reconstruct a `Cryptosystem` from parameters read off disk (the
    /// `.pvcryptosys` format of spec.md §6), performing full parameter
    /// verification.
    pub fn from_parameters(nbits: u64, p: BigUint, q: BigUint, g: BigUint) -> PvResult<Self> {
        Self::from_parameters_with_rounds(nbits, p, q, g, MIN_MILLER_RABIN_ROUNDS)
    }

    fn from_parameters_with_rounds(
        nbits: u64,
        p: BigUint,
        q: BigUint,
        g: BigUint,
        rounds: u32,
    ) -> PvResult<Self> {
        let mut rng = rand::thread_rng();

        if &((&q << 1u32) + BigUint::one()) != &p {
            return Err(PvError::WeakParameters("p != 2q + 1"));
        }
        if !group::is_probable_prime(&p, rounds, &mut rng) {
            return Err(PvError::WeakParameters("p is not prime"));
        }
        if !group::is_probable_prime(&q, rounds, &mut rng) {
            return Err(PvError::WeakParameters("q is not prime"));
        }
        if g == BigUint::one() {
            return Err(PvError::WeakParameters("g must not be 1"));
        }
        if !group::is_group_member(&g, &p, &q) {
            return Err(PvError::WeakParameters("g is not in the order-q subgroup"));
        }

        tracing::debug!(target: LOG_TARGET, nbits, "loaded and verified cryptosystem parameters");
        Ok(Self { nbits, p, q, g })
    }

    /// Serialize to the `.pvcryptosys` byte layout: version tag, then
    /// `nbits`, `p`, `q`, `g` each length-prefixed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_u64(&mut out, self.nbits);
        wire::write_biguint(&mut out, &self.p);
        wire::write_biguint(&mut out, &self.q);
        wire::write_biguint(&mut out, &self.g);
        out
    }

    /// Parse and verify the `.pvcryptosys` byte layout produced by
    /// `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let nbits = cursor.read_u64()?;
        let p = cursor.read_biguint()?;
        let q = cursor.read_biguint()?;
        let g = cursor.read_biguint()?;
        cursor.finish()?;

        Self::from_parameters(nbits, p, q, g)
    }

    pub fn nbits(&self) -> u64 {
        self.nbits
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Sample a fresh keypair: `x` uniform in `[1, q-1]`, `h = g^x mod p`.
    pub fn new_key_pair<R: RngCore>(&self, rng: &mut R) -> crate::keys::KeyPair {
        crate::keys::KeyPair::generate(self, rng)
    }

    /// `true` iff `h` is a valid public element under this cryptosystem.
    pub fn is_group_member(&self, h: &BigUint) -> bool {
        group::is_group_member(h, &self.p, &self.q)
    }

    pub fn modpow(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        group::pow_mod(base, exp, &self.p)
    }

    pub fn get_fingerprint(&self) -> FingerprintBytes {
        Fingerprint::get_fingerprint(self)
    }
}

impl Fingerprint for Cryptosystem {
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder) {
        builder.append_u64(self.nbits);
        builder.append_biguint(&self.p);
        builder.append_biguint(&self.q);
        builder.append_biguint(&self.g);
    }
}

impl PartialEq for Cryptosystem {
    fn eq(&self, other: &Self) -> bool {
        self.get_fingerprint().as_bytes() == other.get_fingerprint().as_bytes()
    }
}

impl Eq for Cryptosystem {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn test_cryptosystem() -> Cryptosystem {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        Cryptosystem::generate(64, 64, &mut rng).expect("generation should succeed")
    }

    #[test]
    fn generate_rejects_small_nbits() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let result = Cryptosystem::generate(512, DEFAULT_MIN_NBITS, &mut rng);
        assert!(matches!(result, Err(PvError::WeakParameters(_))));
    }

    #[test]
    fn round_trips_through_bytes() {
        let cs = test_cryptosystem();
        let bytes = cs.to_bytes();
        let loaded = Cryptosystem::from_bytes(&bytes).expect("load should succeed");
        assert_eq!(cs, loaded);
        assert_eq!(cs.get_fingerprint().as_bytes(), loaded.get_fingerprint().as_bytes());
    }

    #[test]
    fn tampered_generator_is_rejected() {
        let cs = test_cryptosystem();
        let bad_g = cs.g() + BigUint::one();
        let result = Cryptosystem::from_parameters(cs.nbits(), cs.p().clone(), cs.q().clone(), bad_g);
        assert!(result.is_err());
    }

    #[test]
    fn fingerprint_is_deterministic_across_instances() {
        let cs = test_cryptosystem();
        let reloaded =
            Cryptosystem::from_parameters(cs.nbits(), cs.p().clone(), cs.q().clone(), cs.g().clone())
                .unwrap();
        assert_eq!(cs.get_fingerprint().as_bytes(), reloaded.get_fingerprint().as_bytes());
    }
}

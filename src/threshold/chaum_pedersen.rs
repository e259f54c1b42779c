//! Chaum-Pedersen proof of equality of discrete logs over `Z*_p`
//! (spec.md §4.5), used to attest that a trustee's partial decryption
//! `d = gamma^{s_i}` used the same exponent as its public share `Y_i =
//! g^{s_i}`.

use num_bigint::BigUint;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::group;

const LOG_TARGET: &str = "votecrypto::threshold::chaum_pedersen";

/// Proof that `log_g(Y_i) == log_gamma(d)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChaumPedersenProof {
    pub t1: BigUint,
    pub t2: BigUint,
    pub u: BigUint,
}

impl ChaumPedersenProof {
    /// `g`, `y_i = g^{secret}`, `gamma`, `d = gamma^{secret}`.
    pub fn prove<R: RngCore>(
        g: &BigUint,
        y_i: &BigUint,
        gamma: &BigUint,
        d: &BigUint,
        secret: &BigUint,
        p: &BigUint,
        q: &BigUint,
        rng: &mut R,
    ) -> Self {
        let w = group::random_scalar(q, rng);
        let t1 = group::pow_mod(g, &w, p);
        let t2 = group::pow_mod(gamma, &w, p);

        let c = challenge(g, y_i, gamma, d, &t1, &t2, q);
        let u = group::reduce(&(&w + &c * secret), q);

        tracing::debug!(target: LOG_TARGET, "generated partial-decryption proof");
        Self { t1, t2, u }
    }

    /// Verify `g^u == t1 * y_i^c` and `gamma^u == t2 * d^c`.
    pub fn verify(
        &self,
        g: &BigUint,
        y_i: &BigUint,
        gamma: &BigUint,
        d: &BigUint,
        p: &BigUint,
        q: &BigUint,
    ) -> bool {
        let c = challenge(g, y_i, gamma, d, &self.t1, &self.t2, q);

        let lhs1 = group::pow_mod(g, &self.u, p);
        let rhs1 = group::reduce(&(&self.t1 * group::pow_mod(y_i, &c, p)), p);

        let lhs2 = group::pow_mod(gamma, &self.u, p);
        let rhs2 = group::reduce(&(&self.t2 * group::pow_mod(d, &c, p)), p);

        let ok = lhs1 == rhs1 && lhs2 == rhs2;
        tracing::debug!(target: LOG_TARGET, ok, "verified partial-decryption proof");
        ok
    }
}

/// `c = H(g, Y_i, gamma, d, t1, t2) mod q`, `H` = SHA-256 over fixed-width
/// big-endian encodings of the operands (spec.md §4.5).
fn challenge(
    g: &BigUint,
    y_i: &BigUint,
    gamma: &BigUint,
    d: &BigUint,
    t1: &BigUint,
    t2: &BigUint,
    q: &BigUint,
) -> BigUint {
    let mut hasher = Sha256::new();
    for field in [g, y_i, gamma, d, t1, t2] {
        let bytes = field.to_bytes_be();
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(&bytes);
    }
    let digest = hasher.finalize();
    group::reduce(&BigUint::from_bytes_be(&digest), q)
}

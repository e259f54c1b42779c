//! The `Z*_p` safe-prime group substrate.
//!
//! Every cryptographic element in this crate lives in the order-`q`
//! subgroup `G` of `Z*_p`, where `p = 2q + 1` is a safe prime. This module
//! wraps `num-bigint`'s `BigUint` with the reduction discipline the rest
//! of the crate relies on (elements always reduced mod `p` or mod `q`,
//! never left partially reduced) and the primality testing used to
//! validate cryptosystem parameters.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;

const LOG_TARGET: &str = "votecrypto::group";

/// Number of Miller-Rabin rounds used when validating or generating
/// cryptosystem parameters. spec.md requires at least 64.
pub const MIN_MILLER_RABIN_ROUNDS: u32 = 64;

/// Miller-Rabin probabilistic primality test.
///
/// `rounds` independent witnesses are drawn from a cryptographically
/// secure RNG; each round has false-positive probability at most `1/4`,
/// so `rounds = 64` gives soundness around `2^-128`.
pub fn is_probable_prime<R: RngCore>(n: &BigUint, rounds: u32, rng: &mut R) -> bool {
    if n.is_zero() || *n == BigUint::one() {
        return false;
    }
    let two = BigUint::from(2u8);
    if *n == two {
        return true;
    }
    if n.is_even() {
        return false;
    }

    // n - 1 = 2^s * d with d odd.
    let n_minus_one = n - BigUint::one();
    let mut d = n_minus_one.clone();
    let mut s: u64 = 0;
    while d.is_even() {
        d >>= 1u32;
        s += 1;
    }

    'witness: for _ in 0..rounds {
        // a in [2, n-2]
        let a = rng.gen_biguint_range(&two, &(n - &two));
        let mut x = a.modpow(&d, n);
        if x == BigUint::one() || x == n_minus_one {
            continue 'witness;
        }
        for _ in 0..s.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        tracing::trace!(target: LOG_TARGET, "composite witness found");
        return false;
    }
    true
}

/// Sample a uniformly random prime of exactly `bits` bits.
fn random_prime<R: RngCore>(bits: u64, rounds: u32, rng: &mut R) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        // Force the top bit (exact bit length) and the low bit (odd).
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if is_probable_prime(&candidate, rounds, rng) {
            return candidate;
        }
    }
}

/// Generate a fresh safe prime `p = 2q + 1` of exactly `bits` bits, along
/// with `q`.
///
/// This is the dominant cost of `Cryptosystem::generate`: safe primes are
/// rare, so many candidate `q`s are tried.
pub fn generate_safe_prime<R: RngCore>(bits: u64, rounds: u32, rng: &mut R) -> (BigUint, BigUint) {
    loop {
        let q = random_prime(bits - 1, rounds, rng);
        let p = (&q << 1u32) + BigUint::one();
        if is_probable_prime(&p, rounds, rng) {
            tracing::debug!(target: LOG_TARGET, bits, "generated safe prime");
            return (p, q);
        }
    }
}

/// Find a generator of the order-`q` subgroup of `Z*_p`.
///
/// For a safe prime `p = 2q + 1`, `Z*_p` has order `2q`, and for any `h`
/// with `1 < h < p-1`, `g = h^2 mod p` generates the order-`q` subgroup
/// unless `h^2 == 1`, which happens only for `h in {1, p-1}`.
pub fn find_generator<R: RngCore>(p: &BigUint, q: &BigUint, rng: &mut R) -> BigUint {
    let two = BigUint::from(2u8);
    let one = BigUint::one();
    loop {
        let h = rng.gen_biguint_range(&two, &(p - &two));
        let g = h.modpow(&two, p);
        if g != one {
            debug_assert_eq!(g.modpow(q, p), one, "h^2 must have order dividing q");
            return g;
        }
    }
}

/// Reduce `x` modulo `m`, assuming `m > 0`.
pub fn reduce(x: &BigUint, m: &BigUint) -> BigUint {
    x.mod_floor(m)
}

/// Modular exponentiation `base^exp mod modulus`.
pub fn pow_mod(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Modular inverse of `x` modulo prime `m`, via Fermat's little theorem
/// (`x^(m-2) mod m`). `x` must not be `0 mod m`.
pub fn inv_mod_prime(x: &BigUint, m: &BigUint) -> BigUint {
    let m_minus_two = m - BigUint::from(2u8);
    x.modpow(&m_minus_two, m)
}

/// Sample a uniform scalar in `[1, q-1]`.
pub fn random_scalar<R: RngCore>(q: &BigUint, rng: &mut R) -> BigUint {
    rng.gen_biguint_range(&BigUint::one(), q)
}

/// `true` iff `h` is a member of the order-`q` subgroup of `Z*_p`:
/// `1 <= h < p` and `h^q mod p == 1`.
pub fn is_group_member(h: &BigUint, p: &BigUint, q: &BigUint) -> bool {
    if h.is_zero() || h >= p {
        return false;
    }
    h.modpow(q, p) == BigUint::one()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(42)
    }

    #[test]
    fn small_primes_are_detected() {
        let mut rng = rng();
        for p in [2u32, 3, 5, 7, 11, 13, 101, 7919] {
            assert!(is_probable_prime(&BigUint::from(p), 32, &mut rng), "{p} should be prime");
        }
        for n in [1u32, 4, 6, 8, 9, 10, 100, 7920] {
            assert!(!is_probable_prime(&BigUint::from(n), 32, &mut rng), "{n} should be composite");
        }
    }

    #[test]
    fn generated_safe_prime_satisfies_invariant() {
        let mut rng = rng();
        let (p, q) = generate_safe_prime(64, 32, &mut rng);
        assert_eq!(&p, &((&q << 1u32) + BigUint::one()));
        assert!(is_probable_prime(&p, 64, &mut rng));
        assert!(is_probable_prime(&q, 64, &mut rng));
    }

    #[test]
    fn generator_has_order_q() {
        let mut rng = rng();
        let (p, q) = generate_safe_prime(64, 32, &mut rng);
        let g = find_generator(&p, &q, &mut rng);
        assert_ne!(g, BigUint::one());
        assert_eq!(g.modpow(&q, &p), BigUint::one());
        assert!(is_group_member(&g, &p, &q));
    }

    #[test]
    fn inv_mod_prime_round_trips() {
        let mut rng = rng();
        let (p, q) = generate_safe_prime(64, 32, &mut rng);
        let g = find_generator(&p, &q, &mut rng);
        let x = random_scalar(&q, &mut rng);
        let gx = pow_mod(&g, &x, &p);
        let inv = inv_mod_prime(&gx, &p);
        assert_eq!(reduce(&(&gx * &inv), &p), BigUint::one());
    }
}

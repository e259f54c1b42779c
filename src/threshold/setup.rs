//! Distributed key generation for threshold ElGamal (spec.md §4.4).
//!
//! Each trustee runs its own `ThresholdEncryptionSetUp` instance: register
//! every trustee's `PublicKey`, produce a `ThresholdEncryptionCommitment`
//! carrying a Pedersen-style verifiable secret share for every other
//! trustee, collect the other `n-1` commitments out of band, then derive
//! the shared `ThresholdPublicKey` and this trustee's own
//! `ThresholdPrivateKey` share.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;

use crate::ciphertext::Ciphertext;
use crate::cryptosystem::Cryptosystem;
use crate::error::{PvError, PvResult};
use crate::fingerprint::{Fingerprint, FingerprintBuilder, FingerprintBytes};
use crate::group;
use crate::keys::PublicKey;
use crate::wire::{self, Cursor};

use super::keys::{ThresholdKeyPair, ThresholdPrivateKey, ThresholdPublicKey};

const LOG_TARGET: &str = "votecrypto::threshold::setup";
const FILE_VERSION: u8 = 1;

/// A dealer's public coefficients and per-recipient encrypted shares.
///
/// `shares[i]` is `None` exactly at `i == dealer` — the "self" slot is a
/// distinguished empty placeholder (spec.md §6); every other slot holds
/// the degree-`k-1` polynomial evaluated at `i+1`, ElGamal-encrypted
/// under trustee `i`'s `PublicKey`.
#[derive(Clone, Debug)]
pub struct ThresholdEncryptionCommitment {
    dealer: u32,
    coefficients: Vec<BigUint>,
    shares: Vec<Option<Ciphertext>>,
}

impl ThresholdEncryptionCommitment {
    pub fn dealer(&self) -> u32 {
        self.dealer
    }

    pub fn coefficients(&self) -> &[BigUint] {
        &self.coefficients
    }

    pub fn share_for(&self, recipient: u32) -> Option<&Ciphertext> {
        self.shares.get(recipient as usize).and_then(|s| s.as_ref())
    }

    /// `Π_t coefficients[t]^{x^t mod q} mod p`, i.e. `g^{f(x)} mod p`
    /// without knowing `f`'s coefficients in the clear — the public
    /// verification value used both for `Y_i` and for the per-recipient
    /// VSS check.
    fn evaluate_in_exponent(&self, x: u32, p: &BigUint, q: &BigUint) -> BigUint {
        let mut acc = BigUint::from(1u8);
        for (t, a_t) in self.coefficients.iter().enumerate() {
            let exponent = BigUint::from(x as u64).modpow(&BigUint::from(t as u64), q);
            acc = group::reduce(&(&acc * group::pow_mod(a_t, &exponent, p)), p);
        }
        acc
    }

    /// Serialize to the threshold-commitment file format of spec.md §6:
    /// `(version, cryptosystem fp, n, k, dealer, [A_t], [shares])`. The
    /// cryptosystem fingerprint and `(n, k)` are not stored on the struct
    /// itself, so the caller supplies them as context.
    pub fn to_bytes(&self, cryptosystem_fp: &FingerprintBytes, n: u32, k: u32) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, cryptosystem_fp);
        wire::write_u32(&mut out, n);
        wire::write_u32(&mut out, k);
        wire::write_u32(&mut out, self.dealer);
        wire::write_u32(&mut out, self.coefficients.len() as u32);
        for a_t in &self.coefficients {
            wire::write_biguint(&mut out, a_t);
        }
        wire::write_u32(&mut out, self.shares.len() as u32);
        for share in &self.shares {
            match share {
                None => out.push(0),
                Some(ct) => {
                    out.push(1);
                    wire::write_bytes(&mut out, &ct.to_bytes());
                }
            }
        }
        out
    }

    /// Parse a threshold-commitment file, returning the embedded
    /// `(cryptosystem fp, n, k)` context alongside the commitment.
    pub fn from_bytes(bytes: &[u8]) -> PvResult<(FingerprintBytes, u32, u32, Self)> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let cryptosystem_fp = cursor.read_fingerprint()?;
        let n = cursor.read_u32()?;
        let k = cursor.read_u32()?;
        let dealer = cursor.read_u32()?;

        let coeff_count = cursor.read_u32()? as usize;
        let mut coefficients = Vec::with_capacity(coeff_count);
        for _ in 0..coeff_count {
            coefficients.push(cursor.read_biguint()?);
        }

        let share_count = cursor.read_u32()? as usize;
        let mut shares = Vec::with_capacity(share_count);
        for _ in 0..share_count {
            let tag = cursor.read_u8()?;
            let share = match tag {
                0 => None,
                1 => {
                    let ct_bytes = cursor.read_bytes()?;
                    Some(Ciphertext::from_bytes(&ct_bytes)?)
                }
                other => return Err(PvError::Serialization(format!("unknown share tag {other}"))),
            };
            shares.push(share);
        }
        cursor.finish()?;

        Ok((cryptosystem_fp, n, k, Self { dealer, coefficients, shares }))
    }
}

impl Fingerprint for ThresholdEncryptionCommitment {
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder) {
        builder.append_u32(self.dealer);
        for a_t in &self.coefficients {
            builder.append_biguint(a_t);
        }
        for share in &self.shares {
            match share {
                None => builder.append_u64(0),
                Some(ct) => {
                    builder.append_u64(1);
                    builder.append_fingerprint(&ct.get_fingerprint());
                }
            }
        }
    }
}

/// Distributed key generation builder for one trustee.
///
/// Accepts registrations until an output (`generate_public_key` or
/// `generate_key_pair`) is requested, at which point it seals
/// (`PvError::SetupSealed`) against further `add_trustee_*` calls.
/// `generate_commitment` does not seal: the other trustees' commitments
/// are expected to arrive only after this trustee has published its own.
pub struct ThresholdEncryptionSetUp {
    cryptosystem: Cryptosystem,
    own_index: u32,
    n: u32,
    k: u32,
    trustee_public_keys: Vec<Option<PublicKey>>,
    commitments: Vec<Option<ThresholdEncryptionCommitment>>,
    own_coefficients: Option<Vec<BigUint>>,
    sealed: bool,
}

impl ThresholdEncryptionSetUp {
    pub fn new(cryptosystem: Cryptosystem, own_index: u32, n: u32, k: u32) -> PvResult<Self> {
        if !(2..=n).contains(&k) {
            return Err(PvError::WeakParameters("threshold k must satisfy 2 <= k <= n"));
        }
        if own_index >= n {
            return Err(PvError::InvalidTrusteeIndex(own_index));
        }
        Ok(Self {
            cryptosystem,
            own_index,
            n,
            k,
            trustee_public_keys: vec![None; n as usize],
            commitments: vec![None; n as usize],
            own_coefficients: None,
            sealed: false,
        })
    }

    fn check_open(&self) -> PvResult<()> {
        if self.sealed {
            return Err(PvError::SetupSealed);
        }
        Ok(())
    }

    fn check_index(&self, i: u32) -> PvResult<()> {
        if i >= self.n {
            return Err(PvError::InvalidTrusteeIndex(i));
        }
        Ok(())
    }

    pub fn add_trustee_public_key(&mut self, i: u32, pk: PublicKey) -> PvResult<()> {
        self.check_open()?;
        self.check_index(i)?;
        if pk.cryptosystem_fingerprint().as_bytes() != self.cryptosystem.get_fingerprint().as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }
        let slot = &mut self.trustee_public_keys[i as usize];
        if slot.is_some() {
            return Err(PvError::DuplicateRegistration("trustee public key"));
        }
        *slot = Some(pk);
        Ok(())
    }

    pub fn add_trustee_commitment(&mut self, i: u32, cm: ThresholdEncryptionCommitment) -> PvResult<()> {
        self.check_open()?;
        self.check_index(i)?;
        if cm.dealer != i {
            return Err(PvError::InvalidTrusteeIndex(i));
        }
        let slot = &mut self.commitments[i as usize];
        if slot.is_some() {
            return Err(PvError::DuplicateRegistration("trustee commitment"));
        }
        *slot = Some(cm);
        Ok(())
    }

    fn missing_public_keys(&self) -> usize {
        self.trustee_public_keys.iter().filter(|s| s.is_none()).count()
    }

    fn missing_commitments(&self) -> usize {
        self.commitments.iter().filter(|s| s.is_none()).count()
    }

    /// Sample this trustee's degree-`k-1` polynomial and produce the
    /// public commitment plus per-recipient encrypted shares.
    pub fn generate_commitment<R: RngCore>(
        &mut self,
        rng: &mut R,
    ) -> PvResult<ThresholdEncryptionCommitment> {
        let missing = self.missing_public_keys();
        if missing > 0 {
            return Err(PvError::IncompleteSetup { missing, n: self.n as usize });
        }

        let q = self.cryptosystem.q();
        let mut coefficients = Vec::with_capacity(self.k as usize);
        loop {
            let a0 = group::random_scalar(q, rng);
            if !a0.is_zero() {
                coefficients.push(a0);
                break;
            }
        }
        for _ in 1..self.k {
            coefficients.push(group::random_scalar(q, rng));
        }

        let public_coefficients: Vec<BigUint> = coefficients
            .iter()
            .map(|a_t| self.cryptosystem.modpow(self.cryptosystem.g(), a_t))
            .collect();

        let mut shares = Vec::with_capacity(self.n as usize);
        for recipient in 0..self.n {
            if recipient == self.own_index {
                shares.push(None);
                continue;
            }
            let s = evaluate_polynomial(&coefficients, recipient + 1, q);
            let recipient_pk = self.trustee_public_keys[recipient as usize]
                .as_ref()
                .expect("all public keys registered above");
            let share_bytes = fixed_width_bytes(&s, q);
            shares.push(Some(recipient_pk.encrypt_bytes(&share_bytes, rng)));
        }

        tracing::info!(target: LOG_TARGET, dealer = self.own_index, "generated threshold commitment");

        let commitment = ThresholdEncryptionCommitment {
            dealer: self.own_index,
            coefficients: public_coefficients,
            shares,
        };
        self.own_coefficients = Some(coefficients);
        self.commitments[self.own_index as usize] = Some(commitment.clone());
        Ok(commitment)
    }

    fn all_commitments(&self) -> PvResult<Vec<&ThresholdEncryptionCommitment>> {
        let missing = self.missing_commitments();
        if missing > 0 {
            return Err(PvError::IncompleteSetup { missing, n: self.n as usize });
        }
        Ok(self.commitments.iter().map(|c| c.as_ref().unwrap()).collect())
    }

    /// Combine every trustee's public coefficients into the shared
    /// `ThresholdPublicKey`. Seals the instance.
    pub fn generate_public_key(&mut self) -> PvResult<ThresholdPublicKey> {
        let commitments = self.all_commitments()?;
        let p = self.cryptosystem.p();
        let q = self.cryptosystem.q();

        let y = commitments.iter().try_fold(BigUint::from(1u8), |acc, cm| {
            let a0 = cm.coefficients.first().ok_or(PvError::WeakParameters("commitment has no coefficients"))?;
            Ok::<_, PvError>(group::reduce(&(&acc * a0), p))
        })?;

        let mut y_i = Vec::with_capacity(self.n as usize);
        for i in 0..self.n {
            let mut acc = BigUint::from(1u8);
            for cm in &commitments {
                acc = group::reduce(&(&acc * cm.evaluate_in_exponent(i + 1, p, q)), p);
            }
            y_i.push(acc);
        }

        self.sealed = true;
        tracing::info!(target: LOG_TARGET, n = self.n, k = self.k, "threshold public key generated");
        ThresholdPublicKey::new(&self.cryptosystem, self.n, self.k, y, y_i)
    }

    /// Decrypt and verify every other dealer's share, combine with this
    /// trustee's own contribution, and produce the full `ThresholdKeyPair`.
    /// Seals the instance.
    pub fn generate_key_pair(
        &mut self,
        i: u32,
        own_private_key: &crate::keys::PrivateKey,
    ) -> PvResult<ThresholdKeyPair> {
        self.check_index(i)?;
        if i != self.own_index {
            return Err(PvError::InvalidTrusteeIndex(i));
        }
        let registered = self.trustee_public_keys[i as usize]
            .as_ref()
            .ok_or(PvError::IncompleteSetup { missing: 1, n: self.n as usize })?;
        if own_private_key.public_key().h() != registered.h() {
            return Err(PvError::InvalidPublicKey);
        }
        let own_coefficients = self
            .own_coefficients
            .clone()
            .ok_or(PvError::SetupNotReady("generate_commitment has not been called yet"))?;

        let p = self.cryptosystem.p().clone();
        let q = self.cryptosystem.q().clone();
        let commitments = self.all_commitments()?;

        let mut share = BigUint::from(0u8);
        for cm in &commitments {
            let dealer = cm.dealer;
            let contribution = if dealer == i {
                evaluate_polynomial(&own_coefficients, i + 1, &q)
            } else {
                let encrypted = cm.share_for(i).ok_or(PvError::InvalidCommitment { dealer })?;
                let bytes = own_private_key
                    .decrypt_to_bytes(encrypted)
                    .map_err(|_| PvError::InvalidCommitment { dealer })?;
                let s_ji = BigUint::from_bytes_be(&bytes);

                let lhs = self.cryptosystem.modpow(self.cryptosystem.g(), &s_ji);
                let rhs = cm.evaluate_in_exponent(i + 1, &p, &q);
                if lhs != rhs {
                    tracing::warn!(target: LOG_TARGET, dealer, "verifiable secret sharing check failed");
                    return Err(PvError::InvalidCommitment { dealer });
                }
                s_ji
            };
            share = group::reduce(&(&share + &contribution), &q);
        }

        let public = self.generate_public_key()?;
        let private = ThresholdPrivateKey::new(i, share, public.clone());
        tracing::info!(target: LOG_TARGET, trustee = i, "threshold key pair assembled");
        Ok(ThresholdKeyPair { public, private })
    }

    /// SHA-256 over `(C.fingerprint, n, k, [commitments sorted by trustee
    /// index])`. Defined only once every commitment has been registered.
    pub fn get_fingerprint(&self) -> PvResult<FingerprintBytes> {
        let commitments = self.all_commitments()?;
        let mut builder = FingerprintBuilder::new();
        builder.append_fingerprint(&self.cryptosystem.get_fingerprint());
        builder.append_u32(self.n);
        builder.append_u32(self.k);
        for cm in commitments {
            builder.append_fingerprint(&cm.get_fingerprint());
        }
        Ok(builder.finish())
    }
}

/// `f(x) mod q` for `f(X) = Σ coefficients[t] * X^t`, via Horner's method.
fn evaluate_polynomial(coefficients: &[BigUint], x: u32, q: &BigUint) -> BigUint {
    let x = BigUint::from(x as u64);
    let mut acc = BigUint::from(0u8);
    for a_t in coefficients.iter().rev() {
        acc = group::reduce(&(&acc * &x + a_t), q);
    }
    acc
}

/// Render `value` as exactly `ceil(q.bits() / 8)` big-endian bytes, the
/// fixed width every share is encrypted at so recipients can recover it
/// unambiguously regardless of leading zero bytes.
fn fixed_width_bytes(value: &BigUint, q: &BigUint) -> Vec<u8> {
    let width = q.bits().div_ceil(8) as usize;
    let mut bytes = value.to_bytes_be();
    if bytes.len() < width {
        let mut padded = vec![0u8; width - bytes.len()];
        padded.append(&mut bytes);
        padded
    } else {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::small_cryptosystem;

    fn build_trustees(n: u32, seed: u64) -> (Cryptosystem, Vec<crate::keys::KeyPair>) {
        let (cs, mut rng) = small_cryptosystem(seed);
        let keys = (0..n).map(|_| cs.new_key_pair(&mut rng)).collect();
        (cs, keys)
    }

    #[test]
    fn threshold_setup_round_trip_n3_k2() {
        let n = 3u32;
        let k = 2u32;
        let (cs, mut rng) = small_cryptosystem(31);
        let (_, trustee_keys) = build_trustees(n, 31);

        let mut setups: Vec<ThresholdEncryptionSetUp> = (0..n)
            .map(|i| ThresholdEncryptionSetUp::new(cs.clone(), i, n, k).unwrap())
            .collect();

        for setup in setups.iter_mut() {
            for (j, kp) in trustee_keys.iter().enumerate() {
                setup.add_trustee_public_key(j as u32, kp.public.clone()).unwrap();
            }
        }

        let commitments: Vec<ThresholdEncryptionCommitment> =
            setups.iter_mut().map(|s| s.generate_commitment(&mut rng).unwrap()).collect();

        for setup in setups.iter_mut() {
            for cm in &commitments {
                let _ = setup.add_trustee_commitment(cm.dealer(), cm.clone());
            }
        }

        let mut fingerprints = Vec::new();
        let mut key_pairs = Vec::new();
        for (i, setup) in setups.iter_mut().enumerate() {
            fingerprints.push(setup.get_fingerprint().unwrap());
            let kp = setup.generate_key_pair(i as u32, &trustee_keys[i].private).unwrap();
            key_pairs.push(kp);
        }

        for fp in &fingerprints[1..] {
            assert_eq!(fp.as_bytes(), fingerprints[0].as_bytes());
        }
        for kp in &key_pairs[1..] {
            assert_eq!(kp.public.y(), key_pairs[0].public.y());
        }
    }

    #[test]
    fn commitment_round_trips_through_bytes() {
        let n = 3u32;
        let k = 2u32;
        let (cs, mut rng) = small_cryptosystem(41);
        let (_, trustee_keys) = build_trustees(n, 41);

        let mut setup = ThresholdEncryptionSetUp::new(cs.clone(), 0, n, k).unwrap();
        for (j, kp) in trustee_keys.iter().enumerate() {
            setup.add_trustee_public_key(j as u32, kp.public.clone()).unwrap();
        }
        let commitment = setup.generate_commitment(&mut rng).unwrap();

        let cryptosystem_fp = cs.get_fingerprint();
        let bytes = commitment.to_bytes(&cryptosystem_fp, n, k);
        let (loaded_fp, loaded_n, loaded_k, loaded) =
            ThresholdEncryptionCommitment::from_bytes(&bytes).expect("load should succeed");

        assert_eq!(loaded_fp.as_bytes(), cryptosystem_fp.as_bytes());
        assert_eq!(loaded_n, n);
        assert_eq!(loaded_k, k);
        assert_eq!(loaded.get_fingerprint().as_bytes(), commitment.get_fingerprint().as_bytes());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (cs, _) = small_cryptosystem(32);
        let (_, trustee_keys) = build_trustees(3, 32);
        let mut setup = ThresholdEncryptionSetUp::new(cs, 0, 3, 2).unwrap();
        setup.add_trustee_public_key(1, trustee_keys[1].public.clone()).unwrap();
        let result = setup.add_trustee_public_key(1, trustee_keys[1].public.clone());
        assert!(matches!(result, Err(PvError::DuplicateRegistration(_))));
    }
}

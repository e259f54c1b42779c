//! Crate-wide error taxonomy.
//!
//! Cryptographic validation failures are never recovered inside the core:
//! a single failure here means fraud, corruption, or a caller bug, and it
//! must propagate. Builder/state-machine misuse (double registration, use
//! of a sealed setup) is reported separately from proof/verification
//! failures so callers can tell "you asked for something incoherent" apart
//! from "something failed to verify."

use thiserror::Error;

/// The crate's single error type.
#[derive(Error, Debug)]
pub enum PvError {
    /// A key, ciphertext, or commitment was used against a `Cryptosystem`
    /// other than the one it was bound to.
    #[error("object is bound to a different cryptosystem")]
    IncompatibleCryptosystem,

    /// A loaded public key element is not a member of the order-`q`
    /// subgroup.
    #[error("public key element is not in the prime-order subgroup")]
    InvalidPublicKey,

    /// A ciphertext's block count, bit-length header, or padding is
    /// inconsistent.
    #[error("ciphertext is malformed: {0}")]
    InvalidCiphertext(&'static str),

    /// `get_fingerprint()` or an output was requested from a
    /// `ThresholdEncryptionSetUp` before all `n` commitments were
    /// registered.
    #[error("threshold setup is missing {missing} of {n} trustee commitments")]
    IncompleteSetup { missing: usize, n: usize },

    /// A mutating call was made against a `ThresholdEncryptionSetUp` after
    /// it had already produced an output.
    #[error("threshold setup is sealed and accepts no further registrations")]
    SetupSealed,

    /// A trustee index was registered twice (public key, commitment, or
    /// partial decryption), or an out-of-range index was supplied.
    #[error("invalid trustee index {0}")]
    InvalidTrusteeIndex(u32),

    /// `add_trustee_public_key` or `add_trustee_commitment` was called
    /// twice for the same trustee index.
    #[error("{0} already registered for this trustee index")]
    DuplicateRegistration(&'static str),

    /// An output was requested from a `ThresholdEncryptionSetUp` before a
    /// prerequisite step (e.g. `generate_commitment`) had run.
    #[error("threshold setup is not ready: {0}")]
    SetupNotReady(&'static str),

    /// A `PartialDecryption` was submitted against a `ThresholdDecryptionCombinator`
    /// built for a different `ThresholdPublicKey` or `Ciphertext`.
    #[error("partial decryption does not match this combinator's threshold key or ciphertext")]
    ThresholdKeyMismatch,

    /// `add_partial_decryption` was called twice for the same trustee.
    #[error("partial decryption from trustee {0} already accepted")]
    DuplicatePartialDecryption(u32),

    /// Verifiable-secret-sharing check failed for the share sent by
    /// trustee `dealer`.
    #[error("commitment from trustee {dealer} failed the verifiable secret sharing check")]
    InvalidCommitment { dealer: u32 },

    /// A `PartialDecryption`'s Chaum-Pedersen proof did not verify against
    /// the claimed trustee's public share.
    #[error("partial decryption proof from trustee {trustee} failed to verify")]
    InvalidPartialDecryptionProof { trustee: u32 },

    /// `decrypt_to_bytes` was attempted with fewer than `k` accepted
    /// partial decryptions.
    #[error("need {k} partial decryptions to decrypt, have {have}")]
    NotEnoughShares { have: usize, k: usize },

    /// A `ShufflingProof` failed verification: wrong sizes, a Fiat-Shamir
    /// hash mismatch, or a per-challenge-bit check failure.
    #[error("shuffle proof is invalid: {0}")]
    InvalidShuffleProof(&'static str),

    /// A file or wire format could not be parsed into the expected
    /// structure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Cryptosystem parameters were rejected as too small or otherwise
    /// insecure for use.
    #[error("parameters are too weak: {0}")]
    WeakParameters(&'static str),

    /// The configured random source was exhausted or reported an error;
    /// the core never falls back to a weaker source.
    #[error("random source exhausted or failed: {0}")]
    InsufficientRandomness(String),
}

pub type PvResult<T> = Result<T, PvError>;

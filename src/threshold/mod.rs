//! Threshold ElGamal: distributed key generation, partial decryption,
//! and Lagrange combination (spec.md §4.4-4.6).

pub mod chaum_pedersen;
pub mod combinator;
pub mod keys;
pub mod partial_decryption;
pub mod setup;

pub use chaum_pedersen::ChaumPedersenProof;
pub use combinator::ThresholdDecryptionCombinator;
pub use keys::{ThresholdKeyPair, ThresholdPrivateKey, ThresholdPublicKey};
pub use partial_decryption::{PartialDecryption, PartialDecryptionBlock};
pub use setup::{ThresholdEncryptionCommitment, ThresholdEncryptionSetUp};

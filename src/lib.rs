pub mod bitstream;
pub mod ciphertext;
pub mod collection;
pub mod config;
pub mod cryptosystem;
pub mod error;
pub mod fingerprint;
pub mod group;
pub mod keys;
pub mod shuffle;
pub mod threshold;
pub(crate) mod wire;

#[cfg(test)]
pub(crate) mod test_support;

pub use ciphertext::Ciphertext;
pub use collection::CiphertextCollection;
pub use cryptosystem::Cryptosystem;
pub use error::{PvError, PvResult};
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use shuffle::ShufflingProof;
pub use threshold::{
    ChaumPedersenProof, PartialDecryption, ThresholdDecryptionCombinator, ThresholdEncryptionCommitment,
    ThresholdEncryptionSetUp, ThresholdKeyPair, ThresholdPrivateKey, ThresholdPublicKey,
};

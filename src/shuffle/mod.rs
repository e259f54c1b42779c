//! Zero-knowledge proof of a correct re-encryption shuffle (spec.md §4.8).

pub mod proof;

pub use proof::{ShuffleResponse, ShufflingProof};

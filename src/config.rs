//! Ambient configuration: cryptosystem sizing defaults and the tracing
//! subscriber setup shared by the demo binary and integration tests.

use anyhow::Result;
use tracing_subscriber::{fmt::time::Uptime, EnvFilter};

use crate::cryptosystem::DEFAULT_MIN_NBITS;
use crate::group::MIN_MILLER_RABIN_ROUNDS;

/// Parameters governing how a fresh `Cryptosystem` is generated or
/// accepted from disk.
#[derive(Clone, Copy, Debug)]
pub struct CryptosystemConfig {
    pub min_nbits: u64,
    pub miller_rabin_rounds: u32,
}

impl Default for CryptosystemConfig {
    fn default() -> Self {
        Self { min_nbits: DEFAULT_MIN_NBITS, miller_rabin_rounds: MIN_MILLER_RABIN_ROUNDS }
    }
}

/// Initialize the global `tracing` subscriber from `RUST_LOG`, falling
/// back to a sensible per-module default. Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_tracing(json: bool) -> Result<()> {
    let default_filter = "election_demo=info,votecrypto=info";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_timer(Uptime::default());

    // `try_init` errors if a subscriber is already installed (e.g. under
    // `cargo test`); that's not a failure condition for this crate.
    if json {
        let _ = subscriber.with_ansi(false).json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
    Ok(())
}

//! End-to-end demo: trustees run distributed key generation, ballots are
//! encrypted and shuffled, and a quorum of trustees jointly decrypts the
//! shuffled tally.

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use votecrypto::collection::CiphertextCollection;
use votecrypto::config::{init_tracing, CryptosystemConfig};
use votecrypto::cryptosystem::Cryptosystem;
use votecrypto::keys::PublicKey;
use votecrypto::threshold::{ThresholdDecryptionCombinator, ThresholdEncryptionSetUp};

const LOG_TARGET: &str = "bin::election_demo";

#[derive(Debug, Parser)]
#[command(name = "election_demo")]
#[command(about = "Run a threshold ElGamal election end to end", long_about = None)]
struct Args {
    /// Number of trustees.
    #[arg(long, default_value_t = 3)]
    trustees: u32,

    /// Decryption threshold; must satisfy 2 <= k <= trustees.
    #[arg(long, default_value_t = 2)]
    threshold: u32,

    /// Number of ballots to encrypt and shuffle.
    #[arg(long, default_value_t = 20)]
    ballots: usize,

    /// Bit-length of the cryptosystem's safe prime. Kept small for a
    /// demo that runs in under a second; production deployments use
    /// `CryptosystemConfig::default()` (>= 1024 bits).
    #[arg(long, default_value_t = 256)]
    nbits: u64,

    /// Seed the demo RNG for reproducible runs.
    #[arg(long)]
    rng_seed: Option<u64>,

    /// Toggle structured (JSON) tracing output.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json)?;

    if !(2..=args.trustees).contains(&args.threshold) {
        bail!("--threshold must satisfy 2 <= threshold <= trustees");
    }

    let mut rng = match args.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(target: LOG_TARGET, nbits = args.nbits, "generating cryptosystem parameters");
    let config = CryptosystemConfig { min_nbits: args.nbits, ..CryptosystemConfig::default() };
    let cryptosystem = Cryptosystem::generate(args.nbits, config.min_nbits, &mut rng)
        .context("failed to generate cryptosystem parameters")?;

    info!(target: LOG_TARGET, n = args.trustees, k = args.threshold, "running distributed key generation");
    let trustee_keys: Vec<_> = (0..args.trustees).map(|_| cryptosystem.new_key_pair(&mut rng)).collect();

    let mut setups: Vec<ThresholdEncryptionSetUp> = (0..args.trustees)
        .map(|i| ThresholdEncryptionSetUp::new(cryptosystem.clone(), i, args.trustees, args.threshold))
        .collect::<Result<_, _>>()
        .context("failed to initialize trustee setups")?;

    for setup in setups.iter_mut() {
        for (j, kp) in trustee_keys.iter().enumerate() {
            setup.add_trustee_public_key(j as u32, kp.public.clone())?;
        }
    }

    let commitments: Vec<_> = setups
        .iter_mut()
        .map(|s| s.generate_commitment(&mut rng))
        .collect::<Result<_, _>>()
        .context("failed to generate trustee commitments")?;

    for setup in setups.iter_mut() {
        for cm in &commitments {
            setup.add_trustee_commitment(cm.dealer(), cm.clone())?;
        }
    }

    let key_pairs: Vec<_> = setups
        .iter_mut()
        .enumerate()
        .map(|(i, s)| s.generate_key_pair(i as u32, &trustee_keys[i].private))
        .collect::<Result<_, _>>()
        .context("failed to assemble threshold key pairs")?;

    let threshold_public = key_pairs[0].public.clone();
    info!(
        target: LOG_TARGET,
        fingerprint = %threshold_public.get_fingerprint(),
        "threshold public key established"
    );

    let voting_key = PublicKey::from_element(&cryptosystem, threshold_public.y().clone())
        .context("threshold public key is not a valid group element")?;

    info!(target: LOG_TARGET, ballots = args.ballots, "encrypting ballots");
    let mut collection = CiphertextCollection::new(&threshold_public);
    for i in 0..args.ballots {
        let ballot = format!("Dummy vote #{i}");
        collection.add_ciphertext(voting_key.encrypt_text(&ballot, &mut rng))?;
    }

    info!(target: LOG_TARGET, "shuffling ballots");
    let (shuffled, proof) = collection.shuffle_with_proof(&mut rng)?;
    let shuffle_ok = proof.verify(&collection, &shuffled)?;
    if !shuffle_ok {
        bail!("shuffle proof failed to verify");
    }
    info!(target: LOG_TARGET, "shuffle proof verified");

    info!(target: LOG_TARGET, k = args.threshold, "collecting partial decryptions");
    let mut tally = Vec::new();
    for ct in shuffled.iter() {
        let mut combinator = ThresholdDecryptionCombinator::new(threshold_public.clone(), ct.clone());
        for kp in key_pairs.iter().take(args.threshold as usize) {
            let pd = kp.private.generate_partial_decryption(ct, &mut rng)?;
            combinator.add_partial_decryption(pd)?;
        }
        let bytes = combinator.decrypt_to_bytes()?;
        tally.push(String::from_utf8_lossy(&bytes).into_owned());
    }

    tally.sort();
    for ballot in &tally {
        println!("{ballot}");
    }
    info!(target: LOG_TARGET, recovered = tally.len(), "election tally complete");

    Ok(())
}

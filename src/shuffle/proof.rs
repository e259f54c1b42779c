//! Sako-Kilian cut-and-choose shuffle proof, instantiated at `t = 128`
//! challenge bits for roughly `2^-128` soundness (spec.md §4.8).

use num_bigint::BigUint;
use rand::seq::SliceRandom;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::bitstream::BitStream;
use crate::ciphertext::Ciphertext;
use crate::collection::{apply_shuffle, reencrypt_block, CiphertextCollection};
use crate::error::{PvError, PvResult};
use crate::fingerprint::FingerprintBytes;
use crate::group;
use crate::wire::{self, Cursor};

const LOG_TARGET: &str = "votecrypto::shuffle::proof";
const FILE_VERSION: u8 = 1;

/// Number of cut-and-choose challenge bits. Soundness error is `2^-T`.
pub const CHALLENGE_BITS: usize = 128;

/// The prover's response for one challenge bit `ℓ`.
#[derive(Clone, Debug)]
pub enum ShuffleResponse {
    /// `c_ℓ = 0`: reveal the permutation and re-randomizers that turned
    /// the input collection into `M_ℓ`.
    Opened { permutation: Vec<usize>, re_randomizers: Vec<Vec<BigUint>> },
    /// `c_ℓ = 1`: reveal the permutation and re-randomizers that turn
    /// `M_ℓ` into the output collection.
    Linked { permutation: Vec<usize>, re_randomizers: Vec<Vec<BigUint>> },
}

/// Non-interactive zero-knowledge proof that `output` is a re-encryption
/// shuffle of `input`.
#[derive(Clone, Debug)]
pub struct ShufflingProof {
    input_fp: FingerprintBytes,
    output_fp: FingerprintBytes,
    y: BigUint,
    m_fingerprints: Vec<FingerprintBytes>,
    responses: Vec<ShuffleResponse>,
}

impl ShufflingProof {
    /// Build the proof. `permutation` and `re_randomizers` are the
    /// witness that produced `output` from `input`:
    /// `output[permutation[j]] = reenc(input[j], re_randomizers[j])`.
    pub fn prove<R: RngCore>(
        input: &CiphertextCollection,
        output: &CiphertextCollection,
        permutation: &[usize],
        re_randomizers: &[Vec<BigUint>],
        rng: &mut R,
    ) -> PvResult<Self> {
        let n = input.len();
        let block_count = input.ciphertexts().first().map(Ciphertext::len).unwrap_or(0);

        let mut sigmas = Vec::with_capacity(CHALLENGE_BITS);
        let mut rhos = Vec::with_capacity(CHALLENGE_BITS);
        let mut m_fingerprints = Vec::with_capacity(CHALLENGE_BITS);

        for _ in 0..CHALLENGE_BITS {
            let mut sigma: Vec<usize> = (0..n).collect();
            sigma.shuffle(rng);
            let rho: Vec<Vec<BigUint>> = (0..n)
                .map(|_| (0..block_count).map(|_| group::random_scalar(input.q(), rng)).collect())
                .collect();

            let m = apply_shuffle(input, &sigma, &rho);
            m_fingerprints.push(m.get_fingerprint());
            sigmas.push(sigma);
            rhos.push(rho);
        }

        let input_fp = input.get_fingerprint();
        let output_fp = output.get_fingerprint();
        let challenge = challenge_bits(&input_fp, &output_fp, input.y(), &m_fingerprints);

        let mut responses = Vec::with_capacity(CHALLENGE_BITS);
        for ell in 0..CHALLENGE_BITS {
            if !challenge[ell] {
                responses.push(ShuffleResponse::Opened {
                    permutation: sigmas[ell].clone(),
                    re_randomizers: rhos[ell].clone(),
                });
            } else {
                let sigma_inv = invert_permutation(&sigmas[ell]);
                let q = input.q();
                let tau: Vec<usize> = (0..n).map(|i| permutation[sigma_inv[i]]).collect();
                let rho_prime: Vec<Vec<BigUint>> = (0..n)
                    .map(|i| {
                        let j = sigma_inv[i];
                        (0..block_count)
                            .map(|b| {
                                group::reduce(
                                    &(&re_randomizers[j][b] + q - &rhos[ell][j][b]),
                                    q,
                                )
                            })
                            .collect()
                    })
                    .collect();
                responses.push(ShuffleResponse::Linked { permutation: tau, re_randomizers: rho_prime });
            }
        }

        tracing::info!(target: LOG_TARGET, n, bits = CHALLENGE_BITS, "built shuffle proof");

        Ok(Self { input_fp, output_fp, y: input.y().clone(), m_fingerprints, responses })
    }

    /// Verify the proof against the claimed `input` and `output`
    /// collections.
    pub fn verify(&self, input: &CiphertextCollection, output: &CiphertextCollection) -> PvResult<bool> {
        if self.input_fp.as_bytes() != input.get_fingerprint().as_bytes() {
            return Err(PvError::InvalidShuffleProof("input fingerprint mismatch"));
        }
        if self.output_fp.as_bytes() != output.get_fingerprint().as_bytes() {
            return Err(PvError::InvalidShuffleProof("output fingerprint mismatch"));
        }
        if &self.y != input.y() || &self.y != output.y() {
            return Err(PvError::InvalidShuffleProof("Y mismatch"));
        }
        if self.m_fingerprints.len() != CHALLENGE_BITS || self.responses.len() != CHALLENGE_BITS {
            return Err(PvError::InvalidShuffleProof("wrong challenge length"));
        }

        let challenge = challenge_bits(&self.input_fp, &self.output_fp, &self.y, &self.m_fingerprints);

        for ell in 0..CHALLENGE_BITS {
            let ok = match (&self.responses[ell], challenge[ell]) {
                (ShuffleResponse::Opened { permutation, re_randomizers }, false) => {
                    let candidate = apply_shuffle(input, permutation, re_randomizers);
                    candidate.get_fingerprint().as_bytes() == self.m_fingerprints[ell].as_bytes()
                }
                (ShuffleResponse::Linked { permutation, re_randomizers }, true) => {
                    let candidate = reconstruct_from_output(output, permutation, re_randomizers);
                    candidate.get_fingerprint().as_bytes() == self.m_fingerprints[ell].as_bytes()
                }
                _ => false,
            };
            if !ok {
                tracing::warn!(target: LOG_TARGET, bit = ell, "shuffle proof check failed");
                return Ok(false);
            }
        }

        tracing::info!(target: LOG_TARGET, "shuffle proof verified");
        Ok(true)
    }

    /// Serialize to the shuffling-proof file format of spec.md §6:
    /// `(version, input fp, output fp, Y, [M_ℓ.fp], [branch data per ℓ])`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, &self.input_fp);
        wire::write_fingerprint(&mut out, &self.output_fp);
        wire::write_biguint(&mut out, &self.y);

        wire::write_u32(&mut out, self.m_fingerprints.len() as u32);
        for fp in &self.m_fingerprints {
            wire::write_fingerprint(&mut out, fp);
        }

        wire::write_u32(&mut out, self.responses.len() as u32);
        for response in &self.responses {
            let (tag, permutation, re_randomizers) = match response {
                ShuffleResponse::Opened { permutation, re_randomizers } => (0u8, permutation, re_randomizers),
                ShuffleResponse::Linked { permutation, re_randomizers } => (1u8, permutation, re_randomizers),
            };
            out.push(tag);
            wire::write_u32(&mut out, permutation.len() as u32);
            for &dest in permutation {
                wire::write_u32(&mut out, dest as u32);
            }
            wire::write_u32(&mut out, re_randomizers.len() as u32);
            for row in re_randomizers {
                wire::write_u32(&mut out, row.len() as u32);
                for value in row {
                    wire::write_biguint(&mut out, value);
                }
            }
        }
        out
    }

    /// Parse the shuffling-proof file format produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let input_fp = cursor.read_fingerprint()?;
        let output_fp = cursor.read_fingerprint()?;
        let y = cursor.read_biguint()?;

        let m_count = cursor.read_u32()? as usize;
        let mut m_fingerprints = Vec::with_capacity(m_count);
        for _ in 0..m_count {
            m_fingerprints.push(cursor.read_fingerprint()?);
        }

        let response_count = cursor.read_u32()? as usize;
        let mut responses = Vec::with_capacity(response_count);
        for _ in 0..response_count {
            let tag = cursor.read_u8()?;
            let perm_len = cursor.read_u32()? as usize;
            let mut permutation = Vec::with_capacity(perm_len);
            for _ in 0..perm_len {
                permutation.push(cursor.read_u32()? as usize);
            }
            let row_count = cursor.read_u32()? as usize;
            let mut re_randomizers = Vec::with_capacity(row_count);
            for _ in 0..row_count {
                let col_count = cursor.read_u32()? as usize;
                let mut row = Vec::with_capacity(col_count);
                for _ in 0..col_count {
                    row.push(cursor.read_biguint()?);
                }
                re_randomizers.push(row);
            }
            responses.push(match tag {
                0 => ShuffleResponse::Opened { permutation, re_randomizers },
                1 => ShuffleResponse::Linked { permutation, re_randomizers },
                other => return Err(PvError::Serialization(format!("unknown shuffle branch tag {other}"))),
            });
        }
        cursor.finish()?;

        Ok(Self { input_fp, output_fp, y, m_fingerprints, responses })
    }
}

/// `tau[i]` names the output index that `M_ℓ[i]` re-encrypts to, with
/// re-randomizer `re_randomizers[i]`; recover `M_ℓ` by applying the
/// negated re-randomizer to the matching output ciphertext.
fn reconstruct_from_output(
    output: &CiphertextCollection,
    tau: &[usize],
    re_randomizers: &[Vec<BigUint>],
) -> CiphertextCollection {
    let q = output.q();
    let p = output.p();
    let g = output.g();
    let y = output.y();

    let mut ciphertexts = Vec::with_capacity(tau.len());
    for (i, &k) in tau.iter().enumerate() {
        let source = &output.ciphertexts()[k];
        let mut ct = Ciphertext::new(output.cryptosystem_fp(), source.bit_len());
        for (b, (gamma, delta)) in source.blocks().iter().enumerate() {
            let r = &re_randomizers[i][b];
            let neg_r = if r == &BigUint::from(0u8) { r.clone() } else { group::reduce(&(q - r), q) };
            let (gamma_out, delta_out) = reencrypt_block(gamma, delta, &neg_r, g, y, p);
            ct.append(gamma_out, delta_out);
        }
        ciphertexts.push(ct);
    }

    CiphertextCollection::from_parts(
        output.cryptosystem_fp(),
        output.threshold_pub_fingerprint(),
        p.clone(),
        q.clone(),
        g.clone(),
        y.clone(),
        ciphertexts,
    )
}

fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0usize; perm.len()];
    for (j, &dest) in perm.iter().enumerate() {
        inv[dest] = j;
    }
    inv
}

fn challenge_bits(
    input_fp: &FingerprintBytes,
    output_fp: &FingerprintBytes,
    y: &BigUint,
    m_fingerprints: &[FingerprintBytes],
) -> Vec<bool> {
    let mut hasher = Sha256::new();
    hasher.update(input_fp.as_bytes());
    hasher.update(output_fp.as_bytes());
    let y_bytes = y.to_bytes_be();
    hasher.update((y_bytes.len() as u64).to_be_bytes());
    hasher.update(&y_bytes);
    for fp in m_fingerprints {
        hasher.update(fp.as_bytes());
    }
    let digest = hasher.finalize();
    let stream = BitStream::from_bytes(&digest);
    stream.read_bits(0, CHALLENGE_BITS)
}

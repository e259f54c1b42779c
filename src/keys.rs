//! Single-recipient ElGamal keys (spec.md §4.2).

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;

use crate::bitstream::BitStream;
use crate::ciphertext::Ciphertext;
use crate::cryptosystem::Cryptosystem;
use crate::error::{PvError, PvResult};
use crate::fingerprint::{Fingerprint, FingerprintBuilder, FingerprintBytes};
use crate::group;
use crate::wire::{self, Cursor};

const LOG_TARGET: &str = "votecrypto::keys";
const FILE_VERSION: u8 = 1;

/// An ElGamal public key `h = g^x mod p` bound to a `Cryptosystem`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    cryptosystem_fp: FingerprintBytes,
    p: BigUint,
    q: BigUint,
    g: BigUint,
    h: BigUint,
}

/// An ElGamal private key `x in [1, q-1]`, carrying its matching
/// `PublicKey`.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    x: BigUint,
    public_key: PublicKey,
}

/// A freshly generated `(PublicKey, PrivateKey)` pair.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl PublicKey {
    /// Construct a `PublicKey` from a group element already known to be
    /// valid under `cryptosystem` (e.g. recovered from a combination of
    /// per-trustee contributions).
    pub fn from_element(cryptosystem: &Cryptosystem, h: BigUint) -> PvResult<Self> {
        if !cryptosystem.is_group_member(&h) {
            return Err(PvError::InvalidPublicKey);
        }
        Ok(Self {
            cryptosystem_fp: cryptosystem.get_fingerprint(),
            p: cryptosystem.p().clone(),
            q: cryptosystem.q().clone(),
            g: cryptosystem.g().clone(),
            h,
        })
    }

    pub fn h(&self) -> &BigUint {
        &self.h
    }

    pub fn cryptosystem_fingerprint(&self) -> FingerprintBytes {
        self.cryptosystem_fp
    }

    fn check_cryptosystem(&self, other_fp: FingerprintBytes) -> PvResult<()> {
        if self.cryptosystem_fp.as_bytes() != other_fp.as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }
        Ok(())
    }

    /// Encrypt an arbitrary byte message as a sequence of ElGamal blocks.
    ///
    /// The message is packed into a `BitStream`, split into blocks of
    /// `nbits - 1` bits, and each block `b` is mapped to `(g^r, h^r *
    /// (b+1))`; the `+1` keeps the encoded value inside `G` whenever `b in
    /// [0, q-1]`. The total bit-length `L` is recorded so decryption can
    /// discard the padding added to fill the last block.
    pub fn encrypt_bytes<R: RngCore>(&self, bytes: &[u8], rng: &mut R) -> Ciphertext {
        let block_bits = (self.p.bits() - 1) as usize;
        let mut stream = BitStream::from_bytes(bytes);
        let bit_len = stream.len();
        stream.pad_to_multiple_of(block_bits.max(1));

        let block_count = if block_bits == 0 { 0 } else { stream.len() / block_bits };
        tracing::debug!(
            target: LOG_TARGET,
            bit_len,
            block_count,
            "encrypting message"
        );

        let mut ciphertext = Ciphertext::new(self.cryptosystem_fp, bit_len);
        for i in 0..block_count {
            let bits = stream.read_bits(i * block_bits, block_bits);
            let block_stream = BitStream::from_bits_msb(&bits);
            let b = block_stream.to_biguint();

            let r = group::random_scalar(&self.q, rng);
            let gamma = group::pow_mod(&self.g, &r, &self.p);
            let hr = group::pow_mod(&self.h, &r, &self.p);
            let delta = group::reduce(&(&hr * (&b + BigUint::one())), &self.p);

            ciphertext.append(gamma, delta);
        }
        ciphertext
    }

    /// Convenience wrapper encrypting UTF-8 text.
    pub fn encrypt_text<R: RngCore>(&self, text: &str, rng: &mut R) -> Ciphertext {
        self.encrypt_bytes(text.as_bytes(), rng)
    }

    /// Serialize to the public-key file format of spec.md §6:
    /// `(version, cryptosystem fp, h)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, &self.cryptosystem_fp);
        wire::write_biguint(&mut out, &self.h);
        out
    }

    /// Parse a public-key file against the `cryptosystem` it claims to be
    /// bound to, rejecting a fingerprint mismatch or an `h` outside `G`.
    pub fn from_bytes(bytes: &[u8], cryptosystem: &Cryptosystem) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let cryptosystem_fp = cursor.read_fingerprint()?;
        let h = cursor.read_biguint()?;
        cursor.finish()?;

        if cryptosystem_fp.as_bytes() != cryptosystem.get_fingerprint().as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }
        Self::from_element(cryptosystem, h)
    }

    pub fn get_fingerprint(&self) -> FingerprintBytes {
        Fingerprint::get_fingerprint(self)
    }
}

impl Fingerprint for PublicKey {
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder) {
        builder.append_fingerprint(&self.cryptosystem_fp);
        builder.append_biguint(&self.h);
    }
}

impl PrivateKey {
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn x(&self) -> &BigUint {
        &self.x
    }

    /// Decrypt a `Ciphertext` produced by the matching `PublicKey`.
    pub fn decrypt_to_bytes(&self, ct: &Ciphertext) -> PvResult<Vec<u8>> {
        self.public_key
            .check_cryptosystem(ct.cryptosystem_fingerprint())?;

        let p = &self.public_key.p;
        let block_bits = (p.bits() - 1) as usize;
        tracing::debug!(target: LOG_TARGET, blocks = ct.len(), "decrypting ciphertext");

        let mut stream = BitStream::new();
        for (gamma, delta) in ct.blocks() {
            let s = group::pow_mod(gamma, &self.x, p);
            let s_inv = group::inv_mod_prime(&s, p);
            let plus_one = group::reduce(&(delta * &s_inv), p);
            if plus_one.is_zero() {
                return Err(PvError::InvalidCiphertext("block decodes to value below zero"));
            }
            let b = plus_one - BigUint::one();
            stream.append(&BitStream::from_biguint(&b, block_bits));
        }

        if ct.bit_len() > stream.len() {
            return Err(PvError::InvalidCiphertext("bit-length header exceeds payload"));
        }
        stream.truncate(ct.bit_len());
        Ok(stream.to_bytes())
    }

    /// Serialize to the private-key file format of spec.md §6:
    /// `(version, cryptosystem fp, x)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, &self.public_key.cryptosystem_fp);
        wire::write_biguint(&mut out, &self.x);
        out
    }

    /// Parse a private-key file against the `cryptosystem` it claims to be
    /// bound to, recomputing and revalidating the matching public key.
    pub fn from_bytes(bytes: &[u8], cryptosystem: &Cryptosystem) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let cryptosystem_fp = cursor.read_fingerprint()?;
        let x = cursor.read_biguint()?;
        cursor.finish()?;

        if cryptosystem_fp.as_bytes() != cryptosystem.get_fingerprint().as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }
        let h = cryptosystem.modpow(cryptosystem.g(), &x);
        let public_key = PublicKey::from_element(cryptosystem, h)?;
        Ok(Self { x, public_key })
    }
}

impl KeyPair {
    pub fn generate<R: RngCore>(cryptosystem: &Cryptosystem, rng: &mut R) -> Self {
        let x = group::random_scalar(cryptosystem.q(), rng);
        let h = cryptosystem.modpow(cryptosystem.g(), &x);
        let public_key = PublicKey {
            cryptosystem_fp: cryptosystem.get_fingerprint(),
            p: cryptosystem.p().clone(),
            q: cryptosystem.q().clone(),
            g: cryptosystem.g().clone(),
            h,
        };
        let private_key = PrivateKey { x, public_key: public_key.clone() };
        Self { public: public_key, private: private_key }
    }
}

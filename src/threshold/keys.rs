//! Shared threshold public key and a single trustee's private share
//! (spec.md §4.4-4.6).

use num_bigint::BigUint;

use crate::cryptosystem::Cryptosystem;
use crate::error::{PvError, PvResult};
use crate::fingerprint::{Fingerprint, FingerprintBuilder, FingerprintBytes};
use crate::wire::{self, Cursor};

const FILE_VERSION: u8 = 1;

/// The combined public key `Y = Π_j A_{j,0} mod p` plus each trustee's
/// individual public share `Y_i = g^{s_i} mod p`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdPublicKey {
    cryptosystem_fp: FingerprintBytes,
    p: BigUint,
    q: BigUint,
    g: BigUint,
    n: u32,
    k: u32,
    y: BigUint,
    y_i: Vec<BigUint>,
}

impl ThresholdPublicKey {
    pub(crate) fn new(
        cryptosystem: &Cryptosystem,
        n: u32,
        k: u32,
        y: BigUint,
        y_i: Vec<BigUint>,
    ) -> PvResult<Self> {
        if !cryptosystem.is_group_member(&y) {
            return Err(PvError::InvalidPublicKey);
        }
        for y_j in &y_i {
            if !cryptosystem.is_group_member(y_j) {
                return Err(PvError::InvalidPublicKey);
            }
        }
        Ok(Self {
            cryptosystem_fp: cryptosystem.get_fingerprint(),
            p: cryptosystem.p().clone(),
            q: cryptosystem.q().clone(),
            g: cryptosystem.g().clone(),
            n,
            k,
            y,
            y_i,
        })
    }

    pub fn cryptosystem_fingerprint(&self) -> FingerprintBytes {
        self.cryptosystem_fp
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn y(&self) -> &BigUint {
        &self.y
    }

    pub fn y_i(&self, i: u32) -> PvResult<&BigUint> {
        self.y_i.get(i as usize).ok_or(PvError::InvalidTrusteeIndex(i))
    }

    pub fn get_fingerprint(&self) -> FingerprintBytes {
        Fingerprint::get_fingerprint(self)
    }

    /// Serialize to the threshold public-key file format of spec.md §6:
    /// `(version, cryptosystem fp, n, k, Y, [Y_i])`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_fingerprint(&mut out, &self.cryptosystem_fp);
        wire::write_u32(&mut out, self.n);
        wire::write_u32(&mut out, self.k);
        wire::write_biguint(&mut out, &self.y);
        wire::write_u32(&mut out, self.y_i.len() as u32);
        for y_j in &self.y_i {
            wire::write_biguint(&mut out, y_j);
        }
        out
    }

    /// Parse a threshold public-key file against the `cryptosystem` it
    /// claims to be bound to, revalidating `Y` and every `Y_i`.
    pub fn from_bytes(bytes: &[u8], cryptosystem: &Cryptosystem) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let cryptosystem_fp = cursor.read_fingerprint()?;
        let n = cursor.read_u32()?;
        let k = cursor.read_u32()?;
        let y = cursor.read_biguint()?;
        let y_i_count = cursor.read_u32()? as usize;
        let mut y_i = Vec::with_capacity(y_i_count);
        for _ in 0..y_i_count {
            y_i.push(cursor.read_biguint()?);
        }
        cursor.finish()?;

        if cryptosystem_fp.as_bytes() != cryptosystem.get_fingerprint().as_bytes() {
            return Err(PvError::IncompatibleCryptosystem);
        }
        Self::new(cryptosystem, n, k, y, y_i)
    }
}

impl Fingerprint for ThresholdPublicKey {
    fn write_fingerprint(&self, builder: &mut FingerprintBuilder) {
        builder.append_fingerprint(&self.cryptosystem_fp);
        builder.append_u32(self.n);
        builder.append_u32(self.k);
        builder.append_biguint(&self.y);
        for y_j in &self.y_i {
            builder.append_biguint(y_j);
        }
    }
}

/// One trustee's share `s_i` of the combined private key, plus the
/// `ThresholdPublicKey` it was derived against.
#[derive(Clone, Debug)]
pub struct ThresholdPrivateKey {
    index: u32,
    share: BigUint,
    public: ThresholdPublicKey,
}

impl ThresholdPrivateKey {
    pub(crate) fn new(index: u32, share: BigUint, public: ThresholdPublicKey) -> Self {
        Self { index, share, public }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn share(&self) -> &BigUint {
        &self.share
    }

    pub fn public(&self) -> &ThresholdPublicKey {
        &self.public
    }

    /// Serialize to the threshold private-key file format of spec.md §6:
    /// `(version, index, share, embedded ThresholdPublicKey)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![FILE_VERSION];
        wire::write_u32(&mut out, self.index);
        wire::write_biguint(&mut out, &self.share);
        wire::write_bytes(&mut out, &self.public.to_bytes());
        out
    }

    /// Parse a threshold private-key file against the `cryptosystem` the
    /// embedded public key claims to be bound to.
    pub fn from_bytes(bytes: &[u8], cryptosystem: &Cryptosystem) -> PvResult<Self> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_version(FILE_VERSION)?;
        let index = cursor.read_u32()?;
        let share = cursor.read_biguint()?;
        let public_bytes = cursor.read_bytes()?;
        cursor.finish()?;

        let public = ThresholdPublicKey::from_bytes(&public_bytes, cryptosystem)?;
        Ok(Self { index, share, public })
    }
}


/// The output of `ThresholdEncryptionSetUp::generate_key_pair`.
#[derive(Clone, Debug)]
pub struct ThresholdKeyPair {
    pub public: ThresholdPublicKey,
    pub private: ThresholdPrivateKey,
}

//! Shared byte-level cursor helpers for the six file formats of spec.md
//! §6. Every format is `(version tag, length-prefixed fields...)` in
//! big-endian; this module is the one place that walks a `&[u8]` cursor
//! so each format's `to_bytes`/`from_bytes` pair only has to say what
//! fields it has, not how to frame them.

use num_bigint::BigUint;

use crate::error::{PvError, PvResult};
use crate::fingerprint::FingerprintBytes;

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

pub(crate) fn write_biguint(out: &mut Vec<u8>, value: &BigUint) {
    write_bytes(out, &value.to_bytes_be());
}

pub(crate) fn write_fingerprint(out: &mut Vec<u8>, fp: &FingerprintBytes) {
    out.extend_from_slice(fp.as_bytes());
}

/// A read-only cursor over a byte slice, consumed front-to-back.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn take(&mut self, n: usize) -> PvResult<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(PvError::Serialization("unexpected end of input".into()));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    pub(crate) fn read_version(&mut self, expected: u8) -> PvResult<()> {
        let version = self.take(1)?[0];
        if version != expected {
            return Err(PvError::Serialization(format!("unsupported version {version}")));
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> PvResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u32(&mut self) -> PvResult<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub(crate) fn read_u64(&mut self) -> PvResult<u64> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub(crate) fn read_bytes(&mut self) -> PvResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub(crate) fn read_biguint(&mut self) -> PvResult<BigUint> {
        Ok(BigUint::from_bytes_be(&self.read_bytes()?))
    }

    pub(crate) fn read_fingerprint(&mut self) -> PvResult<FingerprintBytes> {
        let bytes: [u8; 32] = self
            .take(32)?
            .try_into()
            .map_err(|_| PvError::Serialization("truncated fingerprint".into()))?;
        Ok(FingerprintBytes(bytes))
    }

    pub(crate) fn finish(self) -> PvResult<()> {
        if !self.bytes.is_empty() {
            return Err(PvError::Serialization("trailing bytes after expected fields".into()));
        }
        Ok(())
    }
}

//! A position-addressable bit buffer (spec.md §2 item 3, §4.2).
//!
//! `PublicKey::encrypt_bytes` packs a message into fixed-width blocks of
//! `nbits - 1` bits each; `PrivateKey::decrypt_to_bytes` reassembles the
//! blocks and truncates to the recorded bit-length `L`. `BitStream` is
//! the shared buffer both directions read and write through.

use num_bigint::BigUint;

/// A growable sequence of bits, stored MSB-first within each byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitStream {
    bits: Vec<bool>,
}

impl BitStream {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    /// Build a `BitStream` from raw bytes, MSB-first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut bits = Vec::with_capacity(bytes.len() * 8);
        for byte in bytes {
            for i in (0..8).rev() {
                bits.push((byte >> i) & 1 == 1);
            }
        }
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn push_bit(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    pub fn append(&mut self, other: &BitStream) {
        self.bits.extend_from_slice(&other.bits);
    }

    /// Pad with zero bits until `len()` is a multiple of `block_bits`.
    pub fn pad_to_multiple_of(&mut self, block_bits: usize) {
        while self.bits.len() % block_bits != 0 {
            self.bits.push(false);
        }
    }

    /// Read up to `count` bits starting at `offset`, zero-extending if the
    /// stream is shorter than `offset + count`.
    pub fn read_bits(&self, offset: usize, count: usize) -> Vec<bool> {
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            out.push(self.bits.get(offset + i).copied().unwrap_or(false));
        }
        out
    }

    /// Keep only the first `bit_len` bits.
    pub fn truncate(&mut self, bit_len: usize) {
        self.bits.truncate(bit_len);
    }

    /// Render the stream as bytes, zero-padding the final byte on the
    /// right if `len()` is not a multiple of 8.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bits.len().div_ceil(8));
        for chunk in self.bits.chunks(8) {
            let mut byte = 0u8;
            for (i, bit) in chunk.iter().enumerate() {
                if *bit {
                    byte |= 1 << (7 - i);
                }
            }
            out.push(byte);
        }
        out
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Build a `BitStream` directly from a sequence of bits, MSB-first.
    pub fn from_bits_msb(bits: &[bool]) -> Self {
        Self { bits: bits.to_vec() }
    }

    /// Interpret the stream as a big-endian unsigned integer (MSB first).
    pub fn to_biguint(&self) -> BigUint {
        let mut value = BigUint::from(0u8);
        for &bit in &self.bits {
            value <<= 1u32;
            if bit {
                value |= BigUint::from(1u8);
            }
        }
        value
    }

    /// Render `value` as exactly `bit_len` bits, MSB-first, zero-padded on
    /// the left. `value` must fit in `bit_len` bits.
    pub fn from_biguint(value: &BigUint, bit_len: usize) -> Self {
        let bits = (0..bit_len).map(|i| value.bit((bit_len - 1 - i) as u64)).collect();
        Self { bits }
    }
}

impl From<&[u8]> for BitStream {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let data = b"Dummy vote #0";
        let stream = BitStream::from_bytes(data);
        assert_eq!(stream.len(), data.len() * 8);
        assert_eq!(stream.to_bytes(), data);
    }

    #[test]
    fn truncation_discards_padding() {
        let mut stream = BitStream::from_bytes(b"ab");
        let original_len = stream.len();
        stream.pad_to_multiple_of(64);
        assert!(stream.len() > original_len);
        stream.truncate(original_len);
        assert_eq!(stream.to_bytes(), b"ab");
    }

    #[test]
    fn biguint_round_trips() {
        let value = BigUint::from(0b1011_0010u32);
        let stream = BitStream::from_biguint(&value, 16);
        assert_eq!(stream.len(), 16);
        assert_eq!(stream.to_biguint(), value);
    }

    #[test]
    fn read_bits_zero_extends_past_end() {
        let stream = BitStream::from_bytes(&[0b1010_0000]);
        let bits = stream.read_bits(4, 8);
        assert_eq!(bits, vec![false, false, false, false, false, false, false, false]);
    }
}

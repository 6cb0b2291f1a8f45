//! The packed 128-bit instruction word and its bit-range accessors

use std::fmt;

use crate::error::{IsaError, Result};

/// Size of one encoded instruction in bytes
pub const WORD_BYTES: usize = 16;

/// A bit range inside one dword of the instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Field {
    pub dword: usize,
    pub lo: u32,
    pub width: u32,
    pub name: &'static str,
}

impl Field {
    pub const fn new(name: &'static str, dword: usize, lo: u32, width: u32) -> Self {
        Self { dword, lo, width, name }
    }

    const fn mask(self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }
}

/// Fixed-size 128-bit instruction: header, destination, source 0, source 1 / message
///
/// Once built the word is a plain value; the encoder never rewrites words it
/// has already appended to a stream.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InstructionWord([u32; 4]);

impl InstructionWord {
    pub const fn from_dwords(dwords: [u32; 4]) -> Self {
        Self(dwords)
    }

    pub const fn dwords(&self) -> [u32; 4] {
        self.0
    }

    /// Little-endian byte image
    pub fn to_bytes(&self) -> [u8; WORD_BYTES] {
        let mut out = [0u8; WORD_BYTES];
        for (chunk, dword) in out.chunks_exact_mut(4).zip(self.0) {
            chunk.copy_from_slice(&dword.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: [u8; WORD_BYTES]) -> Self {
        let mut dwords = [0u32; 4];
        for (dword, chunk) in dwords.iter_mut().zip(bytes.chunks_exact(4)) {
            *dword = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self(dwords)
    }

    pub(crate) fn get(&self, field: Field) -> u32 {
        (self.0[field.dword] >> field.lo) & field.mask()
    }

    pub(crate) fn get_bool(&self, field: Field) -> bool {
        self.get(field) != 0
    }

    /// Sign-extended read
    pub(crate) fn get_signed(&self, field: Field) -> i32 {
        let shift = 32 - field.width;
        ((self.get(field) << shift) as i32) >> shift
    }

    /// Write an unsigned value, rejecting values wider than the field
    pub(crate) fn set(&mut self, field: Field, value: u32) -> Result<()> {
        if value & !field.mask() != 0 {
            return Err(IsaError::FieldOutOfRange {
                field: field.name,
                value: i64::from(value),
                bits: field.width,
            });
        }
        let dword = &mut self.0[field.dword];
        *dword = (*dword & !(field.mask() << field.lo)) | (value << field.lo);
        Ok(())
    }

    pub(crate) fn set_bool(&mut self, field: Field, value: bool) -> Result<()> {
        self.set(field, u32::from(value))
    }

    /// Write a two's-complement value, rejecting values outside the signed range
    pub(crate) fn set_signed(&mut self, field: Field, value: i32) -> Result<()> {
        let min = -(1i64 << (field.width - 1));
        let max = (1i64 << (field.width - 1)) - 1;
        if !(min..=max).contains(&i64::from(value)) {
            return Err(IsaError::FieldOutOfRange {
                field: field.name,
                value: i64::from(value),
                bits: field.width,
            });
        }
        self.set(field, (value as u32) & field.mask())
    }
}

impl fmt::Debug for InstructionWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InstructionWord({:08x} {:08x} {:08x} {:08x})",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::LowerHex for InstructionWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x} {:08x} {:08x} {:08x}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: Field = Field::new("low", 0, 0, 7);
    const HIGH_BIT: Field = Field::new("high", 0, 31, 1);
    const SIGNED: Field = Field::new("signed", 1, 16, 10);
    const FULL: Field = Field::new("full", 3, 0, 32);

    #[test]
    fn test_set_and_get() {
        let mut word = InstructionWord::default();
        word.set(LOW, 0x5b).unwrap();
        word.set_bool(HIGH_BIT, true).unwrap();
        assert_eq!(word.get(LOW), 0x5b);
        assert!(word.get_bool(HIGH_BIT));
        assert_eq!(word.dwords()[0], 0x8000_005b);
    }

    #[test]
    fn test_overwrite_clears_previous_bits() {
        let mut word = InstructionWord::default();
        word.set(LOW, 0x7f).unwrap();
        word.set(LOW, 0x01).unwrap();
        assert_eq!(word.dwords()[0], 0x01);
    }

    #[test]
    fn test_value_too_wide() {
        let mut word = InstructionWord::default();
        let err = word.set(LOW, 0x80).unwrap_err();
        assert_eq!(
            err,
            IsaError::FieldOutOfRange {
                field: "low",
                value: 0x80,
                bits: 7
            }
        );
        assert_eq!(word, InstructionWord::default());
    }

    #[test]
    fn test_signed_fields() {
        let mut word = InstructionWord::default();
        word.set_signed(SIGNED, -3).unwrap();
        assert_eq!(word.get_signed(SIGNED), -3);
        word.set_signed(SIGNED, 511).unwrap();
        assert_eq!(word.get_signed(SIGNED), 511);
        assert!(word.set_signed(SIGNED, 512).is_err());
        assert!(word.set_signed(SIGNED, -513).is_err());
    }

    #[test]
    fn test_full_dword_field() {
        let mut word = InstructionWord::default();
        word.set(FULL, 0xdead_beef).unwrap();
        assert_eq!(word.get(FULL), 0xdead_beef);
    }

    #[test]
    fn test_byte_image_is_little_endian() {
        let word = InstructionWord::from_dwords([0x0403_0201, 0, 0, 0x1000_0000]);
        let bytes = word.to_bytes();
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert_eq!(bytes[15], 0x10);
        assert_eq!(InstructionWord::from_bytes(bytes), word);
    }
}

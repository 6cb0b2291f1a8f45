//! Instruction streams and program images
//!
//! An [`InstructionStream`] is the flat output of the encoder: a sequence of
//! sealed 16-byte words, each decodable on its own. A [`GenProgram`] bundles
//! a stream with the kernel's constant pool so a compiled kernel can be
//! stored and reloaded.

use std::fmt::Write as _;

use super::disasm::disassemble;
use super::word::{InstructionWord, WORD_BYTES};
use crate::constant::ConstantPool;
use crate::error::{IsaError, Result};

/// Append-only sequence of encoded words
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InstructionStream {
    words: Vec<InstructionWord>,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
        }
    }

    /// Append a sealed word and return its index
    pub(crate) fn push(&mut self, word: InstructionWord) -> usize {
        self.words.push(word);
        self.words.len() - 1
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&InstructionWord> {
        self.words.get(index)
    }

    pub fn words(&self) -> &[InstructionWord] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionWord> {
        self.words.iter()
    }

    /// Flat little-endian byte image, 16 bytes per word
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * WORD_BYTES);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_bytes());
        }
        bytes
    }

    /// Split a byte image back into words
    ///
    /// # Errors
    ///
    /// `TruncatedStream` when the length is not a multiple of 16.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let chunks = bytes.chunks_exact(WORD_BYTES);
        if !chunks.remainder().is_empty() {
            return Err(IsaError::TruncatedStream(bytes.len()));
        }
        let words = chunks
            .map(|chunk| {
                let mut raw = [0u8; WORD_BYTES];
                raw.copy_from_slice(chunk);
                InstructionWord::from_bytes(raw)
            })
            .collect();
        Ok(Self { words })
    }

    /// One line per word, prefixed with the word index
    ///
    /// Words that do not decode are listed with their raw hex instead of
    /// aborting the listing.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (index, word) in self.words.iter().enumerate() {
            let _ = match disassemble(word) {
                Ok(text) => writeln!(out, "{index:>5}: {text}"),
                Err(err) => writeln!(out, "{index:>5}: {word:x}  // {err}"),
            };
        }
        out
    }
}

impl FromIterator<InstructionWord> for InstructionStream {
    fn from_iter<I: IntoIterator<Item = InstructionWord>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a InstructionWord;
    type IntoIter = std::slice::Iter<'a, InstructionWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}

/// A compiled kernel: machine code plus its constant data
///
/// Program images serialize with bincode for ahead-of-time compilation:
///
/// ```
/// use gen_isa::isa::GenProgram;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut program = GenProgram::new("empty", 16);
/// program.constants.append(b"foo\0", "foo", 4, 4)?;
///
/// let bytes = program.to_bytes()?;
/// let loaded = GenProgram::from_bytes(&bytes)?;
/// assert_eq!(program, loaded);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenProgram {
    /// Kernel name
    pub name: String,
    /// Dispatch width the code was generated for
    pub simd_width: u32,
    pub instructions: InstructionStream,
    pub constants: ConstantPool,
}

impl GenProgram {
    pub fn new(name: impl Into<String>, simd_width: u32) -> Self {
        Self {
            name: name.into(),
            simd_width,
            instructions: InstructionStream::new(),
            constants: ConstantPool::new(),
        }
    }

    pub fn with_instructions(name: impl Into<String>, simd_width: u32, instructions: InstructionStream) -> Self {
        Self {
            instructions,
            ..Self::new(name, simd_width)
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Human-readable listing of the code and the constant table
    pub fn disassemble(&self) -> String {
        let mut out = format!("// kernel {} simd{}\n", self.name, self.simd_width);
        out.push_str(&self.instructions.listing());
        if !self.constants.is_empty() {
            out.push_str("// constants\n");
            for constant in self.constants.constants() {
                let _ = writeln!(
                    out,
                    "//   {:<16} offset {:>6} size {:>6} align {}",
                    constant.name(),
                    constant.offset(),
                    constant.size(),
                    constant.alignment()
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{Body, ConditionalModifier, Destination, ExecSize, Header, Instruction, Opcode, RegType, Source};

    fn add_word() -> InstructionWord {
        Instruction::new(
            Header::new(Opcode::Add, ExecSize::S8),
            Body::Alu {
                cond: ConditionalModifier::None,
                dst: Destination::grf(2, RegType::F),
                src0: Source::vector(4, RegType::F),
                src1: Some(Source::vector(6, RegType::F)),
            },
        )
        .encode()
        .unwrap()
    }

    #[test]
    fn test_stream_byte_image() {
        let stream: InstructionStream = [add_word(), add_word()].into_iter().collect();
        let bytes = stream.to_bytes();
        assert_eq!(bytes.len(), 2 * WORD_BYTES);
        assert_eq!(InstructionStream::from_bytes(&bytes).unwrap(), stream);
    }

    #[test]
    fn test_stream_rejects_partial_word() {
        let bytes = vec![0u8; WORD_BYTES + 3];
        assert_eq!(
            InstructionStream::from_bytes(&bytes).unwrap_err(),
            IsaError::TruncatedStream(WORD_BYTES + 3)
        );
    }

    #[test]
    fn test_listing_marks_bad_words() {
        let stream: InstructionStream = [add_word(), InstructionWord::from_dwords([3, 0, 0, 0])].into_iter().collect();
        let listing = stream.listing();
        let lines: Vec<_> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("add(8)"));
        assert!(lines[1].contains("unknown opcode"), "{}", lines[1]);
    }

    #[test]
    fn test_program_round_trip() {
        let mut program = GenProgram::with_instructions("k", 8, [add_word()].into_iter().collect());
        program.constants.append(b"foo\0", "foo", 4, 4).unwrap();
        let loaded = GenProgram::from_bytes(&program.to_bytes().unwrap()).unwrap();
        assert_eq!(loaded, program);
        let text = loaded.disassemble();
        assert!(text.starts_with("// kernel k simd8"));
        assert!(text.contains("foo"));
    }
}

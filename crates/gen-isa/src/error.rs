//! Error types for encoding, decoding and constant pool operations

use std::fmt;

/// Result type for ISA operations
pub type Result<T> = std::result::Result<T, IsaError>;

/// Errors that can occur while building or reading instruction words
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsaError {
    /// The opcode/operand/message combination has no defined layout
    #[error("unsupported encoding for {opcode}: {reason}")]
    UnsupportedEncoding { opcode: String, reason: String },

    /// A value does not fit in the bit range reserved for it
    #[error("field {field} out of range: {value} does not fit in {bits} bits")]
    FieldOutOfRange { field: &'static str, value: i64, bits: u32 },

    /// Raw opcode bits that name no instruction
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Raw bits that name no value of an enumerated field
    #[error("invalid value {value} for {field}")]
    InvalidFieldValue { field: &'static str, value: u32 },

    /// Constant alignment that is not a power of two
    #[error("invalid constant alignment: {0} (must be a non-zero power of two)")]
    InvalidAlignment(u32),

    /// Constant payload shorter than the declared size
    #[error("constant {name:?} declares {size} bytes but only {available} were supplied")]
    ConstantTooShort { name: String, size: u32, available: usize },

    /// Serialized constant pool that cannot be read back
    #[error("malformed constant pool image: {0}")]
    MalformedConstantPool(String),

    /// Byte stream whose length is not a multiple of the word size
    #[error("truncated instruction stream: {0} bytes is not a multiple of 16")]
    TruncatedStream(usize),

    /// `pop` without a matching `push`
    #[error("encoder state stack underflow")]
    EncoderStateUnderflow,

    /// Invalid encoder configuration
    #[error("invalid encoder configuration: {0}")]
    InvalidConfig(String),

    /// Program image (de)serialization failure
    #[error("program serialization failed: {0}")]
    Serialization(String),
}

impl IsaError {
    /// Create an unsupported encoding error
    pub fn unsupported(opcode: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::UnsupportedEncoding {
            opcode: opcode.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid field value error
    pub fn invalid_field(field: &'static str, value: u32) -> Self {
        Self::InvalidFieldValue { field, value }
    }
}

impl From<bincode::Error> for IsaError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for IsaError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message() {
        let err = IsaError::unsupported("mad", "requires align16");
        assert_eq!(err.to_string(), "unsupported encoding for mad: requires align16");
    }

    #[test]
    fn test_field_out_of_range_message() {
        let err = IsaError::FieldOutOfRange {
            field: "dst.nr",
            value: 300,
            bits: 8,
        };
        assert!(err.to_string().contains("dst.nr"));
        assert!(err.to_string().contains("300"));
    }
}

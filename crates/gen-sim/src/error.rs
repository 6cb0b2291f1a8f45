//! Error types for lane operations and instruction execution

use gen_isa::IsaError;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised by vector memory primitives and the executor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    /// Lane access outside a byte buffer
    #[error("access out of bounds: offset {offset} + size {size} > buffer size {len}")]
    OutOfBounds { offset: u64, size: usize, len: usize },

    /// Element slice shorter than the vector
    #[error("buffer too small: {needed} elements needed, {len} available")]
    BufferTooSmall { needed: usize, len: usize },

    /// Instruction or operand form the executor does not model
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Executed more instructions than the configured limit
    #[error("step limit of {0} instructions exceeded")]
    StepLimitExceeded(usize),

    #[error(transparent)]
    Isa(#[from] IsaError),
}

impl SimError {
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SimError::OutOfBounds {
            offset: 60,
            size: 4,
            len: 62,
        };
        assert_eq!(err.to_string(), "access out of bounds: offset 60 + size 4 > buffer size 62");
        assert_eq!(SimError::unsupported("math").to_string(), "unsupported: math");
    }

    #[test]
    fn test_isa_error_conversion() {
        let err: SimError = IsaError::UnknownOpcode(3).into();
        assert_eq!(err.to_string(), "unknown opcode: 0x03");
    }
}

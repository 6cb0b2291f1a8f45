//! Encoder configuration

use crate::error::{IsaError, Result};

/// Options fixed for the lifetime of one [`Encoder`](super::Encoder)
///
/// Passed explicitly; nothing is read from the environment.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Kernel dispatch width, 8 or 16
    pub simd_width: u32,
    /// Route dword gathers through the data cache instead of the constant cache
    pub dword_gather_via_data_cache: bool,
    /// Emit a trace event with the disassembly of every sealed instruction
    pub trace_instructions: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            simd_width: 16,
            dword_gather_via_data_cache: false,
            trace_instructions: false,
        }
    }
}

impl EncoderConfig {
    pub fn simd8() -> Self {
        Self {
            simd_width: 8,
            ..Self::default()
        }
    }

    pub fn simd16() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.simd_width, 8 | 16) {
            return Err(IsaError::InvalidConfig(format!(
                "simd_width must be 8 or 16, got {}",
                self.simd_width
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.simd_width, 16);
        assert!(config.validate().is_ok());
        assert_eq!(EncoderConfig::simd8().simd_width, 8);
    }

    #[test]
    fn test_from_json_fills_missing_keys() {
        let config = EncoderConfig::from_json(r#"{ "simd_width": 8 }"#).unwrap();
        assert_eq!(config.simd_width, 8);
        assert!(!config.dword_gather_via_data_cache);
    }

    #[test]
    fn test_from_json_rejects_bad_width() {
        assert!(matches!(
            EncoderConfig::from_json(r#"{ "simd_width": 12 }"#),
            Err(IsaError::InvalidConfig(_))
        ));
        assert!(EncoderConfig::from_json("not json").is_err());
    }
}

//! Gen GPU instruction encoding
//!
//! This crate provides:
//! - **Instruction words**: bit-exact encoding, decoding and disassembly of
//!   128-bit Gen machine instructions, including send message descriptors
//! - **Encoder**: a stateful emitter producing instruction streams
//! - **Constant pool**: aligned packing of kernel constant data
//! - **HalfFloat**: IEEE binary16 scalar with float-domain arithmetic
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        code generator / kernel builder       │
//! └──────────────┬───────────────────┬───────────┘
//!                │                   │
//!                ▼                   ▼
//! ┌──────────────────────────┐ ┌────────────────┐
//! │  Encoder (state stack)   │ │  ConstantPool  │
//! └──────────────┬───────────┘ └───────┬────────┘
//!                ▼                     │
//! ┌──────────────────────────┐         │
//! │ Instruction ⇄ 128-bit    │         │
//! │ InstructionWord          │         │
//! └──────────────┬───────────┘         │
//!                ▼                     ▼
//! ┌──────────────────────────────────────────────┐
//! │      GenProgram (stream + constants)         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use gen_isa::isa::{disassemble, Destination, Encoder, EncoderConfig, RegType, Source};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut encoder = Encoder::new(EncoderConfig::simd16())?;
//! encoder.mul(Destination::grf(2, RegType::F), Source::vector(4, RegType::F), Source::imm_f(0.5))?;
//!
//! let stream = encoder.into_stream();
//! let text = disassemble(&stream.words()[0])?;
//! assert!(text.starts_with("mul(16) g2<1>:F g4<8,8,1>:F"));
//! # Ok(())
//! # }
//! ```

pub mod constant;
pub mod error;
pub mod half;
pub mod isa;

pub use constant::{Constant, ConstantPool};
pub use error::{IsaError, Result};
pub use half::HalfFloat;

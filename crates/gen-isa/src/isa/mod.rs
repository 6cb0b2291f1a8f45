//! Gen instruction set
//!
//! Every machine instruction is a 128-bit word of four little-endian dwords.
//! The first dword is a common header; the other three are overlapping
//! regions whose meaning depends on the opcode class, the access mode and
//! the addressing mode of each operand.
//!
//! # Architecture
//!
//! - **Logical form**: [`Instruction`] = [`Header`] + [`Body`], a tagged
//!   union with one variant per operand layout
//! - **Words**: [`InstructionWord`] with range-checked bit-field access
//! - **Encoding**: [`Instruction::encode`] / [`Instruction::decode`], exact
//!   inverses for every supported layout
//! - **Emission**: [`Encoder`] applies per-instruction state and message
//!   length rules, appending to an [`InstructionStream`]
//! - **Text**: [`disassemble`] and `Display` for [`Instruction`]
//!
//! # Operand layouts
//!
//! | Layout      | Used by                                   |
//! |-------------|-------------------------------------------|
//! | Direct1     | align1, direct register                   |
//! | Indirect1   | align1, `a0`-relative                     |
//! | Direct16    | align16, direct register with swizzle     |
//! | Indirect16  | align16, `a0`-relative with swizzle       |
//! | Direct3Src  | `mad`, three align16 sources              |
//! | Immediate   | src1 (or src0 of one-source ops), dword 3 |

mod config;
mod defs;
mod disasm;
mod encoder;
mod instruction;
mod layout;
mod message;
mod operand;
mod program;
mod word;

pub use config::EncoderConfig;
pub use defs::{
    AccessMode, AddressMode, AtomicOp, AtomicSimdMode, ByteScatterSize, ByteSimdMode, ConditionalModifier,
    DataPortMessage, DependencyControl, ExecSize, GatewayFunction, HorizontalStride, MaskControl, MathFunction,
    Opcode, OpcodeClass, PredicateControl, QuarterControl, RegFile, RegType, SamplerSimdMode, SharedFunction,
    ThreadControl, TypedMessage, UntypedSimdMode, VerticalStride, Width,
};
pub use disasm::disassemble;
pub use encoder::{sampler_message, Encoder, EncoderState};
pub use instruction::{Body, Branch, FlagRegister, Header, Instruction};
pub use message::{DwordPort, Message, MessageDescriptor};
pub use operand::{arf, Destination, Location, Region, RegisterSource, Source, Swizzle, GRF_BYTES};
pub use program::{GenProgram, InstructionStream};
pub use word::{InstructionWord, WORD_BYTES};

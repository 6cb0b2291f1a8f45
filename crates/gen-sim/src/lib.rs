//! Gen SIMD lane simulation
//!
//! This crate provides:
//! - **Lane vectors**: `GenVec<T, N>` for the 4, 8, 16 and 32-wide families
//!   and `GenScalar<T>` for the 1-wide family, over `f32`, `i32`, `u32` and
//!   mask lanes
//! - **Operations**: elementwise arithmetic, bitwise and comparison ops in
//!   [`ops`], with scalar operands broadcast automatically
//! - **Memory**: bounds-checked load/store and gather/scatter over byte
//!   buffers
//! - **Executor**: a [`Simulator`] running decoded align1 ALU instructions
//!   against a general register file
//!
//! # Usage
//!
//! ```rust
//! use gen_sim::{ops, GenF16, GenF1, GenU16};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data: Vec<f32> = (0..16).map(|i| i as f32).collect();
//! let bytes: &[u8] = bytemuck::cast_slice(&data);
//!
//! // reverse the lanes through a gather
//! let offsets = GenU16::from_fn(|i| (15 - i as u32) * 4);
//! let v = GenF16::gather(bytes, &offsets)?;
//! let below = ops::lt(&v, &GenF1::new(4.0));
//! assert_eq!(below.mask(), 0xf000);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod exec;
pub mod lane;
mod memory;
pub mod ops;
pub mod vector;

pub use error::{Result, SimError};
pub use exec::{Flow, Simulator, SimulatorConfig, GRF_REGISTERS};
pub use lane::{cast_lane, ArithLane, BitLane, CmpLane, IntLane, Lane, Mask};
pub use vector::{
    GenF1, GenF16, GenF32, GenF4, GenF8, GenI1, GenI16, GenI32, GenI4, GenI8, GenM1, GenM16, GenM32, GenM4, GenM8,
    GenScalar, GenU1, GenU16, GenU32, GenU4, GenU8, GenVec, Lanes, Operand, SupportedWidth, SUB_LANES,
};

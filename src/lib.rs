//! Gen GPU code generation toolkit
//!
//! Umbrella crate over the workspace:
//! - [`gen_isa`]: 128-bit instruction words, the encoder, constant pools
//!   and `HalfFloat`
//! - [`gen_sim`]: SIMD lane vectors and an executor for encoded streams
//! - [`gen_tracing`]: subscriber setup and performance spans
//!
//! # Example
//!
//! ```rust
//! use gen_compute::isa::{Destination, Encoder, EncoderConfig, RegType, Source};
//! use gen_compute::Simulator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut encoder = Encoder::new(EncoderConfig::simd8())?;
//! encoder.add(Destination::grf(2, RegType::D), Source::vector(4, RegType::D), Source::imm_d(1))?;
//! encoder.eot(127)?;
//!
//! let mut sim = Simulator::default();
//! sim.write_lanes(4, &[10i32; 8])?;
//! sim.run(encoder.stream())?;
//! assert_eq!(sim.read_lanes::<i32>(2, 8)?, vec![11; 8]);
//! # Ok(())
//! # }
//! ```

pub use gen_isa;
pub use gen_sim;
pub use gen_tracing;

pub use gen_isa::isa;
pub use gen_isa::{Constant, ConstantPool, HalfFloat, IsaError};
pub use gen_sim::{ops, Flow, GenScalar, GenVec, SimError, Simulator, SimulatorConfig};
pub use gen_tracing::{init_global_tracing, TracingConfig};

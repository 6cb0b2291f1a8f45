//! Word-level executor
//!
//! [`Simulator`] runs decoded align1 ALU instructions against a 128-entry
//! general register file. Operands are gathered out of the register file
//! into lane vectors, combined with the operations in [`crate::ops`] and
//! written back under the channel enable mask.
//!
//! # Architecture
//!
//! ```text
//! InstructionWord ── decode ──▶ Instruction
//!                                  │
//!            ┌─────────────────────┼──────────────────────┐
//!            ▼                     ▼                      ▼
//!      gather src0/src1      dispatch & predicate    cond modifier
//!      (region offsets)         channel enables      ──▶ flag bits
//!            │                     │
//!            └──────▶ ops ─────────┴──▶ masked write to dst
//! ```
//!
//! Modelled: `mov not and or xor add mul sel cmp` over `F`, `D` and `UD`
//! operands at execution size 1, 4, 8 or 16, `jmpi`, `nop` and an
//! end-of-thread `send`. Everything else is rejected with
//! [`SimError::Unsupported`].

use gen_isa::isa::{
    arf, AccessMode, Body, Branch, ConditionalModifier, Destination, FlagRegister, Header, Instruction,
    InstructionStream, InstructionWord, Location, MaskControl, Opcode, PredicateControl, QuarterControl, RegFile,
    RegType, Source, GRF_BYTES,
};
use std::time::Instant;

use gen_tracing::perf_span;
use gen_tracing::performance::{record_lane_throughput, record_simulation};
use tracing::{debug, trace};

use crate::error::{Result, SimError};
use crate::lane::{CmpLane, Lane, Mask};
use crate::ops;
use crate::vector::{GenScalar, GenVec, Lanes, SupportedWidth};

/// General registers in the register file
pub const GRF_REGISTERS: usize = 128;

const GRF_SIZE: usize = GRF_REGISTERS * GRF_BYTES as usize;
const FLAG_REGISTERS: usize = 4;

/// Executor limits
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Instructions [`Simulator::run`] executes before giving up
    pub max_steps: usize,
    /// Emit a `trace` event for every executed instruction
    pub trace_steps: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_steps: 1 << 20,
            trace_steps: false,
        }
    }
}

/// What the program counter does after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    /// Relative jump in instruction words, counted from the next instruction
    Jump(i64),
    /// End of thread
    Halt,
}

/// One hardware thread: register file, flag registers and dispatch mask
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulatorConfig,
    grf: Vec<u8>,
    /// `f0.0 f0.1 f1.0 f1.1`
    flags: [u16; FLAG_REGISTERS],
    dispatch_mask: u32,
    /// Enabled ALU channels executed so far
    retired_lanes: u64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            grf: vec![0; GRF_SIZE],
            flags: [0; FLAG_REGISTERS],
            dispatch_mask: u32::MAX,
            retired_lanes: 0,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Raw register file, register `n` at byte `n * 32`
    pub fn grf(&self) -> &[u8] {
        &self.grf
    }

    pub fn dispatch_mask(&self) -> u32 {
        self.dispatch_mask
    }

    /// Channels the thread was dispatched with; `NoMask` instructions ignore it
    pub fn set_dispatch_mask(&mut self, mask: u32) {
        self.dispatch_mask = mask;
    }

    /// Enabled ALU channels executed since the simulator was created
    pub fn retired_lanes(&self) -> u64 {
        self.retired_lanes
    }

    /// Read `count` consecutive lanes starting at register `nr`
    ///
    /// # Example
    ///
    /// ```rust
    /// use gen_sim::Simulator;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut sim = Simulator::default();
    /// sim.write_lanes(3, &[1.0f32, 2.0, 3.0])?;
    /// assert_eq!(sim.read_lanes::<f32>(3, 2)?, vec![1.0, 2.0]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_lanes<T: Lane>(&self, nr: u8, count: usize) -> Result<Vec<T>> {
        let base = usize::from(nr) * GRF_BYTES as usize;
        (0..count)
            .map(|lane| GenScalar::<T>::load_bytes(&self.grf, base + lane * 4).map(|value| value.value()))
            .collect()
    }

    /// Write `values` to consecutive lanes starting at register `nr`
    ///
    /// Nothing is written if the values run past the last register.
    pub fn write_lanes<T: Lane>(&mut self, nr: u8, values: &[T]) -> Result<()> {
        let base = usize::from(nr) * GRF_BYTES as usize;
        let size = values.len() * 4;
        if base + size > self.grf.len() {
            return Err(SimError::OutOfBounds {
                offset: base as u64,
                size,
                len: self.grf.len(),
            });
        }
        self.grf[base..base + size].copy_from_slice(bytemuck::cast_slice(values));
        Ok(())
    }

    /// Register `nr` (and the ones following it) as a lane vector
    pub fn register<T: Lane, const N: usize>(&self, nr: u8) -> Result<GenVec<T, N>>
    where
        Lanes<N>: SupportedWidth,
    {
        GenVec::load_bytes(&self.grf, usize::from(nr) * GRF_BYTES as usize)
    }

    pub fn flag(&self, flag: FlagRegister) -> Result<u16> {
        Ok(self.flags[flag_index(flag)?])
    }

    pub fn set_flag(&mut self, flag: FlagRegister, value: u16) -> Result<()> {
        self.flags[flag_index(flag)?] = value;
        Ok(())
    }

    /// Execute one encoded instruction
    ///
    /// # Errors
    ///
    /// - `Isa` when the word does not decode
    /// - `Unsupported` for instructions, operand types or addressing the
    ///   executor does not model
    /// - `OutOfBounds` when a region reaches past the register file
    pub fn step(&mut self, word: &InstructionWord) -> Result<Flow> {
        let inst = Instruction::decode(word)?;
        if self.config.trace_steps {
            trace!(instruction = %inst, "step");
        }

        match inst.body {
            Body::Alu { .. } => {
                if inst.header.access_mode != AccessMode::Align1 {
                    return Err(SimError::unsupported("align16 execution"));
                }
                match inst.header.exec_size.lanes() {
                    1 | 4 => self.execute::<1>(&inst)?,
                    8 => self.execute::<2>(&inst)?,
                    16 => self.execute::<4>(&inst)?,
                    lanes => return Err(SimError::unsupported(format!("execution size {lanes}"))),
                }
                Ok(Flow::Next)
            }
            Body::Branch(Branch::Jump { offset }) => {
                if offset % 16 != 0 {
                    return Err(SimError::unsupported(format!("jump offset {offset} is not word aligned")));
                }
                Ok(Flow::Jump(i64::from(offset / 16)))
            }
            Body::Send { descriptor, .. } if descriptor.end_of_thread => Ok(Flow::Halt),
            Body::Empty if inst.opcode() == Opcode::Nop => Ok(Flow::Next),
            _ => Err(SimError::unsupported(format!("{} instructions", inst.opcode()))),
        }
    }

    /// Execute `stream` from its first word until it ends, jumps past its
    /// end, or sends end-of-thread. Returns the number of instructions
    /// executed.
    ///
    /// # Errors
    ///
    /// Any error from [`Simulator::step`], `StepLimitExceeded` after
    /// `max_steps` instructions, and `Unsupported` for a jump before the
    /// first word.
    pub fn run(&mut self, stream: &InstructionStream) -> Result<usize> {
        debug!(instructions = stream.len(), "running program");
        let _span = perf_span!("simulate", instructions = stream.len());
        let start = Instant::now();
        let lanes_before = self.retired_lanes;
        let mut ip = 0usize;
        let mut steps = 0usize;

        while let Some(word) = stream.get(ip) {
            if steps == self.config.max_steps {
                return Err(SimError::StepLimitExceeded(self.config.max_steps));
            }
            steps += 1;
            match self.step(word)? {
                Flow::Next => ip += 1,
                Flow::Jump(delta) => {
                    let target = ip as i64 + 1 + delta;
                    ip = usize::try_from(target)
                        .map_err(|_| SimError::unsupported(format!("jump to instruction {target}")))?;
                }
                Flow::Halt => break,
            }
        }

        let duration_us = start.elapsed().as_micros() as u64;
        record_simulation(steps, duration_us);
        record_lane_throughput("alu", (self.retired_lanes - lanes_before) as usize, duration_us);
        debug!(steps, "program finished");
        Ok(steps)
    }

    // ============================================================================================
    // ALU Execution
    // ============================================================================================

    fn execute<const N: usize>(&mut self, inst: &Instruction) -> Result<()>
    where
        Lanes<N>: SupportedWidth,
    {
        let Body::Alu { cond, dst, src0, src1 } = inst.body else {
            return Err(SimError::unsupported(format!("{} body", inst.opcode())));
        };
        let header = &inst.header;
        let lanes = header.exec_size.lanes();
        let dispatch = self.dispatch_channels(header, lanes)?;
        let predicate = self.predicate_channels(header, lanes)?;

        let exec_ty = src0.ty();
        let a = self.fetch::<N>(&src0, lanes)?.convert(exec_ty)?;
        let b = match src1 {
            Some(src) => Some(self.fetch::<N>(&src, lanes)?.convert(exec_ty)?),
            None => None,
        };
        let second = || b.ok_or_else(|| SimError::unsupported(format!("{} without a second source", header.opcode)));

        // sel consumes the predicate as its selector; every other opcode is
        // masked by it
        let mut enable = dispatch;
        let mut flag_bits = None;
        let mut result = match header.opcode {
            Opcode::Mov => a,
            Opcode::Not => a.not()?,
            Opcode::And | Opcode::Or | Opcode::Xor => a.bitwise(header.opcode, &second()?)?,
            Opcode::Add | Opcode::Mul => a.arith(header.opcode, &second()?)?,
            Opcode::Sel => {
                let b = second()?;
                let choose = match (predicate, cond) {
                    (Some(bits), _) => GenVec::from_fn(|channel| Mask::from(bits >> channel & 1 == 1)),
                    (None, ConditionalModifier::None) => GenVec::splat(Mask::TRUE),
                    (None, cond) => a.compare(&b, cond)?,
                };
                a.select(&choose, &b)
            }
            Opcode::Cmp => {
                let mask = a.compare(&second()?, cond)?;
                flag_bits = Some(mask.mask());
                TypedVec::from_bits(dst.ty, mask.cast())?
            }
            other => return Err(SimError::unsupported(format!("{other} instructions"))),
        };
        if header.opcode != Opcode::Sel {
            enable &= predicate.unwrap_or(u32::MAX);
        }

        if header.saturate {
            result = result.saturate();
        }
        if cond != ConditionalModifier::None && !matches!(header.opcode, Opcode::Cmp | Opcode::Sel) {
            flag_bits = Some(result.compare(&result.zero(), cond)?.mask());
        }

        let out = result.convert(dst.ty)?;
        self.write_destination(&dst, &out.bits(), enable, lanes)?;
        if let Some(bits) = flag_bits {
            self.update_flag(header, bits, enable)?;
        }
        self.retired_lanes += u64::from(enable.count_ones());
        Ok(())
    }

    fn dispatch_channels(&self, header: &Header, lanes: u32) -> Result<u32> {
        let full = channel_mask(lanes);
        let shift = quarter_shift(header)?;
        if header.mask_control == MaskControl::Disable {
            Ok(full)
        } else {
            Ok((self.dispatch_mask >> shift) & full)
        }
    }

    fn predicate_channels(&self, header: &Header, lanes: u32) -> Result<Option<u32>> {
        match header.predicate {
            PredicateControl::None => Ok(None),
            PredicateControl::Normal => {
                let full = channel_mask(lanes);
                let bits = (u32::from(self.flag(header.flag)?) >> quarter_shift(header)?) & full;
                Ok(Some(if header.predicate_inverse { !bits & full } else { bits }))
            }
            other => Err(SimError::unsupported(format!("predicate control {other:?}"))),
        }
    }

    fn update_flag(&mut self, header: &Header, bits: u32, enable: u32) -> Result<()> {
        let shift = quarter_shift(header)?;
        let index = flag_index(header.flag)?;
        let old = u32::from(self.flags[index]);
        let updated = (old & !(enable << shift)) | ((bits & enable) << shift);
        self.flags[index] = (updated & 0xffff) as u16;
        Ok(())
    }

    /// Channels at or past `lanes` read the first element so an operand
    /// near the end of the register file stays in bounds
    fn fetch<const N: usize>(&self, src: &Source, lanes: u32) -> Result<TypedVec<N>>
    where
        Lanes<N>: SupportedWidth,
    {
        match *src {
            Source::Immediate { ty, bits } => TypedVec::from_bits(ty, GenScalar::load_immediate(bits).broadcast()),
            Source::Register(reg) => {
                let base = grf_offset(reg.file, reg.location)?;
                let size = reg.ty.size_bytes();
                let offsets = GenVec::<u32, N>::from_fn(|channel| {
                    let channel = if (channel as u32) < lanes { channel as u32 } else { 0 };
                    base + reg.region.element_offset(channel) * size
                });
                let bits = GenVec::<u32, N>::gather(&self.grf, &offsets)?;
                let value = TypedVec::from_bits(reg.ty, bits)?;
                let value = if reg.abs { value.abs() } else { value };
                Ok(if reg.negate { value.negate() } else { value })
            }
        }
    }

    fn write_destination<const N: usize>(
        &mut self,
        dst: &Destination,
        bits: &GenVec<u32, N>,
        enable: u32,
        lanes: u32,
    ) -> Result<()>
    where
        Lanes<N>: SupportedWidth,
    {
        if dst.file == RegFile::Arf && matches!(dst.location, Location::Direct { nr: arf::NULL, .. }) {
            return Ok(());
        }
        let base = grf_offset(dst.file, dst.location)?;
        let stride = dst.hstride.elements().max(1) * dst.ty.size_bytes();
        let last = base + (lanes - 1) * stride;
        if last as usize + 4 > self.grf.len() {
            return Err(SimError::OutOfBounds {
                offset: u64::from(last),
                size: 4,
                len: self.grf.len(),
            });
        }
        for channel in (0..lanes).filter(|channel| enable >> channel & 1 == 1) {
            GenScalar::new(bits.lane(channel as usize)).store_bytes(&mut self.grf, (base + channel * stride) as usize)?;
        }
        Ok(())
    }
}

fn channel_mask(lanes: u32) -> u32 {
    if lanes >= 32 {
        u32::MAX
    } else {
        (1 << lanes) - 1
    }
}

/// Bit position of the quarter's first channel in the 16-bit flag and
/// dispatch words; Q3 and Q4 lie beyond them
fn quarter_shift(header: &Header) -> Result<u32> {
    match header.quarter_control {
        QuarterControl::Q1 => Ok(0),
        QuarterControl::Q2 => Ok(8),
        other => Err(SimError::unsupported(format!("quarter control {other:?}"))),
    }
}

fn flag_index(flag: FlagRegister) -> Result<usize> {
    if flag.nr > 1 || flag.subnr > 1 {
        return Err(SimError::unsupported(format!("flag register f{}.{}", flag.nr, flag.subnr)));
    }
    Ok(usize::from(flag.nr) * 2 + usize::from(flag.subnr))
}

/// Byte offset of a direct general register operand
fn grf_offset(file: RegFile, location: Location) -> Result<u32> {
    match (file, location) {
        (RegFile::Grf, Location::Direct { nr, subnr }) => Ok(u32::from(nr) * GRF_BYTES + u32::from(subnr)),
        (RegFile::Grf, Location::Indirect { .. }) => Err(SimError::unsupported("indirect addressing")),
        (file, _) => Err(SimError::unsupported(format!("{file:?} operands"))),
    }
}

// ================================================================================================
// Typed Lanes
// ================================================================================================

/// Lane vector tagged with its register type
#[derive(Debug, Clone, Copy, PartialEq)]
enum TypedVec<const N: usize>
where
    Lanes<N>: SupportedWidth,
{
    F(GenVec<f32, N>),
    D(GenVec<i32, N>),
    Ud(GenVec<u32, N>),
}

macro_rules! per_type {
    ($a:expr, $b:expr, $op:path) => {
        match ($a, $b) {
            (TypedVec::F(x), TypedVec::F(y)) => TypedVec::F($op(x, y)),
            (TypedVec::D(x), TypedVec::D(y)) => TypedVec::D($op(x, y)),
            (TypedVec::Ud(x), TypedVec::Ud(y)) => TypedVec::Ud($op(x, y)),
            _ => return Err(SimError::unsupported("mixed operand types")),
        }
    };
}

impl<const N: usize> TypedVec<N>
where
    Lanes<N>: SupportedWidth,
{
    fn from_bits(ty: RegType, bits: GenVec<u32, N>) -> Result<Self> {
        match ty {
            RegType::F => Ok(Self::F(bits.cast())),
            RegType::D => Ok(Self::D(bits.cast())),
            RegType::UD => Ok(Self::Ud(bits)),
            other => Err(SimError::unsupported(format!(":{} operands", other.suffix()))),
        }
    }

    fn ty(&self) -> RegType {
        match self {
            Self::F(_) => RegType::F,
            Self::D(_) => RegType::D,
            Self::Ud(_) => RegType::UD,
        }
    }

    fn bits(&self) -> GenVec<u32, N> {
        match self {
            Self::F(v) => v.cast(),
            Self::D(v) => v.cast(),
            Self::Ud(v) => *v,
        }
    }

    fn zero(&self) -> Self {
        match self {
            Self::F(_) => Self::F(GenVec::default()),
            Self::D(_) => Self::D(GenVec::default()),
            Self::Ud(_) => Self::Ud(GenVec::default()),
        }
    }

    /// Numeric conversion; float to integer saturates and maps NaN to zero
    fn convert(self, ty: RegType) -> Result<Self> {
        Ok(match (self, ty) {
            (Self::F(v), RegType::D) => Self::D(v.map(|x| x as i32)),
            (Self::F(v), RegType::UD) => Self::Ud(v.map(|x| x as u32)),
            (Self::D(v), RegType::F) => Self::F(v.map(|x| x as f32)),
            (Self::Ud(v), RegType::F) => Self::F(v.map(|x| x as f32)),
            (value, ty) => Self::from_bits(ty, value.bits())?,
        })
    }

    fn abs(self) -> Self {
        match self {
            Self::F(v) => Self::F(v.map(f32::abs)),
            Self::D(v) => Self::D(v.map(i32::wrapping_abs)),
            Self::Ud(v) => Self::Ud(v),
        }
    }

    fn negate(self) -> Self {
        match self {
            Self::F(v) => Self::F(v.map(|x| -x)),
            Self::D(v) => Self::D(v.map(i32::wrapping_neg)),
            Self::Ud(v) => Self::Ud(v.map(u32::wrapping_neg)),
        }
    }

    /// Clamp float lanes to `[0, 1]`, NaN to zero
    fn saturate(self) -> Self {
        match self {
            Self::F(v) => Self::F(v.map(|x| if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) })),
            other => other,
        }
    }

    fn not(self) -> Result<Self> {
        if self.ty().is_float() {
            return Err(SimError::unsupported("not on float operands"));
        }
        Self::from_bits(self.ty(), ops::not(&self.bits()))
    }

    fn bitwise(&self, opcode: Opcode, other: &Self) -> Result<Self> {
        if self.ty().is_float() || self.ty() != other.ty() {
            return Err(SimError::unsupported(format!("{opcode} on :{} operands", self.ty().suffix())));
        }
        let (a, b) = (self.bits(), other.bits());
        let bits = match opcode {
            Opcode::And => ops::and(&a, &b),
            Opcode::Or => ops::or(&a, &b),
            _ => ops::xor(&a, &b),
        };
        Self::from_bits(self.ty(), bits)
    }

    fn arith(&self, opcode: Opcode, other: &Self) -> Result<Self> {
        Ok(match opcode {
            Opcode::Mul => per_type!(self, other, ops::mul),
            _ => per_type!(self, other, ops::add),
        })
    }

    fn select(&self, choose: &GenVec<Mask, N>, other: &Self) -> Self {
        let bits = ops::select(choose, &self.bits(), &other.bits());
        match self {
            Self::F(_) => Self::F(bits.cast()),
            Self::D(_) => Self::D(bits.cast()),
            Self::Ud(_) => Self::Ud(bits),
        }
    }

    fn compare(&self, other: &Self, cond: ConditionalModifier) -> Result<GenVec<Mask, N>> {
        match (self, other) {
            (Self::F(a), Self::F(b)) => compare_lanes(a, b, cond),
            (Self::D(a), Self::D(b)) => compare_lanes(a, b, cond),
            (Self::Ud(a), Self::Ud(b)) => compare_lanes(a, b, cond),
            _ => Err(SimError::unsupported("mixed operand types")),
        }
    }
}

fn compare_lanes<T: CmpLane, const N: usize>(
    a: &GenVec<T, N>,
    b: &GenVec<T, N>,
    cond: ConditionalModifier,
) -> Result<GenVec<Mask, N>>
where
    Lanes<N>: SupportedWidth,
{
    match cond {
        ConditionalModifier::Zero => Ok(ops::eq(a, b)),
        ConditionalModifier::NotZero => Ok(ops::ne(a, b)),
        ConditionalModifier::Greater => Ok(ops::gt(a, b)),
        ConditionalModifier::GreaterEqual => Ok(ops::ge(a, b)),
        ConditionalModifier::Less => Ok(ops::lt(a, b)),
        ConditionalModifier::LessEqual => Ok(ops::le(a, b)),
        other => Err(SimError::unsupported(format!("conditional modifier {other:?}"))),
    }
}

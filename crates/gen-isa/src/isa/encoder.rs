//! Stateful instruction emitter
//!
//! The encoder turns typed emitter calls into sealed instruction words. The
//! per-instruction header bits (execution width, predication, masking,
//! quarter, saturation, access mode) come from the current
//! [`EncoderState`], which callers change in place and save/restore with
//! [`Encoder::push`] / [`Encoder::pop`].
//!
//! # Architecture
//!
//! - **ALU emitters**: one call, one word (`mov`, `add`, `cmp`, ...)
//! - **Split emitters**: SIMD16 `mad` and integer division are emitted as two
//!   SIMD8 halves
//! - **Send helpers**: build the message descriptor for a data port, sampler,
//!   gateway or spawner message with the payload lengths the hardware expects
//!
//! Every word is encoded before it is appended, so an unsupported operand
//! combination returns an error and leaves the stream untouched.
//!
//! # Example
//!
//! ```
//! use gen_isa::isa::{Destination, Encoder, EncoderConfig, RegType, Source};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut encoder = Encoder::new(EncoderConfig::simd8())?;
//! encoder.add(Destination::grf(2, RegType::F), Source::vector(4, RegType::F), Source::imm_f(1.0))?;
//!
//! encoder.push();
//! encoder.curr.no_mask = true;
//! encoder.mov(Destination::grf(3, RegType::UD), Source::imm_ud(7))?;
//! encoder.pop()?;
//!
//! encoder.eot(127)?;
//! assert_eq!(encoder.len(), 3);
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use gen_tracing::performance::record_encoding;
use tracing::{debug, trace};

use super::config::EncoderConfig;
use super::defs::{
    AccessMode, AtomicOp, AtomicSimdMode, ByteScatterSize, ByteSimdMode, ConditionalModifier, DataPortMessage,
    DependencyControl, ExecSize, GatewayFunction, MaskControl, MathFunction, Opcode, OpcodeClass, PredicateControl,
    QuarterControl, RegType, SamplerSimdMode, ThreadControl, TypedMessage, UntypedSimdMode, Width,
};
use super::instruction::{Body, Branch, FlagRegister, Header, Instruction};
use super::message::{DwordPort, Message, MessageDescriptor};
use super::operand::{Destination, Location, Region, RegisterSource, Source, GRF_BYTES};
use super::program::{GenProgram, InstructionStream};
use crate::error::{IsaError, Result};

/// Sampler message types used by [`Encoder::sample`]
pub mod sampler_message {
    pub const SAMPLE: u8 = 0;
    pub const SAMPLE_BIAS: u8 = 1;
    pub const SAMPLE_LOD: u8 = 2;
    pub const LD: u8 = 7;
}

/// Disabled-channel masks for untyped reads and writes, indexed by the
/// number of enabled channels
const UNTYPED_RW_MASK: [u8; 5] = [0xf, 0xe, 0xc, 0x8, 0x0];

/// Header bits applied to the next emitted instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncoderState {
    /// Execution width in lanes: 1, 4, 8 or 16
    pub exec_width: u32,
    pub quarter: QuarterControl,
    /// Execute every lane regardless of the dispatch mask
    pub no_mask: bool,
    pub flag: FlagRegister,
    pub predicate: PredicateControl,
    pub inverse_predicate: bool,
    pub saturate: bool,
    pub acc_write: bool,
    pub access_mode: AccessMode,
}

impl EncoderState {
    pub const fn new(exec_width: u32) -> Self {
        Self {
            exec_width,
            quarter: QuarterControl::Q1,
            no_mask: false,
            flag: FlagRegister::new(0, 0),
            predicate: PredicateControl::None,
            inverse_predicate: false,
            saturate: false,
            acc_write: false,
            access_mode: AccessMode::Align1,
        }
    }

    /// Predicate the following instructions on `flag`
    pub fn predicate_on(&mut self, flag: FlagRegister, inverse: bool) {
        self.flag = flag;
        self.predicate = PredicateControl::Normal;
        self.inverse_predicate = inverse;
    }
}

/// Emits instruction words into an [`InstructionStream`]
#[derive(Debug, Clone)]
pub struct Encoder {
    config: EncoderConfig,
    /// State used for the next emitted instruction
    pub curr: EncoderState,
    stack: Vec<EncoderState>,
    stream: InstructionStream,
    started: Instant,
}

/// Generate one-source ALU emitters
macro_rules! alu1_emitters {
    ($($(#[$meta:meta])* $name:ident => $opcode:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&mut self, dst: Destination, src: Source) -> Result<usize> {
                self.alu1(Opcode::$opcode, dst, src)
            }
        )*
    };
}

/// Generate two-source ALU emitters
macro_rules! alu2_emitters {
    ($($(#[$meta:meta])* $name:ident => $opcode:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&mut self, dst: Destination, src0: Source, src1: Source) -> Result<usize> {
                self.alu2(Opcode::$opcode, ConditionalModifier::None, dst, src0, src1)
            }
        )*
    };
}

impl Encoder {
    /// Create an encoder whose initial execution width is the dispatch width
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the configuration does not validate.
    pub fn new(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            curr: EncoderState::new(config.simd_width),
            config,
            stack: Vec::new(),
            stream: InstructionStream::new(),
            started: Instant::now(),
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Save the current state
    pub fn push(&mut self) {
        self.stack.push(self.curr);
    }

    /// Restore the most recently pushed state
    pub fn pop(&mut self) -> Result<()> {
        self.curr = self.stack.pop().ok_or(IsaError::EncoderStateUnderflow)?;
        Ok(())
    }

    pub fn stream(&self) -> &InstructionStream {
        &self.stream
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }

    pub fn into_stream(self) -> InstructionStream {
        self.record("stream");
        self.stream
    }

    /// Finish the kernel as a program image with an empty constant pool
    pub fn into_program(self, name: impl Into<String>) -> GenProgram {
        let name = name.into();
        self.record(&name);
        GenProgram::with_instructions(name, self.config.simd_width, self.stream)
    }

    /// Emit the encoding event covering everything since [`Encoder::new`]
    fn record(&self, kernel: &str) {
        record_encoding(kernel, self.stream.len(), self.started.elapsed().as_micros() as u64);
    }

    // ============================================================================
    // Core emission
    // ============================================================================

    fn exec_size(&self, opcode: Opcode) -> Result<ExecSize> {
        match self.curr.exec_width {
            1 | 4 | 8 | 16 => ExecSize::from_lanes(self.curr.exec_width),
            other => Err(IsaError::unsupported(opcode, format!("execution width {other}"))),
        }
    }

    /// Header for `opcode` built from the current state
    pub fn header(&self, opcode: Opcode) -> Result<Header> {
        Ok(Header {
            opcode,
            access_mode: self.curr.access_mode,
            mask_control: if self.curr.no_mask {
                MaskControl::Disable
            } else {
                MaskControl::Enable
            },
            dependency_control: DependencyControl::None,
            quarter_control: self.curr.quarter,
            thread_control: ThreadControl::Normal,
            predicate: self.curr.predicate,
            predicate_inverse: self.curr.inverse_predicate,
            flag: self.curr.flag,
            exec_size: self.exec_size(opcode)?,
            acc_write: self.curr.acc_write,
            debug: false,
            saturate: self.curr.saturate,
        })
    }

    /// Encode and append a fully built instruction, returning its index
    pub fn emit(&mut self, instruction: Instruction) -> Result<usize> {
        let word = instruction.encode()?;
        let index = self.stream.push(word);
        debug!(index, opcode = %instruction.opcode(), "sealed instruction");
        if self.config.trace_instructions {
            trace!(index, "{instruction}");
        }
        Ok(index)
    }

    /// A width-1 region read by a single lane is read as a scalar
    fn fit_source(&self, src: Source) -> Source {
        match src {
            Source::Register(mut reg) if self.curr.exec_width == 1 && reg.region.width == Width::W1 => {
                reg.region = Region::SCALAR;
                Source::Register(reg)
            }
            other => other,
        }
    }

    pub fn alu1(&mut self, opcode: Opcode, dst: Destination, src: Source) -> Result<usize> {
        let header = self.header(opcode)?;
        let src0 = self.fit_source(src);
        self.emit(Instruction::new(
            header,
            Body::Alu {
                cond: ConditionalModifier::None,
                dst,
                src0,
                src1: None,
            },
        ))
    }

    pub fn alu2(
        &mut self,
        opcode: Opcode,
        cond: ConditionalModifier,
        dst: Destination,
        src0: Source,
        src1: Source,
    ) -> Result<usize> {
        let header = self.header(opcode)?;
        let (src0, src1) = (self.fit_source(src0), self.fit_source(src1));
        self.emit(Instruction::new(
            header,
            Body::Alu {
                cond,
                dst,
                src0,
                src1: Some(src1),
            },
        ))
    }

    // ============================================================================
    // ALU emitters
    // ============================================================================

    alu1_emitters! {
        mov => Mov,
        not => Not,
        frc => Frc,
        rndd => Rndd,
        rndu => Rndu,
        rnde => Rnde,
        rndz => Rndz,
        lzd => Lzd,
        fbh => Fbh,
        fbl => Fbl,
        cbit => Cbit,
        /// Convert float lanes to half floats in the low word
        f32to16 => F32To16,
        f16to32 => F16To32,
    }

    alu2_emitters! {
        and => And,
        or => Or,
        xor => Xor,
        shl => Shl,
        shr => Shr,
        /// Arithmetic shift right
        asr => Asr,
        add => Add,
        mul => Mul,
        avg => Avg,
        mach => Mach,
        addc => Addc,
        subb => Subb,
        /// Select: lanes with the predicate set take `src0`, the rest `src1`
        sel => Sel,
    }

    /// Compare and write the per-lane result to the current flag register
    ///
    /// With a null destination the thread is marked as a switch point, as
    /// the hardware expects for flag-only compares.
    pub fn cmp(
        &mut self,
        cond: ConditionalModifier,
        src0: Source,
        src1: Source,
        dst: Option<Destination>,
    ) -> Result<usize> {
        let mut header = self.header(Opcode::Cmp)?;
        let dst = match dst {
            Some(dst) => dst,
            None => {
                header.thread_control = ThreadControl::Switch;
                Destination::null().retype(src0.ty())
            }
        };
        let (src0, src1) = (self.fit_source(src0), self.fit_source(src1));
        self.emit(Instruction::new(
            header,
            Body::Alu {
                cond,
                dst,
                src0,
                src1: Some(src1),
            },
        ))
    }

    /// `sel` with a conditional modifier instead of a predicate (min/max)
    pub fn sel_cmp(&mut self, cond: ConditionalModifier, dst: Destination, src0: Source, src1: Source) -> Result<usize> {
        if self.curr.predicate != PredicateControl::None {
            return Err(IsaError::unsupported(Opcode::Sel, "conditional select cannot be predicated"));
        }
        self.alu2(Opcode::Sel, cond, dst, src0, src1)
    }

    /// Multiply-add `dst = src0 + src1 * src2` in align16
    ///
    /// # Generated Pattern
    ///
    /// ```text
    /// mad(8)  dst    src0    src1    src2      { align16 }          // SIMD8
    ///
    /// mad(8)  dst    src0    src1    src2      { align16, Q1 }      // SIMD16
    /// mad(8)  dst+1  src0+1  src1+1  src2+1    { align16, Q2 }
    /// ```
    ///
    /// Scalar (`<0;1,0>`) sources are not advanced for the second half.
    /// Returns the index of the first word.
    pub fn mad(
        &mut self,
        dst: Destination,
        src0: RegisterSource,
        src1: RegisterSource,
        src2: RegisterSource,
    ) -> Result<usize> {
        let mut header = self.header(Opcode::Mad)?;
        header.access_mode = AccessMode::Align16;
        let body = |dst, src0, src1, src2| Body::Alu3 {
            cond: ConditionalModifier::None,
            dst,
            src0,
            src1,
            src2,
        };

        if self.curr.exec_width != 16 {
            return self.emit(Instruction::new(header, body(dst, src0, src1, src2)));
        }

        let (first, second) = split_header(header);
        let index = self.emit(Instruction::new(first, body(dst, src0, src1, src2)))?;
        self.emit(Instruction::new(
            second,
            body(
                next_destination(dst)?,
                next_source(src0)?,
                next_source(src1)?,
                next_source(src2)?,
            ),
        ))?;
        Ok(index)
    }

    /// Extended math
    ///
    /// Integer division functions take integer operands and are emitted as
    /// two SIMD8 halves at SIMD16; every other function takes floats.
    pub fn math(
        &mut self,
        function: MathFunction,
        dst: Destination,
        src0: Source,
        src1: Option<Source>,
    ) -> Result<usize> {
        let integer = matches!(
            function,
            MathFunction::IntDivQuotient | MathFunction::IntDivRemainder | MathFunction::IntDivQuotientAndRemainder
        );
        for src in std::iter::once(&src0).chain(src1.as_ref()) {
            if src.ty().is_float() == integer {
                return Err(IsaError::unsupported(
                    Opcode::Math,
                    format!("{} does not take {} operands", function.name(), src.ty().suffix()),
                ));
            }
        }

        let header = self.header(Opcode::Math)?;
        let src0 = self.fit_source(src0);
        let src1 = src1.map(|src| self.fit_source(src));
        let split = self.curr.exec_width == 16
            && matches!(function, MathFunction::IntDivQuotient | MathFunction::IntDivRemainder);
        if !split {
            return self.emit(Instruction::new(
                header,
                Body::Math {
                    function,
                    dst,
                    src0,
                    src1,
                },
            ));
        }

        let (first, second) = split_header(header);
        let index = self.emit(Instruction::new(
            first,
            Body::Math {
                function,
                dst,
                src0,
                src1,
            },
        ))?;
        let next = |src: Source| match src {
            Source::Register(reg) => next_source(reg).map(Source::Register),
            imm => Ok(imm),
        };
        self.emit(Instruction::new(
            second,
            Body::Math {
                function,
                dst: next_destination(dst)?,
                src0: next(src0)?,
                src1: src1.map(next).transpose()?,
            },
        ))?;
        Ok(index)
    }

    /// Indirect jump by `offset` bytes relative to `ip`
    pub fn jmpi(&mut self, offset: i32) -> Result<usize> {
        let mut header = self.header(Opcode::Jmpi)?;
        header.exec_size = ExecSize::S1;
        header.mask_control = MaskControl::Disable;
        self.emit(Instruction::new(header, Body::Branch(Branch::Jump { offset })))
    }

    /// Structured control flow (`if`, `else`, `endif`, `while`, `brc`, ...)
    /// with its join and update offsets
    pub fn branch(&mut self, opcode: Opcode, jip: i16, uip: i16) -> Result<usize> {
        if opcode.class() != OpcodeClass::RelativeBranch {
            return Err(IsaError::unsupported(opcode, "not a structured branch"));
        }
        let header = self.header(opcode)?;
        self.emit(Instruction::new(header, Body::Branch(Branch::Relative { jip, uip })))
    }

    pub fn nop(&mut self) -> Result<usize> {
        let header = Header::new(Opcode::Nop, ExecSize::S1);
        self.emit(Instruction::new(header, Body::Empty))
    }

    // ============================================================================
    // Send helpers
    // ============================================================================

    /// Emit a `send` with the current state
    pub fn send(&mut self, dst: Destination, src0: RegisterSource, descriptor: MessageDescriptor) -> Result<usize> {
        let header = self.header(Opcode::Send)?;
        self.emit(Instruction::new(header, Body::Send { dst, src0, descriptor }))
    }

    /// Execution width of a data port message; only SIMD8 and SIMD16 have
    /// a payload layout
    fn message_width(&self, what: &str) -> Result<u32> {
        match self.curr.exec_width {
            8 | 16 => Ok(self.curr.exec_width),
            other => Err(IsaError::unsupported(
                Opcode::Send,
                format!("{what} has no SIMD{other} form"),
            )),
        }
    }

    /// Number of registers one dword per lane occupies
    fn lane_registers(width: u32) -> u8 {
        if width == 16 {
            2
        } else {
            1
        }
    }

    /// Untyped surface read of `elements` consecutive dwords per lane
    ///
    /// # Parameters
    ///
    /// - `dst`: first response register
    /// - `src`: address payload register (one dword offset per lane)
    /// - `bti`: binding table index of the surface
    /// - `elements`: channels read per lane, 1 to 4
    ///
    /// # Generated Pattern
    ///
    /// ```text
    /// send(8)  g<dst><1>:UW  g<src><8,8,1>:UD  data untyped_read  mlen 1  rlen elements
    /// send(16) g<dst><1>:UW  g<src><8,8,1>:UD  data untyped_read  mlen 2  rlen 2*elements
    /// ```
    pub fn untyped_read(&mut self, dst: u8, src: u8, bti: u8, elements: u32) -> Result<usize> {
        let width = self.message_width("untyped_read")?;
        let rgba = untyped_mask(elements)?;
        let regs = Self::lane_registers(width);
        let message = Message::Untyped {
            bti,
            rgba,
            simd_mode: untyped_simd_mode(width),
            msg_type: DataPortMessage::UntypedRead,
        };
        let descriptor = MessageDescriptor::new(message, regs, regs * elements as u8);
        self.send(Destination::grf(dst, RegType::UW), payload(src), descriptor)
    }

    /// Untyped surface write; the payload holds the addresses followed by
    /// `elements` data channels
    pub fn untyped_write(&mut self, msg: u8, bti: u8, elements: u32) -> Result<usize> {
        let width = self.message_width("untyped_write")?;
        let rgba = untyped_mask(elements)?;
        let regs = Self::lane_registers(width);
        let message = Message::Untyped {
            bti,
            rgba,
            simd_mode: untyped_simd_mode(width),
            msg_type: DataPortMessage::UntypedWrite,
        };
        let descriptor = MessageDescriptor::new(message, regs * (1 + elements as u8), 0);
        self.send(Destination::null(), payload(msg), descriptor)
    }

    /// Gather one byte, word or dword per lane
    pub fn byte_gather(&mut self, dst: u8, src: u8, bti: u8, elem_size: u32) -> Result<usize> {
        let width = self.message_width("byte_gather")?;
        let regs = Self::lane_registers(width);
        let message = Message::Byte {
            bti,
            simd_mode: byte_simd_mode(width),
            data_size: ByteScatterSize::from_bytes(elem_size)?,
            msg_type: DataPortMessage::ByteGather,
        };
        let descriptor = MessageDescriptor::new(message, regs, regs);
        self.send(Destination::grf(dst, RegType::UW), payload(src), descriptor)
    }

    /// Scatter one byte, word or dword per lane; payload is addresses then data
    pub fn byte_scatter(&mut self, msg: u8, bti: u8, elem_size: u32) -> Result<usize> {
        let width = self.message_width("byte_scatter")?;
        let regs = Self::lane_registers(width);
        let message = Message::Byte {
            bti,
            simd_mode: byte_simd_mode(width),
            data_size: ByteScatterSize::from_bytes(elem_size)?,
            msg_type: DataPortMessage::ByteScatter,
        };
        let descriptor = MessageDescriptor::new(message, 2 * regs, 0);
        self.send(Destination::null(), payload(msg), descriptor)
    }

    /// Gather one dword per lane through the constant cache, or through the
    /// data cache when the configuration asks for it
    pub fn dword_gather(&mut self, dst: u8, src: u8, bti: u8) -> Result<usize> {
        let width = self.message_width("dword_gather")?;
        let regs = Self::lane_registers(width);
        let port = if self.config.dword_gather_via_data_cache {
            DwordPort::DataCache
        } else {
            DwordPort::Constant
        };
        let message = Message::Dword {
            port,
            bti,
            block_size: if width == 16 { 3 } else { 2 },
            invalidate_after_read: false,
            msg_type: DataPortMessage::DwordGather,
        };
        let descriptor = MessageDescriptor::new(message, regs, regs);
        self.send(Destination::grf(dst, RegType::UW), payload(src), descriptor)
    }

    /// Untyped atomic returning the previous value of each lane
    ///
    /// The payload carries the address and the operands `op` needs.
    pub fn atomic(&mut self, dst: u8, op: AtomicOp, src: u8, bti: u8) -> Result<usize> {
        let width = self.message_width("atomic")?;
        let regs = Self::lane_registers(width);
        let sources = 1 + op.source_count() as u8;
        let message = Message::Atomic {
            bti,
            op,
            simd_mode: if width == 16 {
                AtomicSimdMode::Simd16
            } else {
                AtomicSimdMode::Simd8
            },
            return_data: true,
        };
        let descriptor = MessageDescriptor::new(message, regs * sources, regs);
        self.send(Destination::grf(dst, RegType::UD), payload(src), descriptor)
    }

    /// Block read of `owords` 16-byte units addressed by a message header
    pub fn oblock_read(&mut self, dst: u8, header: u8, bti: u8, owords: u32) -> Result<usize> {
        let message = Message::OBlock {
            bti,
            block_size: oblock_size(owords)?,
            invalidate_after_read: false,
            msg_type: DataPortMessage::OBlockRead,
        };
        let response = (owords / 2).max(1) as u8;
        let descriptor = MessageDescriptor::new(message, 1, response).with_header();
        self.send(Destination::grf(dst, RegType::UW), payload(header), descriptor)
    }

    /// Block write; the header register is followed by the data registers
    pub fn oblock_write(&mut self, header: u8, bti: u8, owords: u32) -> Result<usize> {
        let message = Message::OBlock {
            bti,
            block_size: oblock_size(owords)?,
            invalidate_after_read: false,
            msg_type: DataPortMessage::OBlockWrite,
        };
        let data = (owords / 2).max(1) as u8;
        let descriptor = MessageDescriptor::new(message, 1 + data, 0).with_header();
        self.send(Destination::null().retype(RegType::UW), payload(header), descriptor)
    }

    /// Typed surface write of four channels for eight lanes
    pub fn typed_write(&mut self, msg: u8, bti: u8, header_present: bool) -> Result<usize> {
        let message = Message::Typed {
            bti,
            channel_mask: 0,
            slot: 1,
            msg_type: TypedMessage::TypedWrite,
        };
        let mut descriptor = MessageDescriptor::new(message, if header_present { 9 } else { 8 }, 0);
        descriptor.header_present = header_present;
        self.send(Destination::null(), payload(msg), descriptor)
    }

    /// Spill `registers` (1 or 2) GRFs to scratch at byte `offset`
    pub fn scratch_write(&mut self, msg: u8, offset: u32, registers: u8, dword_channels: bool) -> Result<usize> {
        let message = scratch_message(offset, registers, dword_channels, true)?;
        let descriptor = MessageDescriptor::new(message, registers + 1, 0).with_header();
        self.send(Destination::null(), payload(msg), descriptor)
    }

    /// Fill `registers` (1 or 2) GRFs from scratch at byte `offset`
    pub fn scratch_read(
        &mut self,
        dst: u8,
        src: u8,
        offset: u32,
        registers: u8,
        dword_channels: bool,
    ) -> Result<usize> {
        let message = scratch_message(offset, registers, dword_channels, false)?;
        let descriptor = MessageDescriptor::new(message, 1, registers).with_header();
        self.send(Destination::grf(dst, RegType::UD), payload(src), descriptor)
    }

    /// Memory fence; the response register is written when the fence commits
    pub fn fence(&mut self, dst: u8) -> Result<usize> {
        let message = Message::MemoryFence {
            bti: 0,
            commit_enable: true,
        };
        let descriptor = MessageDescriptor::new(message, 1, 1).with_header();
        self.send(Destination::grf(dst, RegType::UD), payload(dst), descriptor)
    }

    /// Thread group barrier through the message gateway
    pub fn barrier(&mut self, src: u8) -> Result<usize> {
        let message = Message::Gateway {
            function: GatewayFunction::BarrierMessage,
            ack_req: false,
            notify: 1,
        };
        let descriptor = MessageDescriptor::new(message, 1, 0);
        self.send(Destination::null(), payload(src), descriptor)
    }

    /// Sampler message
    ///
    /// `msg_len` is the payload size per SIMD8 half; one header register is
    /// added when `header_present` is set. Four channels come back per
    /// SIMD8 half.
    pub fn sample(
        &mut self,
        dst: u8,
        msg: u8,
        msg_len: u8,
        header_present: bool,
        bti: u8,
        sampler: u8,
        msg_type: u8,
    ) -> Result<usize> {
        let width = self.message_width("sample")?;
        let halves = (width / 8) as u8;
        let message = Message::Sampler {
            bti,
            sampler,
            msg_type,
            simd_mode: if width == 16 {
                SamplerSimdMode::Simd16
            } else {
                SamplerSimdMode::Simd8
            },
        };
        let mut descriptor = MessageDescriptor::new(message, msg_len * halves + u8::from(header_present), 4 * halves);
        descriptor.header_present = header_present;
        self.send(Destination::grf(dst, RegType::UW), payload(msg), descriptor)
    }

    /// End the thread; `msg` holds the thread payload header
    pub fn eot(&mut self, msg: u8) -> Result<usize> {
        let mut header = self.header(Opcode::Send)?;
        header.exec_size = ExecSize::S8;
        // resource bit set: the URB handle is not dereferenced
        let message = Message::Spawner {
            dereference_urb: false,
            child_thread: false,
            release_resource: true,
        };
        let descriptor = MessageDescriptor::new(message, 1, 0).with_end_of_thread();
        self.emit(Instruction::new(
            header,
            Body::Send {
                dst: Destination::null(),
                src0: payload(msg),
                descriptor,
            },
        ))
    }
}

/// `<8;8,1>:UD` payload register
fn payload(nr: u8) -> RegisterSource {
    RegisterSource::grf(nr, RegType::UD, Region::VEC8)
}

fn untyped_mask(elements: u32) -> Result<u8> {
    match elements {
        1..=4 => Ok(UNTYPED_RW_MASK[elements as usize]),
        _ => Err(IsaError::unsupported(
            Opcode::Send,
            format!("untyped messages carry 1 to 4 channels, not {elements}"),
        )),
    }
}

fn untyped_simd_mode(width: u32) -> UntypedSimdMode {
    if width == 16 {
        UntypedSimdMode::Simd16
    } else {
        UntypedSimdMode::Simd8
    }
}

fn byte_simd_mode(width: u32) -> ByteSimdMode {
    if width == 16 {
        ByteSimdMode::Simd16
    } else {
        ByteSimdMode::Simd8
    }
}

fn oblock_size(owords: u32) -> Result<u8> {
    match owords {
        1 => Ok(0),
        2 => Ok(2),
        4 => Ok(3),
        8 => Ok(4),
        _ => Err(IsaError::unsupported(Opcode::Send, format!("block of {owords} owords"))),
    }
}

fn scratch_message(offset: u32, registers: u8, dword_channels: bool, write: bool) -> Result<Message> {
    let block_size = match registers {
        1 => 0,
        2 => 1,
        _ => {
            return Err(IsaError::unsupported(
                Opcode::Send,
                format!("scratch blocks of {registers} registers"),
            ))
        }
    };
    if offset % GRF_BYTES != 0 {
        return Err(IsaError::unsupported(
            Opcode::Send,
            format!("scratch offset {offset} is not register aligned"),
        ));
    }
    let units = offset / GRF_BYTES;
    let offset = u16::try_from(units).map_err(|_| IsaError::FieldOutOfRange {
        field: "scratch.offset",
        value: i64::from(units),
        bits: 12,
    })?;
    Ok(Message::Scratch {
        offset,
        block_size,
        invalidate_after_read: false,
        dword_channels,
        write,
    })
}

/// Q1/Q2 SIMD8 headers for an instruction emitted as two halves
fn split_header(header: Header) -> (Header, Header) {
    let mut first = header;
    first.exec_size = ExecSize::S8;
    first.quarter_control = QuarterControl::Q1;
    let mut second = first;
    second.quarter_control = QuarterControl::Q2;
    (first, second)
}

fn next_register(nr: u8, field: &'static str) -> Result<u8> {
    nr.checked_add(1).ok_or(IsaError::FieldOutOfRange {
        field,
        value: i64::from(nr) + 1,
        bits: 8,
    })
}

/// The register holding lanes 8..15 of a SIMD16 destination
fn next_destination(mut dst: Destination) -> Result<Destination> {
    dst.location = match dst.location {
        Location::Direct { nr, subnr } => Location::Direct {
            nr: next_register(nr, "dst.nr")?,
            subnr,
        },
        Location::Indirect { addr_subnr, offset } => Location::Indirect {
            addr_subnr,
            offset: offset + GRF_BYTES as i16,
        },
    };
    Ok(dst)
}

/// The register holding lanes 8..15 of a SIMD16 source; scalars stay put
fn next_source(mut src: RegisterSource) -> Result<RegisterSource> {
    if src.region.is_scalar() {
        return Ok(src);
    }
    src.location = match src.location {
        Location::Direct { nr, subnr } => Location::Direct {
            nr: next_register(nr, "src.nr")?,
            subnr,
        },
        Location::Indirect { addr_subnr, offset } => Location::Indirect {
            addr_subnr,
            offset: offset + GRF_BYTES as i16,
        },
    };
    Ok(src)
}

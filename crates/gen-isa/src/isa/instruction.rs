//! Logical instructions and their bit-exact mapping onto [`InstructionWord`]
//!
//! An [`Instruction`] is a [`Header`] plus a [`Body`]. The body is a tagged
//! union over the overlapping layouts of dwords 1 to 3; which variant is
//! legal is fixed by the opcode class, so an instruction whose body does not
//! match its opcode is rejected instead of producing a half-valid word.

use super::defs::{
    AccessMode, ConditionalModifier, DependencyControl, ExecSize, MaskControl, MathFunction, Opcode, OpcodeClass,
    PredicateControl, QuarterControl, RegFile, RegType, SharedFunction, ThreadControl,
};
use super::layout::{self, header, three_src};
use super::message::MessageDescriptor;
use super::operand::{
    check_immediate, decode_destination, decode_register_source, encode_destination, encode_register_source,
    Destination, Location, Region, RegisterSource, Source, Swizzle,
};
use super::word::InstructionWord;
use crate::error::{IsaError, Result};

/// Flag register `f<nr>.<subnr>` used for predication and condition results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FlagRegister {
    pub nr: u8,
    pub subnr: u8,
}

impl FlagRegister {
    pub const fn new(nr: u8, subnr: u8) -> Self {
        Self { nr, subnr }
    }
}

/// Controls shared by every instruction (dword 0 plus the flag selection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Header {
    pub opcode: Opcode,
    pub access_mode: AccessMode,
    pub mask_control: MaskControl,
    pub dependency_control: DependencyControl,
    pub quarter_control: QuarterControl,
    pub thread_control: ThreadControl,
    pub predicate: PredicateControl,
    pub predicate_inverse: bool,
    pub flag: FlagRegister,
    pub exec_size: ExecSize,
    pub acc_write: bool,
    pub debug: bool,
    pub saturate: bool,
}

impl Header {
    /// Align1, unpredicated, masked header
    pub const fn new(opcode: Opcode, exec_size: ExecSize) -> Self {
        Self {
            opcode,
            access_mode: AccessMode::Align1,
            mask_control: MaskControl::Enable,
            dependency_control: DependencyControl::None,
            quarter_control: QuarterControl::Q1,
            thread_control: ThreadControl::Normal,
            predicate: PredicateControl::None,
            predicate_inverse: false,
            flag: FlagRegister::new(0, 0),
            exec_size,
            acc_write: false,
            debug: false,
            saturate: false,
        }
    }

    pub const fn align16(mut self) -> Self {
        self.access_mode = AccessMode::Align16;
        self
    }

    pub const fn no_mask(mut self) -> Self {
        self.mask_control = MaskControl::Disable;
        self
    }

    pub const fn predicated(mut self, flag: FlagRegister, inverse: bool) -> Self {
        self.predicate = PredicateControl::Normal;
        self.predicate_inverse = inverse;
        self.flag = flag;
        self
    }

    pub const fn saturated(mut self) -> Self {
        self.saturate = true;
        self
    }

    pub const fn quarter(mut self, quarter: QuarterControl) -> Self {
        self.quarter_control = quarter;
        self
    }

    fn encode(&self, word: &mut InstructionWord) -> Result<()> {
        word.set(header::OPCODE, self.opcode.bits())?;
        word.set(header::ACCESS_MODE, self.access_mode.bits())?;
        word.set(header::MASK_CONTROL, self.mask_control.bits())?;
        word.set(header::DEPENDENCY_CONTROL, self.dependency_control.bits())?;
        word.set(header::QUARTER_CONTROL, self.quarter_control.bits())?;
        word.set(header::THREAD_CONTROL, self.thread_control.bits())?;
        word.set(header::PREDICATE_CONTROL, self.predicate.bits())?;
        word.set_bool(header::PREDICATE_INVERSE, self.predicate_inverse)?;
        word.set(header::EXECUTION_SIZE, self.exec_size.bits())?;
        word.set_bool(header::ACC_WR_CONTROL, self.acc_write)?;
        word.set_bool(header::DEBUG_CONTROL, self.debug)?;
        word.set_bool(header::SATURATE, self.saturate)?;

        if self.opcode.class() == OpcodeClass::Alu3 {
            if self.flag.nr != 0 {
                return Err(IsaError::unsupported(self.opcode, "three-source instructions can only use flag f0"));
            }
            word.set(three_src::FLAG_SUBREG_NR, u32::from(self.flag.subnr))?;
        } else {
            word.set(layout::flag::REG_NR, u32::from(self.flag.nr))?;
            word.set(layout::flag::SUBREG_NR, u32::from(self.flag.subnr))?;
        }
        Ok(())
    }

    fn decode(word: &InstructionWord) -> Result<Self> {
        let opcode = Opcode::decode(word.get(header::OPCODE))?;
        let flag = if opcode.class() == OpcodeClass::Alu3 {
            FlagRegister::new(0, word.get(three_src::FLAG_SUBREG_NR) as u8)
        } else {
            FlagRegister::new(
                word.get(layout::flag::REG_NR) as u8,
                word.get(layout::flag::SUBREG_NR) as u8,
            )
        };
        Ok(Self {
            opcode,
            access_mode: AccessMode::from_bits(word.get(header::ACCESS_MODE))?,
            mask_control: MaskControl::from_bits(word.get(header::MASK_CONTROL))?,
            dependency_control: DependencyControl::from_bits(word.get(header::DEPENDENCY_CONTROL))?,
            quarter_control: QuarterControl::from_bits(word.get(header::QUARTER_CONTROL))?,
            thread_control: ThreadControl::from_bits(word.get(header::THREAD_CONTROL))?,
            predicate: PredicateControl::from_bits(word.get(header::PREDICATE_CONTROL))?,
            predicate_inverse: word.get_bool(header::PREDICATE_INVERSE),
            flag,
            exec_size: ExecSize::from_bits(word.get(header::EXECUTION_SIZE))?,
            acc_write: word.get_bool(header::ACC_WR_CONTROL),
            debug: word.get_bool(header::DEBUG_CONTROL),
            saturate: word.get_bool(header::SATURATE),
        })
    }
}

/// Branch target forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Branch {
    /// `jmpi`: signed byte offset added to `ip`
    Jump { offset: i32 },
    /// Structured control flow: join and update offsets
    Relative { jip: i16, uip: i16 },
}

/// Operand payload; the live variant is selected by [`Opcode::class`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Body {
    Alu {
        cond: ConditionalModifier,
        dst: Destination,
        src0: Source,
        src1: Option<Source>,
    },
    Math {
        function: MathFunction,
        dst: Destination,
        src0: Source,
        src1: Option<Source>,
    },
    Alu3 {
        cond: ConditionalModifier,
        dst: Destination,
        src0: RegisterSource,
        src1: RegisterSource,
        src2: RegisterSource,
    },
    Branch(Branch),
    Send {
        dst: Destination,
        src0: RegisterSource,
        descriptor: MessageDescriptor,
    },
    Empty,
}

/// One logical machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Instruction {
    pub header: Header,
    pub body: Body,
}

impl Instruction {
    pub const fn new(header: Header, body: Body) -> Self {
        Self { header, body }
    }

    pub fn opcode(&self) -> Opcode {
        self.header.opcode
    }

    /// Pack into a 128-bit word. Unused bits are zero.
    ///
    /// # Errors
    ///
    /// - `UnsupportedEncoding` when the body does not fit the opcode class or
    ///   an operand combination has no layout
    /// - `FieldOutOfRange` when a register number, offset or length does not
    ///   fit its field
    pub fn encode(&self) -> Result<InstructionWord> {
        let mut word = InstructionWord::default();
        let opcode = self.header.opcode;
        let mode = self.header.access_mode;
        self.header.encode(&mut word)?;

        match (opcode.class(), &self.body) {
            (OpcodeClass::Alu1, Body::Alu { cond, dst, src0, src1: None })
            | (OpcodeClass::Alu2, Body::Alu { cond, dst, src0, src1: Some(_) }) => {
                word.set(header::DESTREG_OR_CONDMOD, cond.bits())?;
                encode_dst_and_sources(&mut word, opcode, mode, dst, src0, self.sources1())?;
            }
            (OpcodeClass::Math, Body::Math { function, dst, src0, src1 }) => {
                if function.is_binary() != src1.is_some() {
                    return Err(IsaError::unsupported(
                        opcode,
                        format!("{} takes {} sources", function.name(), 1 + u8::from(function.is_binary())),
                    ));
                }
                word.set(header::DESTREG_OR_CONDMOD, function.bits())?;
                encode_dst_and_sources(&mut word, opcode, mode, dst, src0, src1.as_ref())?;
            }
            (OpcodeClass::Alu3, Body::Alu3 { cond, dst, src0, src1, src2 }) => {
                if mode != AccessMode::Align16 {
                    return Err(IsaError::unsupported(opcode, "three-source instructions require align16"));
                }
                word.set(header::DESTREG_OR_CONDMOD, cond.bits())?;
                encode_three_source(&mut word, opcode, dst, [src0, src1, src2])?;
            }
            (OpcodeClass::Jump, Body::Branch(Branch::Jump { offset })) => {
                let ip = Source::Register(RegisterSource::arf(
                    super::operand::arf::IP,
                    RegType::UD,
                    Region::SCALAR,
                ));
                encode_dst_and_sources(
                    &mut word,
                    opcode,
                    AccessMode::Align1,
                    &Destination::ip(),
                    &ip,
                    Some(&Source::imm_d(*offset)),
                )?;
            }
            (OpcodeClass::RelativeBranch, Body::Branch(Branch::Relative { jip, uip })) => {
                encode_destination(&mut word, &Destination::null(), mode)?;
                word.set(layout::types::SRC0_FILE, RegFile::Arf.bits())?;
                word.set(layout::types::SRC0_TYPE, RegType::UD.bits())?;
                encode_register_source(&mut word, &layout::SRC0, &RegisterSource::null(), mode)?;
                word.set(layout::types::SRC1_FILE, RegFile::Imm.bits())?;
                word.set(layout::types::SRC1_TYPE, RegType::D.bits())?;
                word.set(layout::branch::JIP, u32::from(*jip as u16))?;
                word.set(layout::branch::UIP, u32::from(*uip as u16))?;
            }
            (OpcodeClass::Send, Body::Send { dst, src0, descriptor }) => {
                word.set(header::DESTREG_OR_CONDMOD, descriptor.shared_function().bits())?;
                encode_destination(&mut word, dst, mode)?;
                word.set(layout::types::SRC0_FILE, src0.file.bits())?;
                word.set(layout::types::SRC0_TYPE, src0.ty.bits())?;
                encode_register_source(&mut word, &layout::SRC0, src0, mode)?;
                word.set(layout::types::SRC1_FILE, RegFile::Imm.bits())?;
                word.set(layout::types::SRC1_TYPE, RegType::UD.bits())?;
                descriptor.encode(&mut word)?;
            }
            (OpcodeClass::Nop, Body::Empty) => {}
            (class, body) => {
                return Err(IsaError::unsupported(
                    opcode,
                    format!("{class:?} opcode cannot carry {}", body_kind(body)),
                ))
            }
        }

        Ok(word)
    }

    fn sources1(&self) -> Option<&Source> {
        match &self.body {
            Body::Alu { src1, .. } | Body::Math { src1, .. } => src1.as_ref(),
            _ => None,
        }
    }

    /// Rebuild the logical instruction from a word
    ///
    /// # Errors
    ///
    /// `UnknownOpcode`, `InvalidFieldValue` for undefined field patterns, and
    /// `UnsupportedEncoding` for compacted words or send descriptors with no
    /// known layout.
    pub fn decode(word: &InstructionWord) -> Result<Self> {
        if word.get_bool(header::CMPT_CONTROL) {
            return Err(IsaError::unsupported(
                "compacted",
                "compacted 64-bit encodings must be expanded before decoding",
            ));
        }
        let header = Header::decode(word)?;
        let opcode = header.opcode;
        let mode = header.access_mode;
        let condmod = word.get(header::DESTREG_OR_CONDMOD);

        let body = match opcode.class() {
            OpcodeClass::Alu1 | OpcodeClass::Alu2 => {
                let (dst, src0, src1) = decode_dst_and_sources(word, opcode, mode, opcode.class() == OpcodeClass::Alu2)?;
                Body::Alu {
                    cond: ConditionalModifier::from_bits(condmod)?,
                    dst,
                    src0,
                    src1,
                }
            }
            OpcodeClass::Math => {
                let function = MathFunction::from_bits(condmod)?;
                let (dst, src0, src1) = decode_dst_and_sources(word, opcode, mode, function.is_binary())?;
                Body::Math {
                    function,
                    dst,
                    src0,
                    src1,
                }
            }
            OpcodeClass::Alu3 => {
                let (dst, [src0, src1, src2]) = decode_three_source(word)?;
                Body::Alu3 {
                    cond: ConditionalModifier::from_bits(condmod)?,
                    dst,
                    src0,
                    src1,
                    src2,
                }
            }
            OpcodeClass::Jump => Body::Branch(Branch::Jump {
                offset: word.get(layout::IMMEDIATE) as i32,
            }),
            OpcodeClass::RelativeBranch => Body::Branch(Branch::Relative {
                jip: word.get(layout::branch::JIP) as u16 as i16,
                uip: word.get(layout::branch::UIP) as u16 as i16,
            }),
            OpcodeClass::Send => {
                if word.get(layout::types::SRC1_FILE) != RegFile::Imm.bits() {
                    return Err(IsaError::unsupported(opcode, "register message descriptors are not supported"));
                }
                let sfid = SharedFunction::from_bits(condmod)?;
                let dst = decode_destination(word, mode)?;
                let src0 = decode_register_source(
                    word,
                    &layout::SRC0,
                    RegFile::from_bits(word.get(layout::types::SRC0_FILE))?,
                    RegType::from_bits(word.get(layout::types::SRC0_TYPE))?,
                    mode,
                )?;
                Body::Send {
                    dst,
                    src0,
                    descriptor: MessageDescriptor::decode(word, sfid)?,
                }
            }
            OpcodeClass::Nop => Body::Empty,
        };

        Ok(Self { header, body })
    }
}

fn body_kind(body: &Body) -> &'static str {
    match body {
        Body::Alu { src1: None, .. } => "a one-source ALU body",
        Body::Alu { src1: Some(_), .. } => "a two-source ALU body",
        Body::Math { .. } => "a math body",
        Body::Alu3 { .. } => "a three-source body",
        Body::Branch(Branch::Jump { .. }) => "a jump target",
        Body::Branch(Branch::Relative { .. }) => "jip/uip targets",
        Body::Send { .. } => "a message descriptor",
        Body::Empty => "no operands",
    }
}

fn encode_dst_and_sources(
    word: &mut InstructionWord,
    opcode: Opcode,
    mode: AccessMode,
    dst: &Destination,
    src0: &Source,
    src1: Option<&Source>,
) -> Result<()> {
    encode_destination(word, dst, mode)?;

    word.set(layout::types::SRC0_FILE, src0.file().bits())?;
    word.set(layout::types::SRC0_TYPE, src0.ty().bits())?;
    match src0 {
        Source::Register(reg) => encode_register_source(word, &layout::SRC0, reg, mode)?,
        Source::Immediate { ty, bits } => {
            if src1.is_some() {
                return Err(IsaError::unsupported(opcode, "only the last source may be an immediate"));
            }
            check_immediate(*ty)?;
            word.set(layout::IMMEDIATE, *bits)?;
        }
    }

    if let Some(src1) = src1 {
        word.set(layout::types::SRC1_FILE, src1.file().bits())?;
        word.set(layout::types::SRC1_TYPE, src1.ty().bits())?;
        match src1 {
            Source::Register(reg) => encode_register_source(word, &layout::SRC1, reg, mode)?,
            Source::Immediate { ty, bits } => {
                check_immediate(*ty)?;
                word.set(layout::IMMEDIATE, *bits)?;
            }
        }
    }
    Ok(())
}

fn decode_source(
    word: &InstructionWord,
    fields: &layout::SourceFields,
    file_field: super::word::Field,
    type_field: super::word::Field,
    mode: AccessMode,
) -> Result<Source> {
    let file = RegFile::from_bits(word.get(file_field))?;
    let ty = RegType::from_bits(word.get(type_field))?;
    if file == RegFile::Imm {
        return Ok(Source::Immediate {
            ty,
            bits: word.get(layout::IMMEDIATE),
        });
    }
    Ok(Source::Register(decode_register_source(word, fields, file, ty, mode)?))
}

fn decode_dst_and_sources(
    word: &InstructionWord,
    opcode: Opcode,
    mode: AccessMode,
    two_sources: bool,
) -> Result<(Destination, Source, Option<Source>)> {
    let dst = decode_destination(word, mode)?;
    let src0 = decode_source(word, &layout::SRC0, layout::types::SRC0_FILE, layout::types::SRC0_TYPE, mode)?;
    if !two_sources {
        return Ok((dst, src0, None));
    }
    if matches!(src0, Source::Immediate { .. }) {
        return Err(IsaError::unsupported(opcode, "only the last source may be an immediate"));
    }
    let src1 = decode_source(word, &layout::SRC1, layout::types::SRC1_FILE, layout::types::SRC1_TYPE, mode)?;
    Ok((dst, src0, Some(src1)))
}

fn check_three_source_operand(
    opcode: Opcode,
    file: RegFile,
    ty: RegType,
    location: &Location,
    what: &str,
) -> Result<(u8, u8)> {
    if ty != RegType::F {
        return Err(IsaError::unsupported(opcode, format!("{what} must be a float operand")));
    }
    match location {
        Location::Direct { nr, subnr } if file == RegFile::Grf || (what == "dst" && file == RegFile::Mrf) => {
            if subnr % 4 != 0 {
                return Err(IsaError::unsupported(opcode, format!("{what} subregister must be dword aligned")));
            }
            Ok((*nr, *subnr / 4))
        }
        _ => Err(IsaError::unsupported(
            opcode,
            format!("{what} must be a directly addressed general register"),
        )),
    }
}

fn encode_three_source(
    word: &mut InstructionWord,
    opcode: Opcode,
    dst: &Destination,
    srcs: [&RegisterSource; 3],
) -> Result<()> {
    let (nr, subnr) = check_three_source_operand(opcode, dst.file, dst.ty, &dst.location, "dst")?;
    word.set_bool(three_src::DST_FILE, dst.file == RegFile::Mrf)?;
    word.set(three_src::DST_REG_NR, u32::from(nr))?;
    word.set(three_src::DST_SUBREG_NR, u32::from(subnr))?;
    word.set(three_src::DST_WRITEMASK, u32::from(dst.writemask))?;

    let [src0, src1, src2] = srcs;
    let (nr0, sub0) = check_three_source_operand(opcode, src0.file, src0.ty, &src0.location, "src0")?;
    let (nr1, sub1) = check_three_source_operand(opcode, src1.file, src1.ty, &src1.location, "src1")?;
    let (nr2, sub2) = check_three_source_operand(opcode, src2.file, src2.ty, &src2.location, "src2")?;

    word.set_bool(three_src::SRC0_ABS, src0.abs)?;
    word.set_bool(three_src::SRC0_NEGATE, src0.negate)?;
    word.set_bool(three_src::SRC0_REP_CTRL, src0.region.is_scalar())?;
    word.set(three_src::SRC0_SWIZZLE, src0.swizzle.packed())?;
    word.set(three_src::SRC0_REG_NR, u32::from(nr0))?;
    word.set(three_src::SRC0_SUBREG_NR, u32::from(sub0))?;

    word.set_bool(three_src::SRC1_ABS, src1.abs)?;
    word.set_bool(three_src::SRC1_NEGATE, src1.negate)?;
    word.set_bool(three_src::SRC1_REP_CTRL, src1.region.is_scalar())?;
    word.set(three_src::SRC1_SWIZZLE, src1.swizzle.packed())?;
    word.set(three_src::SRC1_REG_NR, u32::from(nr1))?;
    word.set(three_src::SRC1_SUBREG_NR_LOW, u32::from(sub1 & 0x3))?;
    word.set(three_src::SRC1_SUBREG_NR_HIGH, u32::from(sub1 >> 2))?;

    word.set_bool(three_src::SRC2_ABS, src2.abs)?;
    word.set_bool(three_src::SRC2_NEGATE, src2.negate)?;
    word.set_bool(three_src::SRC2_REP_CTRL, src2.region.is_scalar())?;
    word.set(three_src::SRC2_SWIZZLE, src2.swizzle.packed())?;
    word.set(three_src::SRC2_REG_NR, u32::from(nr2))?;
    word.set(three_src::SRC2_SUBREG_NR, u32::from(sub2))?;
    Ok(())
}

fn three_source_operand(nr: u32, subnr: u32, rep_ctrl: bool, swizzle: u32, abs: bool, negate: bool) -> RegisterSource {
    let region = if rep_ctrl { Region::SCALAR } else { Region::VEC4 };
    RegisterSource {
        file: RegFile::Grf,
        ty: RegType::F,
        location: Location::Direct {
            nr: nr as u8,
            subnr: (subnr * 4) as u8,
        },
        region,
        swizzle: Swizzle::from_packed(swizzle),
        abs,
        negate,
    }
}

fn decode_three_source(word: &InstructionWord) -> Result<(Destination, [RegisterSource; 3])> {
    let dst = Destination {
        file: if word.get_bool(three_src::DST_FILE) {
            RegFile::Mrf
        } else {
            RegFile::Grf
        },
        ty: RegType::F,
        location: Location::Direct {
            nr: word.get(three_src::DST_REG_NR) as u8,
            subnr: (word.get(three_src::DST_SUBREG_NR) * 4) as u8,
        },
        hstride: super::defs::HorizontalStride::One,
        writemask: word.get(three_src::DST_WRITEMASK) as u8,
    };

    let src0 = three_source_operand(
        word.get(three_src::SRC0_REG_NR),
        word.get(three_src::SRC0_SUBREG_NR),
        word.get_bool(three_src::SRC0_REP_CTRL),
        word.get(three_src::SRC0_SWIZZLE),
        word.get_bool(three_src::SRC0_ABS),
        word.get_bool(three_src::SRC0_NEGATE),
    );
    let src1 = three_source_operand(
        word.get(three_src::SRC1_REG_NR),
        word.get(three_src::SRC1_SUBREG_NR_LOW) | (word.get(three_src::SRC1_SUBREG_NR_HIGH) << 2),
        word.get_bool(three_src::SRC1_REP_CTRL),
        word.get(three_src::SRC1_SWIZZLE),
        word.get_bool(three_src::SRC1_ABS),
        word.get_bool(three_src::SRC1_NEGATE),
    );
    let src2 = three_source_operand(
        word.get(three_src::SRC2_REG_NR),
        word.get(three_src::SRC2_SUBREG_NR),
        word.get_bool(three_src::SRC2_REP_CTRL),
        word.get(three_src::SRC2_SWIZZLE),
        word.get_bool(three_src::SRC2_ABS),
        word.get_bool(three_src::SRC2_NEGATE),
    );
    Ok((dst, [src0, src1, src2]))
}

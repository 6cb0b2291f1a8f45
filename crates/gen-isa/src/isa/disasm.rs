//! Text rendering of decoded instructions
//!
//! The syntax follows the usual Gen assembly conventions:
//!
//! ```text
//! (+f0.0) add(16) g2<1>:F g4<8,8,1>:F g6<8,8,1>:F
//! send(8) g10<1>:UW g2<8,8,1>:UD data untyped_read(bti 1, rgba 0xe, Simd8) mlen 1 rlen 1 { NoMask }
//! ```

use std::fmt;

use super::defs::{
    AccessMode, DependencyControl, MaskControl, PredicateControl, QuarterControl, RegFile, RegType, ThreadControl,
};
use super::instruction::{Body, Branch, Header, Instruction};
use super::operand::{arf, Destination, Location, RegisterSource, Source, Swizzle};
use super::word::InstructionWord;
use crate::error::Result;

/// Decode `word` and render it as assembly text
///
/// ```rust
/// use gen_isa::isa::{disassemble, Body, ConditionalModifier, Destination, ExecSize, Header, Instruction, Opcode, RegType, Source};
///
/// let inst = Instruction::new(
///     Header::new(Opcode::Add, ExecSize::S16),
///     Body::Alu {
///         cond: ConditionalModifier::None,
///         dst: Destination::grf(2, RegType::F),
///         src0: Source::vector(4, RegType::F),
///         src1: Some(Source::imm_f(1.5)),
///     },
/// );
/// let text = disassemble(&inst.encode().unwrap()).unwrap();
/// assert_eq!(text, "add(16) g2<1>:F g4<8,8,1>:F 1.5F");
/// ```
pub fn disassemble(word: &InstructionWord) -> Result<String> {
    Ok(Instruction::decode(word)?.to_string())
}

fn register_name(file: RegFile, location: &Location) -> String {
    let prefix = match file {
        RegFile::Grf => "g",
        RegFile::Mrf => "m",
        RegFile::Arf | RegFile::Imm => "",
    };
    match location {
        Location::Direct { nr, .. } if file == RegFile::Arf => arf_name(*nr),
        Location::Direct { nr, .. } => format!("{prefix}{nr}"),
        Location::Indirect { addr_subnr, offset } => {
            if *offset == 0 {
                format!("{prefix}[a0.{addr_subnr}]")
            } else {
                format!("{prefix}[a0.{addr_subnr}{offset:+}]")
            }
        }
    }
}

fn arf_name(nr: u8) -> String {
    let index = nr & 0x0f;
    match nr & 0xf0 {
        arf::NULL => "null".to_string(),
        arf::ADDRESS => format!("a{index}"),
        arf::ACCUMULATOR => format!("acc{index}"),
        arf::FLAG => format!("f{index}"),
        arf::MASK => format!("mask{index}"),
        arf::STATE => format!("sr{index}"),
        arf::CONTROL => format!("cr{index}"),
        arf::NOTIFICATION_COUNT => format!("n{index}"),
        arf::IP => "ip".to_string(),
        arf::TIMESTAMP => format!("tm{index}"),
        _ => format!("arf{nr:#x}"),
    }
}

fn subregister(location: &Location, ty: RegType, file: RegFile) -> String {
    match location {
        Location::Direct { nr, subnr } if *subnr != 0 && !(file == RegFile::Arf && *nr == arf::NULL) => {
            format!(".{}", u32::from(*subnr) / ty.size_bytes())
        }
        _ => String::new(),
    }
}

fn swizzle_suffix(swizzle: Swizzle) -> String {
    if swizzle == Swizzle::XYZW {
        return String::new();
    }
    let names = ['x', 'y', 'z', 'w'];
    let [x, y, z, w] = swizzle.0;
    if x == y && y == z && z == w {
        return format!(".{}", names[usize::from(x & 3)]);
    }
    let mut out = String::from(".");
    for c in swizzle.0 {
        out.push(names[usize::from(c & 3)]);
    }
    out
}

fn writemask_suffix(mask: u8) -> String {
    if mask == 0xf {
        return String::new();
    }
    let mut out = String::from(".");
    for (bit, name) in ['x', 'y', 'z', 'w'].into_iter().enumerate() {
        if mask & (1 << bit) != 0 {
            out.push(name);
        }
    }
    out
}

struct DstText<'a>(&'a Destination, AccessMode);

impl fmt::Display for DstText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let DstText(dst, mode) = *self;
        write!(
            f,
            "{}{}<{}>",
            register_name(dst.file, &dst.location),
            subregister(&dst.location, dst.ty, dst.file),
            dst.hstride.elements()
        )?;
        if mode == AccessMode::Align16 {
            f.write_str(&writemask_suffix(dst.writemask))?;
        }
        write!(f, ":{}", dst.ty.suffix())
    }
}

struct RegText<'a>(&'a RegisterSource, AccessMode);

impl fmt::Display for RegText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let RegText(src, mode) = *self;
        if src.negate {
            f.write_str("-")?;
        }
        if src.abs {
            f.write_str("(abs)")?;
        }
        write!(
            f,
            "{}{}",
            register_name(src.file, &src.location),
            subregister(&src.location, src.ty, src.file)
        )?;
        let vstride = src.region.vstride.elements().unwrap_or(0);
        match mode {
            AccessMode::Align1 => write!(
                f,
                "<{},{},{}>",
                vstride,
                src.region.width.elements(),
                src.region.hstride.elements()
            )?,
            AccessMode::Align16 => write!(f, "<{}>{}", vstride, swizzle_suffix(src.swizzle))?,
        }
        write!(f, ":{}", src.ty.suffix())
    }
}

struct SrcText<'a>(&'a Source, AccessMode);

impl fmt::Display for SrcText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Source::Register(reg) => RegText(reg, self.1).fmt(f),
            Source::Immediate { ty, bits } => match ty {
                RegType::F => write!(f, "{:?}F", f32::from_bits(*bits)),
                RegType::D => write!(f, "{}D", *bits as i32),
                RegType::W => write!(f, "{}W", *bits as u16 as i16),
                RegType::UW => write!(f, "{}UW", *bits as u16),
                other => write!(f, "{:#x}{}", bits, other.suffix()),
            },
        }
    }
}

fn header_prefix(header: &Header) -> String {
    if header.predicate == PredicateControl::None {
        return String::new();
    }
    let sign = if header.predicate_inverse { '-' } else { '+' };
    let mode = match header.predicate {
        PredicateControl::Normal => String::new(),
        other => format!(".{}", format!("{other:?}").to_ascii_lowercase()),
    };
    format!("({sign}f{}.{}{mode}) ", header.flag.nr, header.flag.subnr)
}

fn header_options(header: &Header) -> Vec<&'static str> {
    let mut options = Vec::new();
    if header.access_mode == AccessMode::Align16 {
        options.push("align16");
    }
    if header.mask_control == MaskControl::Disable {
        options.push("NoMask");
    }
    match header.quarter_control {
        QuarterControl::Q1 => {}
        QuarterControl::Q2 => options.push("Q2"),
        QuarterControl::Q3 => options.push("Q3"),
        QuarterControl::Q4 => options.push("Q4"),
    }
    match header.dependency_control {
        DependencyControl::None => {}
        DependencyControl::NotCleared => options.push("NoDDClr"),
        DependencyControl::NotChecked => options.push("NoDDChk"),
        DependencyControl::NotClearedNotChecked => {
            options.push("NoDDClr");
            options.push("NoDDChk");
        }
    }
    match header.thread_control {
        ThreadControl::Normal => {}
        ThreadControl::Atomic => options.push("atomic"),
        ThreadControl::Switch => options.push("switch"),
    }
    if header.acc_write {
        options.push("AccWrEnable");
    }
    if header.debug {
        options.push("Breakpoint");
    }
    options
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        let mode = header.access_mode;
        let sat = if header.saturate { ".sat" } else { "" };
        let exec = header.exec_size.lanes();

        f.write_str(&header_prefix(header))?;
        match &self.body {
            Body::Alu { cond, dst, src0, src1 } => {
                write!(f, "{}{}{sat}({exec}) {}", header.opcode, cond.suffix(), DstText(dst, mode))?;
                write!(f, " {}", SrcText(src0, mode))?;
                if let Some(src1) = src1 {
                    write!(f, " {}", SrcText(src1, mode))?;
                }
            }
            Body::Math { function, dst, src0, src1 } => {
                write!(f, "math.{}{sat}({exec}) {}", function.name(), DstText(dst, mode))?;
                write!(f, " {}", SrcText(src0, mode))?;
                if let Some(src1) = src1 {
                    write!(f, " {}", SrcText(src1, mode))?;
                }
            }
            Body::Alu3 { cond, dst, src0, src1, src2 } => write!(
                f,
                "{}{}{sat}({exec}) {} {} {} {}",
                header.opcode,
                cond.suffix(),
                DstText(dst, mode),
                RegText(src0, mode),
                RegText(src1, mode),
                RegText(src2, mode)
            )?,
            Body::Branch(Branch::Jump { offset }) => write!(f, "{}({exec}) {offset}", header.opcode)?,
            Body::Branch(Branch::Relative { jip, uip }) => {
                write!(f, "{}({exec}) JIP: {jip} UIP: {uip}", header.opcode)?
            }
            Body::Send { dst, src0, descriptor } => write!(
                f,
                "{}({exec}) {} {} {}",
                header.opcode,
                DstText(dst, mode),
                RegText(src0, mode),
                descriptor
            )?,
            Body::Empty => write!(f, "{}", header.opcode)?,
        }

        let options = header_options(header);
        if !options.is_empty() {
            write!(f, " {{ {} }}", options.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::defs::{ConditionalModifier, ExecSize, MathFunction, Opcode, QuarterControl};
    use crate::isa::instruction::FlagRegister;
    use crate::isa::operand::Region;

    #[test]
    fn test_predicated_add() {
        let inst = Instruction::new(
            Header::new(Opcode::Add, ExecSize::S16).predicated(FlagRegister::new(0, 0), false),
            Body::Alu {
                cond: ConditionalModifier::None,
                dst: Destination::grf(2, RegType::F),
                src0: Source::vector(4, RegType::F),
                src1: Some(Source::vector(6, RegType::F)),
            },
        );
        let text = disassemble(&inst.encode().unwrap()).unwrap();
        assert_eq!(text, "(+f0.0) add(16) g2<1>:F g4<8,8,1>:F g6<8,8,1>:F");
    }

    #[test]
    fn test_cmp_with_condition_and_scalar() {
        let inst = Instruction::new(
            Header::new(Opcode::Cmp, ExecSize::S8),
            Body::Alu {
                cond: ConditionalModifier::GreaterEqual,
                dst: Destination::null(),
                src0: Source::vector(4, RegType::D),
                src1: Some(Source::scalar(5, 8, RegType::D)),
            },
        );
        assert_eq!(inst.to_string(), "cmp.ge(8) null<1>:UD g4<8,8,1>:D g5.2<0,1,0>:D");
    }

    #[test]
    fn test_math_and_options() {
        let inst = Instruction::new(
            Header::new(Opcode::Math, ExecSize::S8)
                .no_mask()
                .quarter(QuarterControl::Q2)
                .saturated(),
            Body::Math {
                function: MathFunction::Sqrt,
                dst: Destination::grf(2, RegType::F),
                src0: Source::Register(RegisterSource::grf(4, RegType::F, Region::VEC8).absolute().negated()),
                src1: None,
            },
        );
        assert_eq!(
            inst.to_string(),
            "math.sqrt.sat(8) g2<1>:F -(abs)g4<8,8,1>:F { NoMask, Q2 }"
        );
    }

    #[test]
    fn test_align16_swizzle_and_writemask() {
        let inst = Instruction::new(
            Header::new(Opcode::Mov, ExecSize::S8).align16(),
            Body::Alu {
                cond: ConditionalModifier::None,
                dst: Destination::grf(3, RegType::F).with_writemask(0b0011),
                src0: Source::Register(RegisterSource::grf(7, RegType::F, Region::VEC4).with_swizzle(Swizzle::WWWW)),
                src1: None,
            },
        );
        assert_eq!(inst.to_string(), "mov(8) g3<1>.xy:F g7<4>.w:F { align16 }");
    }

    #[test]
    fn test_indirect_and_immediates() {
        let inst = Instruction::new(
            Header::new(Opcode::Mov, ExecSize::S1),
            Body::Alu {
                cond: ConditionalModifier::None,
                dst: Destination::grf(0, RegType::D).indirect(1, 16),
                src0: Source::imm_d(-7),
                src1: None,
            },
        );
        assert_eq!(inst.to_string(), "mov(1) g[a0.1+16]<1>:D -7D");
    }

    #[test]
    fn test_branches() {
        let endif = Instruction::new(
            Header::new(Opcode::Endif, ExecSize::S16),
            Body::Branch(Branch::Relative { jip: 2, uip: 2 }),
        );
        assert_eq!(endif.to_string(), "endif(16) JIP: 2 UIP: 2");

        let jmpi = Instruction::new(
            Header::new(Opcode::Jmpi, ExecSize::S1).no_mask(),
            Body::Branch(Branch::Jump { offset: 32 }),
        );
        assert_eq!(jmpi.to_string(), "jmpi(1) 32 { NoMask }");
    }

    #[test]
    fn test_arf_names() {
        assert_eq!(arf_name(arf::ACCUMULATOR | 1), "acc1");
        assert_eq!(arf_name(arf::FLAG), "f0");
        assert_eq!(arf_name(arf::IP), "ip");
        assert_eq!(arf_name(0xf0), "arf0xf0");
    }
}

//! Operand descriptions and their placement in the word
//!
//! A [`Destination`] or [`RegisterSource`] is written through one of four
//! layouts: direct or indirect addressing, in align1 (region based) or
//! align16 (swizzle based) access mode. Fields that a layout has no room
//! for are not stored; on decode they come back as the canonical values the
//! constructors in this module produce (`<4;4,1>` and an `.xyzw` swizzle in
//! align16, an `.xyzw` swizzle and a full writemask in align1).

use super::defs::{AccessMode, AddressMode, HorizontalStride, RegFile, RegType, VerticalStride, Width};
use super::layout::{self, SourceFields};
use super::word::InstructionWord;
use crate::error::{IsaError, Result};

/// Architecture register numbers
pub mod arf {
    pub const NULL: u8 = 0x00;
    pub const ADDRESS: u8 = 0x10;
    pub const ACCUMULATOR: u8 = 0x20;
    pub const FLAG: u8 = 0x30;
    pub const MASK: u8 = 0x40;
    pub const STATE: u8 = 0x70;
    pub const CONTROL: u8 = 0x80;
    pub const NOTIFICATION_COUNT: u8 = 0x90;
    pub const IP: u8 = 0xa0;
    pub const TIMESTAMP: u8 = 0xc0;
}

/// Size of one general register in bytes
pub const GRF_BYTES: u32 = 32;

/// Register addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Location {
    /// Register number and byte offset inside it
    Direct { nr: u8, subnr: u8 },
    /// Address register `a0.<addr_subnr>` plus a signed byte offset
    Indirect { addr_subnr: u8, offset: i16 },
}

impl Location {
    pub const fn direct(nr: u8) -> Self {
        Self::Direct { nr, subnr: 0 }
    }

    pub fn address_mode(&self) -> AddressMode {
        match self {
            Self::Direct { .. } => AddressMode::Direct,
            Self::Indirect { .. } => AddressMode::Indirect,
        }
    }
}

/// `<vstride; width, hstride>` source region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region {
    pub vstride: VerticalStride,
    pub width: Width,
    pub hstride: HorizontalStride,
}

impl Region {
    /// `<0;1,0>`: one element broadcast to every channel
    pub const SCALAR: Self = Self::new(VerticalStride::V0, Width::W1, HorizontalStride::Zero);
    /// `<4;4,1>`
    pub const VEC4: Self = Self::new(VerticalStride::V4, Width::W4, HorizontalStride::One);
    /// `<8;8,1>`: contiguous rows of eight elements
    pub const VEC8: Self = Self::new(VerticalStride::V8, Width::W8, HorizontalStride::One);
    /// `<16;16,1>`
    pub const VEC16: Self = Self::new(VerticalStride::V16, Width::W16, HorizontalStride::One);

    pub const fn new(vstride: VerticalStride, width: Width, hstride: HorizontalStride) -> Self {
        Self { vstride, width, hstride }
    }

    /// Element index (relative to the region origin) read by `channel`
    pub fn element_offset(&self, channel: u32) -> u32 {
        let width = self.width.elements();
        let row = channel / width;
        let col = channel % width;
        row * self.vstride.elements().unwrap_or(0) + col * self.hstride.elements()
    }

    pub fn is_scalar(&self) -> bool {
        *self == Self::SCALAR
    }
}

/// Align16 channel selection, one 2-bit component index per output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const XYZW: Self = Self([0, 1, 2, 3]);
    pub const XXXX: Self = Self([0, 0, 0, 0]);
    pub const YYYY: Self = Self([1, 1, 1, 1]);
    pub const ZZZZ: Self = Self([2, 2, 2, 2]);
    pub const WWWW: Self = Self([3, 3, 3, 3]);

    /// Eight-bit packed form, x in the low bits
    pub fn packed(self) -> u32 {
        self.0
            .iter()
            .enumerate()
            .fold(0, |acc, (i, c)| acc | (u32::from(*c & 3) << (2 * i)))
    }

    pub fn from_packed(bits: u32) -> Self {
        Self([0, 1, 2, 3].map(|i| ((bits >> (2 * i)) & 3) as u8))
    }
}

/// Where an instruction writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Destination {
    pub file: RegFile,
    pub ty: RegType,
    pub location: Location,
    pub hstride: HorizontalStride,
    /// Align16 channel enables, `0xf` in align1
    pub writemask: u8,
}

impl Destination {
    /// Whole general register, unit stride
    pub const fn grf(nr: u8, ty: RegType) -> Self {
        Self {
            file: RegFile::Grf,
            ty,
            location: Location::direct(nr),
            hstride: HorizontalStride::One,
            writemask: 0xf,
        }
    }

    /// Architecture register
    pub const fn arf(nr: u8, ty: RegType) -> Self {
        Self {
            file: RegFile::Arf,
            ..Self::grf(nr, ty)
        }
    }

    /// The null register; writes are discarded
    pub const fn null() -> Self {
        Self::arf(arf::NULL, RegType::UD)
    }

    pub const fn ip() -> Self {
        Self::arf(arf::IP, RegType::UD)
    }

    pub const fn with_subnr(mut self, subnr: u8) -> Self {
        if let Location::Direct { nr, .. } = self.location {
            self.location = Location::Direct { nr, subnr };
        }
        self
    }

    pub const fn with_hstride(mut self, hstride: HorizontalStride) -> Self {
        self.hstride = hstride;
        self
    }

    pub const fn with_writemask(mut self, writemask: u8) -> Self {
        self.writemask = writemask;
        self
    }

    pub const fn indirect(mut self, addr_subnr: u8, offset: i16) -> Self {
        self.location = Location::Indirect { addr_subnr, offset };
        self
    }

    pub const fn retype(mut self, ty: RegType) -> Self {
        self.ty = ty;
        self
    }
}

/// A register read by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RegisterSource {
    pub file: RegFile,
    pub ty: RegType,
    pub location: Location,
    pub region: Region,
    pub swizzle: Swizzle,
    pub abs: bool,
    pub negate: bool,
}

impl RegisterSource {
    /// General register read with `region`
    pub const fn grf(nr: u8, ty: RegType, region: Region) -> Self {
        Self {
            file: RegFile::Grf,
            ty,
            location: Location::direct(nr),
            region,
            swizzle: Swizzle::XYZW,
            abs: false,
            negate: false,
        }
    }

    pub const fn arf(nr: u8, ty: RegType, region: Region) -> Self {
        Self {
            file: RegFile::Arf,
            ..Self::grf(nr, ty, region)
        }
    }

    pub const fn null() -> Self {
        Self::arf(arf::NULL, RegType::UD, Region::SCALAR)
    }

    pub const fn with_subnr(mut self, subnr: u8) -> Self {
        if let Location::Direct { nr, .. } = self.location {
            self.location = Location::Direct { nr, subnr };
        }
        self
    }

    pub const fn with_swizzle(mut self, swizzle: Swizzle) -> Self {
        self.swizzle = swizzle;
        self
    }

    pub const fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub const fn absolute(mut self) -> Self {
        self.abs = true;
        self
    }

    pub const fn indirect(mut self, addr_subnr: u8, offset: i16) -> Self {
        self.location = Location::Indirect { addr_subnr, offset };
        self
    }

    pub const fn retype(mut self, ty: RegType) -> Self {
        self.ty = ty;
        self
    }
}

/// A source operand: a register or a 32-bit immediate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Source {
    Register(RegisterSource),
    Immediate { ty: RegType, bits: u32 },
}

impl Source {
    /// `<8;8,1>` general register
    pub const fn vector(nr: u8, ty: RegType) -> Self {
        Self::Register(RegisterSource::grf(nr, ty, Region::VEC8))
    }

    /// `<0;1,0>` element of a general register, `subnr` in bytes
    pub const fn scalar(nr: u8, subnr: u8, ty: RegType) -> Self {
        Self::Register(RegisterSource::grf(nr, ty, Region::SCALAR).with_subnr(subnr))
    }

    /// Align16 `<4;4,1>.xyzw` general register
    pub const fn vec4(nr: u8, ty: RegType) -> Self {
        Self::Register(RegisterSource::grf(nr, ty, Region::VEC4))
    }

    pub const fn region(nr: u8, ty: RegType, region: Region) -> Self {
        Self::Register(RegisterSource::grf(nr, ty, region))
    }

    pub const fn null() -> Self {
        Self::Register(RegisterSource::null())
    }

    pub fn imm_f(value: f32) -> Self {
        Self::Immediate {
            ty: RegType::F,
            bits: value.to_bits(),
        }
    }

    pub const fn imm_ud(value: u32) -> Self {
        Self::Immediate { ty: RegType::UD, bits: value }
    }

    pub const fn imm_d(value: i32) -> Self {
        Self::Immediate {
            ty: RegType::D,
            bits: value as u32,
        }
    }

    pub const fn imm_uw(value: u16) -> Self {
        Self::Immediate {
            ty: RegType::UW,
            bits: value as u32,
        }
    }

    pub const fn imm_w(value: i16) -> Self {
        Self::Immediate {
            ty: RegType::W,
            bits: value as u16 as u32,
        }
    }

    pub fn ty(&self) -> RegType {
        match self {
            Self::Register(reg) => reg.ty,
            Self::Immediate { ty, .. } => *ty,
        }
    }

    pub fn file(&self) -> RegFile {
        match self {
            Self::Register(reg) => reg.file,
            Self::Immediate { .. } => RegFile::Imm,
        }
    }

    pub fn as_register(&self) -> Option<&RegisterSource> {
        match self {
            Self::Register(reg) => Some(reg),
            Self::Immediate { .. } => None,
        }
    }
}

impl From<RegisterSource> for Source {
    fn from(reg: RegisterSource) -> Self {
        Self::Register(reg)
    }
}

// ============================================================================
// Packing
// ============================================================================

fn aligned_subnr(subnr: u8, unit: u8, field: &'static str) -> Result<u32> {
    if subnr % unit != 0 {
        return Err(IsaError::unsupported(
            field,
            format!("subregister offset {subnr} is not a multiple of {unit} bytes"),
        ));
    }
    Ok(u32::from(subnr / unit))
}

pub(crate) fn encode_destination(word: &mut InstructionWord, dst: &Destination, mode: AccessMode) -> Result<()> {
    if dst.file == RegFile::Imm {
        return Err(IsaError::unsupported("dst", "an immediate cannot be a destination"));
    }
    word.set(layout::types::DST_FILE, dst.file.bits())?;
    word.set(layout::types::DST_TYPE, dst.ty.bits())?;
    word.set(layout::dst::ADDRESS_MODE, dst.location.address_mode().bits())?;
    word.set(layout::dst::HORIZ_STRIDE, dst.hstride.bits())?;

    match (mode, dst.location) {
        (AccessMode::Align1, Location::Direct { nr, subnr }) => {
            word.set(layout::dst::DA1_REG_NR, u32::from(nr))?;
            word.set(layout::dst::DA1_SUBREG_NR, u32::from(subnr))?;
        }
        (AccessMode::Align1, Location::Indirect { addr_subnr, offset }) => {
            word.set(layout::dst::IA1_ADDR_SUBREG, u32::from(addr_subnr))?;
            word.set_signed(layout::dst::IA1_INDIRECT_OFFSET, i32::from(offset))?;
        }
        (AccessMode::Align16, Location::Direct { nr, subnr }) => {
            word.set(layout::dst::DA16_REG_NR, u32::from(nr))?;
            word.set(layout::dst::DA16_SUBREG_NR, aligned_subnr(subnr, 16, "dst.subnr")?)?;
            word.set(layout::dst::DA16_WRITEMASK, u32::from(dst.writemask))?;
        }
        (AccessMode::Align16, Location::Indirect { addr_subnr, offset }) => {
            word.set(layout::dst::IA16_ADDR_SUBREG, u32::from(addr_subnr))?;
            word.set_signed(layout::dst::IA16_INDIRECT_OFFSET, i32::from(offset))?;
            word.set(layout::dst::IA16_WRITEMASK, u32::from(dst.writemask))?;
        }
    }
    Ok(())
}

pub(crate) fn decode_destination(word: &InstructionWord, mode: AccessMode) -> Result<Destination> {
    let file = RegFile::from_bits(word.get(layout::types::DST_FILE))?;
    let ty = RegType::from_bits(word.get(layout::types::DST_TYPE))?;
    let hstride = HorizontalStride::from_bits(word.get(layout::dst::HORIZ_STRIDE))?;
    let address_mode = AddressMode::from_bits(word.get(layout::dst::ADDRESS_MODE))?;

    let (location, writemask) = match (mode, address_mode) {
        (AccessMode::Align1, AddressMode::Direct) => (
            Location::Direct {
                nr: word.get(layout::dst::DA1_REG_NR) as u8,
                subnr: word.get(layout::dst::DA1_SUBREG_NR) as u8,
            },
            0xf,
        ),
        (AccessMode::Align1, AddressMode::Indirect) => (
            Location::Indirect {
                addr_subnr: word.get(layout::dst::IA1_ADDR_SUBREG) as u8,
                offset: word.get_signed(layout::dst::IA1_INDIRECT_OFFSET) as i16,
            },
            0xf,
        ),
        (AccessMode::Align16, AddressMode::Direct) => (
            Location::Direct {
                nr: word.get(layout::dst::DA16_REG_NR) as u8,
                subnr: (word.get(layout::dst::DA16_SUBREG_NR) * 16) as u8,
            },
            word.get(layout::dst::DA16_WRITEMASK) as u8,
        ),
        (AccessMode::Align16, AddressMode::Indirect) => (
            Location::Indirect {
                addr_subnr: word.get(layout::dst::IA16_ADDR_SUBREG) as u8,
                offset: word.get_signed(layout::dst::IA16_INDIRECT_OFFSET) as i16,
            },
            word.get(layout::dst::IA16_WRITEMASK) as u8,
        ),
    };

    Ok(Destination {
        file,
        ty,
        location,
        hstride,
        writemask,
    })
}

/// Write a register source through `fields` (source 0 or source 1).
/// File and type bits are written by the caller.
pub(crate) fn encode_register_source(
    word: &mut InstructionWord,
    fields: &SourceFields,
    src: &RegisterSource,
    mode: AccessMode,
) -> Result<()> {
    word.set_bool(fields.abs, src.abs)?;
    word.set_bool(fields.negate, src.negate)?;
    word.set(fields.address_mode, src.location.address_mode().bits())?;
    word.set(fields.vert_stride, src.region.vstride.bits())?;

    match mode {
        AccessMode::Align1 => {
            word.set(fields.horiz_stride, src.region.hstride.bits())?;
            word.set(fields.width, src.region.width.bits())?;
            match src.location {
                Location::Direct { nr, subnr } => {
                    word.set(fields.reg_nr, u32::from(nr))?;
                    word.set(fields.da1_subreg_nr, u32::from(subnr))?;
                }
                Location::Indirect { addr_subnr, offset } => {
                    word.set(fields.ia_addr_subreg, u32::from(addr_subnr))?;
                    word.set_signed(fields.ia_indirect_offset, i32::from(offset))?;
                }
            }
        }
        AccessMode::Align16 => {
            let [x, y, z, w] = src.swizzle.0;
            word.set(fields.swizzle_x, u32::from(x))?;
            word.set(fields.swizzle_y, u32::from(y))?;
            word.set(fields.swizzle_z, u32::from(z))?;
            word.set(fields.swizzle_w, u32::from(w))?;
            match src.location {
                Location::Direct { nr, subnr } => {
                    word.set(fields.reg_nr, u32::from(nr))?;
                    word.set(fields.da16_subreg_nr, aligned_subnr(subnr, 16, fields.da16_subreg_nr.name)?)?;
                }
                Location::Indirect { addr_subnr, offset } => {
                    word.set(fields.ia_addr_subreg, u32::from(addr_subnr))?;
                    word.set_signed(fields.ia16_indirect_offset, i32::from(offset))?;
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn decode_register_source(
    word: &InstructionWord,
    fields: &SourceFields,
    file: RegFile,
    ty: RegType,
    mode: AccessMode,
) -> Result<RegisterSource> {
    let address_mode = AddressMode::from_bits(word.get(fields.address_mode))?;
    let vstride = VerticalStride::from_bits(word.get(fields.vert_stride))?;

    let (location, region, swizzle) = match mode {
        AccessMode::Align1 => {
            let location = match address_mode {
                AddressMode::Direct => Location::Direct {
                    nr: word.get(fields.reg_nr) as u8,
                    subnr: word.get(fields.da1_subreg_nr) as u8,
                },
                AddressMode::Indirect => Location::Indirect {
                    addr_subnr: word.get(fields.ia_addr_subreg) as u8,
                    offset: word.get_signed(fields.ia_indirect_offset) as i16,
                },
            };
            let region = Region::new(
                vstride,
                Width::from_bits(word.get(fields.width))?,
                HorizontalStride::from_bits(word.get(fields.horiz_stride))?,
            );
            (location, region, Swizzle::XYZW)
        }
        AccessMode::Align16 => {
            let location = match address_mode {
                AddressMode::Direct => Location::Direct {
                    nr: word.get(fields.reg_nr) as u8,
                    subnr: (word.get(fields.da16_subreg_nr) * 16) as u8,
                },
                AddressMode::Indirect => Location::Indirect {
                    addr_subnr: word.get(fields.ia_addr_subreg) as u8,
                    offset: word.get_signed(fields.ia16_indirect_offset) as i16,
                },
            };
            let swizzle = Swizzle([
                word.get(fields.swizzle_x) as u8,
                word.get(fields.swizzle_y) as u8,
                word.get(fields.swizzle_z) as u8,
                word.get(fields.swizzle_w) as u8,
            ]);
            let region = Region::new(vstride, Width::W4, HorizontalStride::One);
            (location, region, swizzle)
        }
    };

    Ok(RegisterSource {
        file,
        ty,
        location,
        region,
        swizzle,
        abs: word.get_bool(fields.abs),
        negate: word.get_bool(fields.negate),
    })
}

/// Immediates occupy all of dword 3, so only 32-bit and narrower types fit
pub(crate) fn check_immediate(ty: RegType) -> Result<()> {
    if ty == RegType::DF {
        return Err(IsaError::unsupported("immediate", "64-bit immediates do not fit in the word"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swizzle_packing() {
        assert_eq!(Swizzle::XYZW.packed(), 0b1110_0100);
        assert_eq!(Swizzle::from_packed(0b1110_0100), Swizzle::XYZW);
        assert_eq!(Swizzle::WWWW.packed(), 0xff);
    }

    #[test]
    fn test_region_offsets() {
        assert_eq!(Region::VEC8.element_offset(3), 3);
        assert_eq!(Region::VEC8.element_offset(9), 9);
        assert_eq!(Region::SCALAR.element_offset(7), 0);
        let strided = Region::new(VerticalStride::V16, Width::W8, HorizontalStride::Two);
        assert_eq!(strided.element_offset(1), 2);
        assert_eq!(strided.element_offset(8), 16);
    }

    #[test]
    fn test_destination_align1_round_trip() {
        let dst = Destination::grf(12, RegType::F).with_subnr(8);
        let mut word = InstructionWord::default();
        encode_destination(&mut word, &dst, AccessMode::Align1).unwrap();
        assert_eq!(decode_destination(&word, AccessMode::Align1).unwrap(), dst);
    }

    #[test]
    fn test_destination_indirect_round_trip() {
        let dst = Destination::grf(0, RegType::UD).indirect(2, -64);
        let mut word = InstructionWord::default();
        encode_destination(&mut word, &dst, AccessMode::Align1).unwrap();
        assert_eq!(decode_destination(&word, AccessMode::Align1).unwrap(), dst);
    }

    #[test]
    fn test_align16_destination_requires_aligned_subnr() {
        let dst = Destination::grf(3, RegType::F).with_subnr(4);
        let mut word = InstructionWord::default();
        let err = encode_destination(&mut word, &dst, AccessMode::Align16).unwrap_err();
        assert!(matches!(err, IsaError::UnsupportedEncoding { .. }));
    }

    #[test]
    fn test_immediate_destination_rejected() {
        let mut dst = Destination::grf(1, RegType::UD);
        dst.file = RegFile::Imm;
        let mut word = InstructionWord::default();
        assert!(encode_destination(&mut word, &dst, AccessMode::Align1).is_err());
    }

    #[test]
    fn test_source_align16_round_trip() {
        let src = RegisterSource::grf(20, RegType::F, Region::VEC4)
            .with_swizzle(Swizzle([3, 2, 1, 0]))
            .with_subnr(16)
            .negated();
        let mut word = InstructionWord::default();
        encode_register_source(&mut word, &layout::SRC0, &src, AccessMode::Align16).unwrap();
        let decoded =
            decode_register_source(&word, &layout::SRC0, RegFile::Grf, RegType::F, AccessMode::Align16).unwrap();
        assert_eq!(decoded, src);
    }

    #[test]
    fn test_indirect_offset_out_of_range() {
        let src = RegisterSource::grf(0, RegType::F, Region::VEC8).indirect(0, 600);
        let mut word = InstructionWord::default();
        let err = encode_register_source(&mut word, &layout::SRC1, &src, AccessMode::Align1).unwrap_err();
        assert!(matches!(err, IsaError::FieldOutOfRange { bits: 10, .. }));
    }
}

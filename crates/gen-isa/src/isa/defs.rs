//! Enumerated hardware field values
//!
//! Every enum here maps one-to-one onto a raw bit pattern of the instruction
//! word. `bits()` gives the encoding and `from_bits()` rejects patterns that
//! name no value.

use std::fmt;

use crate::error::{IsaError, Result};

macro_rules! encoded_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $field:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Raw field encoding
            pub const fn bits(self) -> u32 {
                self as u32
            }

            /// Decode a raw field value
            pub fn from_bits(bits: u32) -> Result<Self> {
                match bits {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(IsaError::invalid_field($field, bits)),
                }
            }
        }
    };
}

// ============================================================================
// Opcodes
// ============================================================================

encoded_enum! {
    /// 7-bit instruction opcode
    Opcode: "opcode" {
        Mov = 1,
        Sel = 2,
        Not = 4,
        And = 5,
        Or = 6,
        Xor = 7,
        Shr = 8,
        Shl = 9,
        Asr = 12,
        Cmp = 16,
        Cmpn = 17,
        F32To16 = 19,
        F16To32 = 20,
        Jmpi = 32,
        Brd = 33,
        If = 34,
        Brc = 35,
        Else = 36,
        Endif = 37,
        Do = 38,
        While = 39,
        Break = 40,
        Continue = 41,
        Halt = 42,
        Wait = 48,
        Send = 49,
        Sendc = 50,
        Math = 56,
        Add = 64,
        Mul = 65,
        Avg = 66,
        Frc = 67,
        Rndu = 68,
        Rndd = 69,
        Rnde = 70,
        Rndz = 71,
        Mac = 72,
        Mach = 73,
        Lzd = 74,
        Fbh = 75,
        Fbl = 76,
        Cbit = 77,
        Addc = 78,
        Subb = 79,
        Dp4 = 84,
        Dph = 85,
        Dp3 = 86,
        Dp2 = 87,
        Line = 89,
        Pln = 90,
        Mad = 91,
        Nop = 126,
    }
}

/// Operand shape of an opcode; selects which word layout is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OpcodeClass {
    /// Destination and one source
    Alu1,
    /// Destination and two sources
    Alu2,
    /// Three-source align16 layout
    Alu3,
    /// Extended math; function code in the condition field
    Math,
    /// `jmpi`: immediate byte offset
    Jump,
    /// Structured control flow: jip/uip pair
    RelativeBranch,
    /// Message to a shared function
    Send,
    /// Header only
    Nop,
}

impl Opcode {
    /// Decode raw opcode bits
    pub fn decode(bits: u32) -> Result<Self> {
        Self::from_bits(bits).map_err(|_| IsaError::UnknownOpcode(bits as u8))
    }

    pub fn class(self) -> OpcodeClass {
        use Opcode::*;
        match self {
            Mov | Not | Frc | Rndu | Rndd | Rnde | Rndz | Lzd | Fbh | Fbl | Cbit | F32To16 | F16To32 | Wait => {
                OpcodeClass::Alu1
            }
            Sel | And | Or | Xor | Shr | Shl | Asr | Cmp | Cmpn | Add | Mul | Avg | Mac | Mach | Addc | Subb
            | Dp4 | Dph | Dp3 | Dp2 | Line | Pln => OpcodeClass::Alu2,
            Mad => OpcodeClass::Alu3,
            Math => OpcodeClass::Math,
            Jmpi => OpcodeClass::Jump,
            Brd | If | Brc | Else | Endif | While | Break | Continue | Halt => OpcodeClass::RelativeBranch,
            Send | Sendc => OpcodeClass::Send,
            Do | Nop => OpcodeClass::Nop,
        }
    }

    /// Assembly mnemonic
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Mov => "mov",
            Sel => "sel",
            Not => "not",
            And => "and",
            Or => "or",
            Xor => "xor",
            Shr => "shr",
            Shl => "shl",
            Asr => "asr",
            Cmp => "cmp",
            Cmpn => "cmpn",
            F32To16 => "f32to16",
            F16To32 => "f16to32",
            Jmpi => "jmpi",
            Brd => "brd",
            If => "if",
            Brc => "brc",
            Else => "else",
            Endif => "endif",
            Do => "do",
            While => "while",
            Break => "break",
            Continue => "cont",
            Halt => "halt",
            Wait => "wait",
            Send => "send",
            Sendc => "sendc",
            Math => "math",
            Add => "add",
            Mul => "mul",
            Avg => "avg",
            Frc => "frc",
            Rndu => "rndu",
            Rndd => "rndd",
            Rnde => "rnde",
            Rndz => "rndz",
            Mac => "mac",
            Mach => "mach",
            Lzd => "lzd",
            Fbh => "fbh",
            Fbl => "fbl",
            Cbit => "cbit",
            Addc => "addc",
            Subb => "subb",
            Dp4 => "dp4",
            Dph => "dph",
            Dp3 => "dp3",
            Dp2 => "dp2",
            Line => "line",
            Pln => "pln",
            Mad => "mad",
            Nop => "nop",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// ============================================================================
// Header controls
// ============================================================================

encoded_enum! {
    AccessMode: "access_mode" {
        Align1 = 0,
        Align16 = 1,
    }
}

encoded_enum! {
    MaskControl: "mask_control" {
        /// Respect the execution mask
        Enable = 0,
        /// Execute on all channels (`NoMask`)
        Disable = 1,
    }
}

encoded_enum! {
    DependencyControl: "dependency_control" {
        None = 0,
        NotCleared = 1,
        NotChecked = 2,
        NotClearedNotChecked = 3,
    }
}

encoded_enum! {
    /// Which quarter of the channel mask a compressed half executes on
    QuarterControl: "quarter_control" {
        Q1 = 0,
        Q2 = 1,
        Q3 = 2,
        Q4 = 3,
    }
}

encoded_enum! {
    ThreadControl: "thread_control" {
        Normal = 0,
        Atomic = 1,
        Switch = 2,
    }
}

encoded_enum! {
    PredicateControl: "predicate_control" {
        None = 0,
        Normal = 1,
        AnyV = 2,
        AllV = 3,
        Any2H = 4,
        All2H = 5,
        Any4H = 6,
        All4H = 7,
        Any8H = 8,
        All8H = 9,
        Any16H = 10,
        All16H = 11,
    }
}

encoded_enum! {
    /// Number of channels an instruction executes on
    ExecSize: "execution_size" {
        S1 = 0,
        S2 = 1,
        S4 = 2,
        S8 = 3,
        S16 = 4,
        S32 = 5,
    }
}

impl ExecSize {
    /// Map a channel count onto its encoding
    pub fn from_lanes(lanes: u32) -> Result<Self> {
        match lanes {
            1 => Ok(Self::S1),
            2 => Ok(Self::S2),
            4 => Ok(Self::S4),
            8 => Ok(Self::S8),
            16 => Ok(Self::S16),
            32 => Ok(Self::S32),
            _ => Err(IsaError::invalid_field("execution_size", lanes)),
        }
    }

    pub const fn lanes(self) -> u32 {
        1 << self.bits()
    }
}

encoded_enum! {
    ConditionalModifier: "conditional_modifier" {
        None = 0,
        Zero = 1,
        NotZero = 2,
        Greater = 3,
        GreaterEqual = 4,
        Less = 5,
        LessEqual = 6,
        RoundIncrement = 7,
        Overflow = 8,
        Unordered = 9,
    }
}

impl ConditionalModifier {
    /// Assembly suffix, empty for `None`
    pub fn suffix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Zero => ".e",
            Self::NotZero => ".ne",
            Self::Greater => ".g",
            Self::GreaterEqual => ".ge",
            Self::Less => ".l",
            Self::LessEqual => ".le",
            Self::RoundIncrement => ".r",
            Self::Overflow => ".o",
            Self::Unordered => ".u",
        }
    }
}

encoded_enum! {
    /// Shared function a `send` is routed to
    SharedFunction: "sfid" {
        Null = 0,
        Math = 1,
        Sampler = 2,
        MessageGateway = 3,
        DataPortSampler = 4,
        DataPortRender = 5,
        Urb = 6,
        ThreadSpawner = 7,
        DataPortConstant = 9,
        DataPortData = 10,
        DataPort1Data = 12,
    }
}

impl SharedFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Math => "math",
            Self::Sampler => "sampler",
            Self::MessageGateway => "gateway",
            Self::DataPortSampler => "sampler_cache",
            Self::DataPortRender => "render",
            Self::Urb => "urb",
            Self::ThreadSpawner => "thread_spawner",
            Self::DataPortConstant => "const",
            Self::DataPortData => "data",
            Self::DataPort1Data => "data1",
        }
    }
}

// ============================================================================
// Registers and regions
// ============================================================================

encoded_enum! {
    RegFile: "register_file" {
        /// Architecture register file
        Arf = 0,
        /// General register file
        Grf = 1,
        /// Message register file
        Mrf = 2,
        Imm = 3,
    }
}

encoded_enum! {
    RegType: "register_type" {
        UD = 0,
        D = 1,
        UW = 2,
        W = 3,
        UB = 4,
        B = 5,
        DF = 6,
        F = 7,
    }
}

impl RegType {
    pub const fn size_bytes(self) -> u32 {
        match self {
            Self::UB | Self::B => 1,
            Self::UW | Self::W => 2,
            Self::UD | Self::D | Self::F => 4,
            Self::DF => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::F | Self::DF)
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Self::D | Self::W | Self::B | Self::F | Self::DF)
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::UD => "UD",
            Self::D => "D",
            Self::UW => "UW",
            Self::W => "W",
            Self::UB => "UB",
            Self::B => "B",
            Self::DF => "DF",
            Self::F => "F",
        }
    }
}

encoded_enum! {
    AddressMode: "address_mode" {
        Direct = 0,
        Indirect = 1,
    }
}

encoded_enum! {
    HorizontalStride: "horizontal_stride" {
        Zero = 0,
        One = 1,
        Two = 2,
        Four = 3,
    }
}

impl HorizontalStride {
    /// Stride in elements
    pub const fn elements(self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    pub fn from_elements(elements: u32) -> Result<Self> {
        match elements {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            _ => Err(IsaError::invalid_field("horizontal_stride", elements)),
        }
    }
}

encoded_enum! {
    VerticalStride: "vertical_stride" {
        V0 = 0,
        V1 = 1,
        V2 = 2,
        V4 = 3,
        V8 = 4,
        V16 = 5,
        V32 = 6,
        OneDimensional = 15,
    }
}

impl VerticalStride {
    /// Stride in elements; `None` for the one-dimensional (indirect) form
    pub const fn elements(self) -> Option<u32> {
        match self {
            Self::OneDimensional => None,
            Self::V0 => Some(0),
            other => Some(1 << (other as u32 - 1)),
        }
    }
}

encoded_enum! {
    Width: "width" {
        W1 = 0,
        W2 = 1,
        W4 = 2,
        W8 = 3,
        W16 = 4,
    }
}

impl Width {
    pub const fn elements(self) -> u32 {
        1 << self.bits()
    }
}

// ============================================================================
// Message payload enums
// ============================================================================

encoded_enum! {
    MathFunction: "math_function" {
        Inv = 1,
        Log = 2,
        Exp = 3,
        Sqrt = 4,
        Rsq = 5,
        Sin = 6,
        Cos = 7,
        Fdiv = 9,
        Pow = 10,
        IntDivQuotientAndRemainder = 11,
        IntDivQuotient = 12,
        IntDivRemainder = 13,
    }
}

impl MathFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Inv => "inv",
            Self::Log => "log",
            Self::Exp => "exp",
            Self::Sqrt => "sqrt",
            Self::Rsq => "rsq",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Fdiv => "fdiv",
            Self::Pow => "pow",
            Self::IntDivQuotientAndRemainder => "intdivmod",
            Self::IntDivQuotient => "intdiv",
            Self::IntDivRemainder => "intmod",
        }
    }

    /// Whether the function consumes a second source
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Fdiv | Self::Pow | Self::IntDivQuotientAndRemainder | Self::IntDivQuotient | Self::IntDivRemainder
        )
    }
}

encoded_enum! {
    AtomicOp: "atomic_op" {
        CmpWr8B = 0,
        And = 1,
        Or = 2,
        Xor = 3,
        Mov = 4,
        Inc = 5,
        Dec = 6,
        Add = 7,
        Sub = 8,
        RevSub = 9,
        IMax = 10,
        IMin = 11,
        UMax = 12,
        UMin = 13,
        CmpWr = 14,
        PreDec = 15,
    }
}

impl AtomicOp {
    /// Number of data operands carried in the payload besides the address
    pub const fn source_count(self) -> u32 {
        match self {
            Self::Inc | Self::Dec | Self::PreDec => 0,
            Self::CmpWr | Self::CmpWr8B => 2,
            _ => 1,
        }
    }
}

encoded_enum! {
    GatewayFunction: "gateway_function" {
        OpenGateway = 0,
        CloseGateway = 1,
        ForwardMessage = 2,
        GetTimestamp = 3,
        BarrierMessage = 4,
        UpdateGatewayState = 5,
        MmioReadWrite = 6,
    }
}

encoded_enum! {
    /// Data port message types on the data cache and constant ports
    DataPortMessage: "dataport_message" {
        OBlockRead = 0,
        UnalignedOBlockRead = 1,
        ODBlockRead = 2,
        DwordGather = 3,
        ByteGather = 4,
        UntypedRead = 5,
        UntypedAtomic = 6,
        MemoryFence = 7,
        OBlockWrite = 8,
        ODBlockWrite = 10,
        DwordScatter = 11,
        ByteScatter = 12,
        UntypedWrite = 13,
    }
}

impl DataPortMessage {
    pub fn name(self) -> &'static str {
        match self {
            Self::OBlockRead => "oblock_read",
            Self::UnalignedOBlockRead => "unaligned_oblock_read",
            Self::ODBlockRead => "odblock_read",
            Self::DwordGather => "dword_gather",
            Self::ByteGather => "byte_gather",
            Self::UntypedRead => "untyped_read",
            Self::UntypedAtomic => "untyped_atomic",
            Self::MemoryFence => "memory_fence",
            Self::OBlockWrite => "oblock_write",
            Self::ODBlockWrite => "odblock_write",
            Self::DwordScatter => "dword_scatter",
            Self::ByteScatter => "byte_scatter",
            Self::UntypedWrite => "untyped_write",
        }
    }

    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::OBlockWrite | Self::ODBlockWrite | Self::DwordScatter | Self::ByteScatter | Self::UntypedWrite
        )
    }
}

encoded_enum! {
    /// Render port message types used for typed surfaces
    TypedMessage: "typed_message" {
        TypedAtomic = 6,
        TypedRead = 5,
        TypedWrite = 13,
    }
}

encoded_enum! {
    UntypedSimdMode: "untyped_simd_mode" {
        Simd4x2 = 0,
        Simd16 = 1,
        Simd8 = 2,
    }
}

encoded_enum! {
    ByteSimdMode: "byte_simd_mode" {
        Simd8 = 0,
        Simd16 = 1,
    }
}

encoded_enum! {
    AtomicSimdMode: "atomic_simd_mode" {
        Simd16 = 0,
        Simd8 = 1,
    }
}

encoded_enum! {
    ByteScatterSize: "byte_scatter_size" {
        Byte = 0,
        Word = 1,
        Dword = 2,
    }
}

impl ByteScatterSize {
    pub fn from_bytes(bytes: u32) -> Result<Self> {
        match bytes {
            1 => Ok(Self::Byte),
            2 => Ok(Self::Word),
            4 => Ok(Self::Dword),
            _ => Err(IsaError::invalid_field("byte_scatter_size", bytes)),
        }
    }
}

encoded_enum! {
    SamplerSimdMode: "sampler_simd_mode" {
        Simd4x2 = 0,
        Simd8 = 1,
        Simd16 = 2,
        Simd32x64 = 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_round_trip() {
        for op in [Opcode::Mov, Opcode::Send, Opcode::Mad, Opcode::Nop, Opcode::Jmpi] {
            assert_eq!(Opcode::decode(op.bits()).unwrap(), op);
        }
        assert_eq!(Opcode::decode(3).unwrap_err(), IsaError::UnknownOpcode(3));
    }

    #[test]
    fn test_opcode_values() {
        assert_eq!(Opcode::Mov.bits(), 1);
        assert_eq!(Opcode::Send.bits(), 49);
        assert_eq!(Opcode::Math.bits(), 56);
        assert_eq!(Opcode::Add.bits(), 64);
        assert_eq!(Opcode::Mad.bits(), 91);
        assert_eq!(Opcode::Nop.bits(), 126);
    }

    #[test]
    fn test_opcode_class() {
        assert_eq!(Opcode::Mov.class(), OpcodeClass::Alu1);
        assert_eq!(Opcode::Add.class(), OpcodeClass::Alu2);
        assert_eq!(Opcode::Mad.class(), OpcodeClass::Alu3);
        assert_eq!(Opcode::If.class(), OpcodeClass::RelativeBranch);
        assert_eq!(Opcode::Sendc.class(), OpcodeClass::Send);
    }

    #[test]
    fn test_exec_size_lanes() {
        assert_eq!(ExecSize::S1.lanes(), 1);
        assert_eq!(ExecSize::S16.lanes(), 16);
        assert_eq!(ExecSize::from_lanes(8).unwrap(), ExecSize::S8);
        assert!(ExecSize::from_lanes(3).is_err());
    }

    #[test]
    fn test_strides() {
        assert_eq!(VerticalStride::V8.elements(), Some(8));
        assert_eq!(VerticalStride::V0.elements(), Some(0));
        assert_eq!(VerticalStride::OneDimensional.elements(), None);
        assert_eq!(VerticalStride::from_bits(0xf).unwrap(), VerticalStride::OneDimensional);
        assert!(VerticalStride::from_bits(7).is_err());
        assert_eq!(HorizontalStride::Four.bits(), 3);
        assert_eq!(Width::W16.elements(), 16);
    }

    #[test]
    fn test_reg_type_properties() {
        assert_eq!(RegType::F.size_bytes(), 4);
        assert_eq!(RegType::UW.size_bytes(), 2);
        assert!(RegType::F.is_float());
        assert!(!RegType::UD.is_signed());
    }

    #[test]
    fn test_sfid_values() {
        assert_eq!(SharedFunction::DataPortData.bits(), 10);
        assert_eq!(SharedFunction::from_bits(9).unwrap(), SharedFunction::DataPortConstant);
        assert!(SharedFunction::from_bits(8).is_err());
    }
}

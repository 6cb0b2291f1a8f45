//! Bit positions of every field in the 128-bit word
//!
//! Dword 0 is the header, dword 1 the destination (plus operand types),
//! dword 2 source 0, dword 3 source 1, an immediate or a message
//! descriptor. Several layouts overlap each region; which one is live is
//! decided by the opcode, the access mode and the addressing mode.

use super::word::Field;

pub(crate) mod header {
    use super::Field;

    pub const OPCODE: Field = Field::new("opcode", 0, 0, 7);
    pub const ACCESS_MODE: Field = Field::new("access_mode", 0, 8, 1);
    pub const MASK_CONTROL: Field = Field::new("mask_control", 0, 9, 1);
    pub const DEPENDENCY_CONTROL: Field = Field::new("dependency_control", 0, 10, 2);
    pub const QUARTER_CONTROL: Field = Field::new("quarter_control", 0, 12, 2);
    pub const THREAD_CONTROL: Field = Field::new("thread_control", 0, 14, 2);
    pub const PREDICATE_CONTROL: Field = Field::new("predicate_control", 0, 16, 4);
    pub const PREDICATE_INVERSE: Field = Field::new("predicate_inverse", 0, 20, 1);
    pub const EXECUTION_SIZE: Field = Field::new("execution_size", 0, 21, 3);
    /// Conditional modifier, math function or shared function id
    pub const DESTREG_OR_CONDMOD: Field = Field::new("destreg_or_condmod", 0, 24, 4);
    pub const ACC_WR_CONTROL: Field = Field::new("acc_wr_control", 0, 28, 1);
    pub const CMPT_CONTROL: Field = Field::new("cmpt_control", 0, 29, 1);
    pub const DEBUG_CONTROL: Field = Field::new("debug_control", 0, 30, 1);
    pub const SATURATE: Field = Field::new("saturate", 0, 31, 1);
}

/// Operand file/type bits shared by all two-source layouts of dword 1
pub(crate) mod types {
    use super::Field;

    pub const DST_FILE: Field = Field::new("dst.file", 1, 0, 2);
    pub const DST_TYPE: Field = Field::new("dst.type", 1, 2, 3);
    pub const SRC0_FILE: Field = Field::new("src0.file", 1, 5, 2);
    pub const SRC0_TYPE: Field = Field::new("src0.type", 1, 7, 3);
    pub const SRC1_FILE: Field = Field::new("src1.file", 1, 10, 2);
    pub const SRC1_TYPE: Field = Field::new("src1.type", 1, 12, 3);
    pub const NIB_CTRL: Field = Field::new("nib_ctrl", 1, 15, 1);
}

/// Destination layouts of dword 1
pub(crate) mod dst {
    use super::Field;

    pub const HORIZ_STRIDE: Field = Field::new("dst.hstride", 1, 29, 2);
    pub const ADDRESS_MODE: Field = Field::new("dst.address_mode", 1, 31, 1);

    pub const DA1_SUBREG_NR: Field = Field::new("dst.subnr", 1, 16, 5);
    pub const DA1_REG_NR: Field = Field::new("dst.nr", 1, 21, 8);

    pub const IA1_INDIRECT_OFFSET: Field = Field::new("dst.indirect_offset", 1, 16, 10);
    pub const IA1_ADDR_SUBREG: Field = Field::new("dst.addr_subnr", 1, 26, 3);

    pub const DA16_WRITEMASK: Field = Field::new("dst.writemask", 1, 16, 4);
    pub const DA16_SUBREG_NR: Field = Field::new("dst.subnr", 1, 20, 1);
    pub const DA16_REG_NR: Field = Field::new("dst.nr", 1, 21, 8);

    pub const IA16_WRITEMASK: Field = Field::new("dst.writemask", 1, 16, 4);
    pub const IA16_INDIRECT_OFFSET: Field = Field::new("dst.indirect_offset", 1, 20, 6);
    pub const IA16_ADDR_SUBREG: Field = Field::new("dst.addr_subnr", 1, 26, 3);
}

/// Register-source layouts; the same shape appears in dword 2 (source 0)
/// and dword 3 (source 1)
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceFields {
    pub da1_subreg_nr: Field,
    pub reg_nr: Field,
    pub abs: Field,
    pub negate: Field,
    pub address_mode: Field,
    pub horiz_stride: Field,
    pub width: Field,
    pub vert_stride: Field,
    pub ia_indirect_offset: Field,
    pub ia_addr_subreg: Field,
    pub da16_subreg_nr: Field,
    pub ia16_indirect_offset: Field,
    pub swizzle_x: Field,
    pub swizzle_y: Field,
    pub swizzle_z: Field,
    pub swizzle_w: Field,
}

const fn source_fields(dword: usize, prefix: [&'static str; 16]) -> SourceFields {
    SourceFields {
        da1_subreg_nr: Field::new(prefix[0], dword, 0, 5),
        reg_nr: Field::new(prefix[1], dword, 5, 8),
        abs: Field::new(prefix[2], dword, 13, 1),
        negate: Field::new(prefix[3], dword, 14, 1),
        address_mode: Field::new(prefix[4], dword, 15, 1),
        horiz_stride: Field::new(prefix[5], dword, 16, 2),
        width: Field::new(prefix[6], dword, 18, 3),
        vert_stride: Field::new(prefix[7], dword, 21, 4),
        ia_indirect_offset: Field::new(prefix[8], dword, 0, 10),
        ia_addr_subreg: Field::new(prefix[9], dword, 10, 3),
        da16_subreg_nr: Field::new(prefix[10], dword, 4, 1),
        ia16_indirect_offset: Field::new(prefix[11], dword, 4, 6),
        swizzle_x: Field::new(prefix[12], dword, 0, 2),
        swizzle_y: Field::new(prefix[13], dword, 2, 2),
        swizzle_z: Field::new(prefix[14], dword, 16, 2),
        swizzle_w: Field::new(prefix[15], dword, 18, 2),
    }
}

pub(crate) const SRC0: SourceFields = source_fields(
    2,
    [
        "src0.subnr",
        "src0.nr",
        "src0.abs",
        "src0.negate",
        "src0.address_mode",
        "src0.hstride",
        "src0.width",
        "src0.vstride",
        "src0.indirect_offset",
        "src0.addr_subnr",
        "src0.subnr",
        "src0.indirect_offset",
        "src0.swizzle_x",
        "src0.swizzle_y",
        "src0.swizzle_z",
        "src0.swizzle_w",
    ],
);

pub(crate) const SRC1: SourceFields = source_fields(
    3,
    [
        "src1.subnr",
        "src1.nr",
        "src1.abs",
        "src1.negate",
        "src1.address_mode",
        "src1.hstride",
        "src1.width",
        "src1.vstride",
        "src1.indirect_offset",
        "src1.addr_subnr",
        "src1.subnr",
        "src1.indirect_offset",
        "src1.swizzle_x",
        "src1.swizzle_y",
        "src1.swizzle_z",
        "src1.swizzle_w",
    ],
);

/// Flag register selection lives in the upper bits of dword 2
pub(crate) mod flag {
    use super::Field;

    pub const SUBREG_NR: Field = Field::new("flag.subnr", 2, 25, 1);
    pub const REG_NR: Field = Field::new("flag.nr", 2, 26, 1);
}

/// Whole dword 3 as an immediate
pub(crate) const IMMEDIATE: Field = Field::new("immediate", 3, 0, 32);

/// Structured branch targets in dword 3
pub(crate) mod branch {
    use super::Field;

    pub const JIP: Field = Field::new("jip", 3, 0, 16);
    pub const UIP: Field = Field::new("uip", 3, 16, 16);
}

/// Three-source (align16 only) layout spanning dwords 1 to 3
pub(crate) mod three_src {
    use super::Field;

    pub const DST_FILE: Field = Field::new("dst.file", 1, 0, 1);
    pub const FLAG_SUBREG_NR: Field = Field::new("flag.subnr", 1, 1, 1);
    pub const SRC0_ABS: Field = Field::new("src0.abs", 1, 4, 1);
    pub const SRC0_NEGATE: Field = Field::new("src0.negate", 1, 5, 1);
    pub const SRC1_ABS: Field = Field::new("src1.abs", 1, 6, 1);
    pub const SRC1_NEGATE: Field = Field::new("src1.negate", 1, 7, 1);
    pub const SRC2_ABS: Field = Field::new("src2.abs", 1, 8, 1);
    pub const SRC2_NEGATE: Field = Field::new("src2.negate", 1, 9, 1);
    pub const DST_WRITEMASK: Field = Field::new("dst.writemask", 1, 17, 4);
    pub const DST_SUBREG_NR: Field = Field::new("dst.subnr", 1, 21, 3);
    pub const DST_REG_NR: Field = Field::new("dst.nr", 1, 24, 8);

    pub const SRC0_REP_CTRL: Field = Field::new("src0.rep_ctrl", 2, 0, 1);
    pub const SRC0_SWIZZLE: Field = Field::new("src0.swizzle", 2, 1, 8);
    pub const SRC0_SUBREG_NR: Field = Field::new("src0.subnr", 2, 9, 3);
    pub const SRC0_REG_NR: Field = Field::new("src0.nr", 2, 12, 8);
    pub const SRC1_REP_CTRL: Field = Field::new("src1.rep_ctrl", 2, 21, 1);
    pub const SRC1_SWIZZLE: Field = Field::new("src1.swizzle", 2, 22, 8);
    pub const SRC1_SUBREG_NR_LOW: Field = Field::new("src1.subnr", 2, 30, 2);

    pub const SRC1_SUBREG_NR_HIGH: Field = Field::new("src1.subnr", 3, 0, 1);
    pub const SRC1_REG_NR: Field = Field::new("src1.nr", 3, 1, 8);
    pub const SRC2_REP_CTRL: Field = Field::new("src2.rep_ctrl", 3, 10, 1);
    pub const SRC2_SWIZZLE: Field = Field::new("src2.swizzle", 3, 11, 8);
    pub const SRC2_SUBREG_NR: Field = Field::new("src2.subnr", 3, 19, 3);
    pub const SRC2_REG_NR: Field = Field::new("src2.nr", 3, 22, 8);
}

/// Message descriptor layouts in dword 3
pub(crate) mod message {
    use super::Field;

    pub const FUNCTION_CONTROL: Field = Field::new("msg.function_control", 3, 0, 19);
    pub const HEADER_PRESENT: Field = Field::new("msg.header_present", 3, 19, 1);
    pub const RESPONSE_LENGTH: Field = Field::new("msg.response_length", 3, 20, 5);
    pub const MSG_LENGTH: Field = Field::new("msg.msg_length", 3, 25, 4);
    pub const END_OF_THREAD: Field = Field::new("msg.end_of_thread", 3, 31, 1);

    /// Binding table index, shared by most data port layouts
    pub const BTI: Field = Field::new("msg.bti", 3, 0, 8);
    pub const DP_MSG_TYPE: Field = Field::new("msg.type", 3, 14, 4);
    pub const DP_CATEGORY: Field = Field::new("msg.category", 3, 18, 1);

    pub const GATEWAY_SUB_FUNCTION: Field = Field::new("gateway.sub_function", 3, 0, 3);
    pub const GATEWAY_ACK_REQ: Field = Field::new("gateway.ack_req", 3, 14, 1);
    pub const GATEWAY_NOTIFY: Field = Field::new("gateway.notify", 3, 15, 2);

    pub const SPAWNER_OPCODE: Field = Field::new("spawner.opcode", 3, 0, 1);
    pub const SPAWNER_REQUEST: Field = Field::new("spawner.request", 3, 1, 1);
    pub const SPAWNER_RESOURCE: Field = Field::new("spawner.resource", 3, 4, 1);

    pub const MATH_FUNCTION: Field = Field::new("math.function", 3, 0, 4);
    pub const MATH_INT_TYPE: Field = Field::new("math.int_type", 3, 4, 1);
    pub const MATH_PRECISION: Field = Field::new("math.precision", 3, 5, 1);
    pub const MATH_SATURATE: Field = Field::new("math.saturate", 3, 6, 1);
    pub const MATH_DATA_TYPE: Field = Field::new("math.data_type", 3, 7, 1);
    pub const MATH_SNAPSHOT: Field = Field::new("math.snapshot", 3, 8, 1);

    pub const SAMPLER_INDEX: Field = Field::new("sampler.sampler", 3, 8, 4);
    pub const SAMPLER_MSG_TYPE: Field = Field::new("sampler.msg_type", 3, 12, 5);
    pub const SAMPLER_SIMD_MODE: Field = Field::new("sampler.simd_mode", 3, 17, 2);

    pub const CACHE_MSG_CONTROL: Field = Field::new("sampler_cache.msg_control", 3, 8, 5);
    pub const CACHE_MSG_TYPE: Field = Field::new("sampler_cache.msg_type", 3, 13, 3);

    pub const UNTYPED_RGBA: Field = Field::new("untyped.rgba", 3, 8, 4);
    pub const UNTYPED_SIMD_MODE: Field = Field::new("untyped.simd_mode", 3, 12, 2);

    pub const BYTE_SIMD_MODE: Field = Field::new("byte.simd_mode", 3, 8, 1);
    pub const BYTE_DATA_SIZE: Field = Field::new("byte.data_size", 3, 10, 2);

    pub const SCRATCH_OFFSET: Field = Field::new("scratch.offset", 3, 0, 12);
    pub const SCRATCH_BLOCK_SIZE: Field = Field::new("scratch.block_size", 3, 12, 2);
    pub const SCRATCH_INVALIDATE: Field = Field::new("scratch.invalidate_after_read", 3, 15, 1);
    pub const SCRATCH_CHANNEL_MODE: Field = Field::new("scratch.channel_mode", 3, 16, 1);
    pub const SCRATCH_WRITE: Field = Field::new("scratch.msg_type", 3, 17, 1);

    pub const OBLOCK_BLOCK_SIZE: Field = Field::new("oblock.block_size", 3, 8, 3);
    pub const DWORD_BLOCK_SIZE: Field = Field::new("dword.block_size", 3, 8, 2);
    pub const INVALIDATE_AFTER_READ: Field = Field::new("msg.invalidate_after_read", 3, 13, 1);

    pub const TYPED_CHANNEL_MASK: Field = Field::new("typed.channel_mask", 3, 8, 4);
    pub const TYPED_SLOT: Field = Field::new("typed.slot", 3, 12, 2);

    pub const FENCE_COMMIT_ENABLE: Field = Field::new("fence.commit_enable", 3, 13, 1);

    pub const ATOMIC_OP: Field = Field::new("atomic.op", 3, 8, 4);
    pub const ATOMIC_SIMD_MODE: Field = Field::new("atomic.simd_mode", 3, 12, 1);
    pub const ATOMIC_RETURN_DATA: Field = Field::new("atomic.return_data", 3, 13, 1);
}

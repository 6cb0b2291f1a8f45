//! Send message descriptors
//!
//! A `send` carries its message descriptor as an immediate in dword 3. The
//! low 19 bits (function control) are interpreted by the shared function the
//! message is routed to; the upper bits are common to every message.

use std::fmt;

use super::defs::{
    AtomicOp, AtomicSimdMode, ByteScatterSize, ByteSimdMode, DataPortMessage, GatewayFunction, MathFunction,
    SamplerSimdMode, SharedFunction, TypedMessage, UntypedSimdMode,
};
use super::layout::message as f;
use super::word::InstructionWord;
use crate::error::{IsaError, Result};

/// Which port a dword gather/scatter goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DwordPort {
    /// Read-only constant cache
    Constant,
    /// Data cache, for parts whose constant cache path is unreliable
    DataCache,
}

/// Shared-function specific part of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Message {
    Gateway {
        function: GatewayFunction,
        ack_req: bool,
        notify: u8,
    },
    Spawner {
        dereference_urb: bool,
        child_thread: bool,
        release_resource: bool,
    },
    Math {
        function: MathFunction,
        signed: bool,
        partial_precision: bool,
        saturate: bool,
        scalar: bool,
        snapshot: bool,
    },
    Sampler {
        bti: u8,
        sampler: u8,
        msg_type: u8,
        simd_mode: SamplerSimdMode,
    },
    /// Data port read through the sampler cache
    SamplerCache {
        bti: u8,
        msg_control: u8,
        msg_type: u8,
    },
    Untyped {
        bti: u8,
        /// Disabled channels; bit set means the channel is skipped
        rgba: u8,
        simd_mode: UntypedSimdMode,
        msg_type: DataPortMessage,
    },
    Byte {
        bti: u8,
        simd_mode: ByteSimdMode,
        data_size: ByteScatterSize,
        msg_type: DataPortMessage,
    },
    Scratch {
        /// Offset in 32-byte units
        offset: u16,
        block_size: u8,
        invalidate_after_read: bool,
        dword_channels: bool,
        write: bool,
    },
    OBlock {
        bti: u8,
        block_size: u8,
        invalidate_after_read: bool,
        msg_type: DataPortMessage,
    },
    Dword {
        port: DwordPort,
        bti: u8,
        block_size: u8,
        invalidate_after_read: bool,
        msg_type: DataPortMessage,
    },
    Typed {
        bti: u8,
        channel_mask: u8,
        slot: u8,
        msg_type: TypedMessage,
    },
    MemoryFence {
        bti: u8,
        commit_enable: bool,
    },
    Atomic {
        bti: u8,
        op: AtomicOp,
        simd_mode: AtomicSimdMode,
        return_data: bool,
    },
}

impl Message {
    /// Shared function the message is routed to
    pub fn shared_function(&self) -> SharedFunction {
        match self {
            Self::Gateway { .. } => SharedFunction::MessageGateway,
            Self::Spawner { .. } => SharedFunction::ThreadSpawner,
            Self::Math { .. } => SharedFunction::Math,
            Self::Sampler { .. } => SharedFunction::Sampler,
            Self::SamplerCache { .. } => SharedFunction::DataPortSampler,
            Self::Typed { .. } => SharedFunction::DataPortRender,
            Self::Dword {
                port: DwordPort::Constant,
                ..
            } => SharedFunction::DataPortConstant,
            Self::Untyped { .. }
            | Self::Byte { .. }
            | Self::Scratch { .. }
            | Self::OBlock { .. }
            | Self::Dword {
                port: DwordPort::DataCache,
                ..
            }
            | Self::MemoryFence { .. }
            | Self::Atomic { .. } => SharedFunction::DataPortData,
        }
    }

    fn check_msg_type(&self) -> Result<()> {
        use DataPortMessage::*;
        let ok = match self {
            Self::Untyped { msg_type, .. } => matches!(msg_type, UntypedRead | UntypedWrite),
            Self::Byte { msg_type, .. } => matches!(msg_type, ByteGather | ByteScatter),
            Self::OBlock { msg_type, .. } => matches!(
                msg_type,
                OBlockRead | UnalignedOBlockRead | ODBlockRead | OBlockWrite | ODBlockWrite
            ),
            Self::Dword { msg_type, .. } => matches!(msg_type, DwordGather | DwordScatter),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(IsaError::unsupported("send", format!("message type does not belong to {self:?}")))
        }
    }
}

/// Complete message descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MessageDescriptor {
    pub header_present: bool,
    /// Registers written back
    pub response_length: u8,
    /// Payload registers sent
    pub msg_length: u8,
    pub end_of_thread: bool,
    pub message: Message,
}

impl MessageDescriptor {
    pub const fn new(message: Message, msg_length: u8, response_length: u8) -> Self {
        Self {
            header_present: false,
            response_length,
            msg_length,
            end_of_thread: false,
            message,
        }
    }

    pub const fn with_header(mut self) -> Self {
        self.header_present = true;
        self
    }

    pub const fn with_end_of_thread(mut self) -> Self {
        self.end_of_thread = true;
        self
    }

    pub fn shared_function(&self) -> SharedFunction {
        self.message.shared_function()
    }

    /// Write the descriptor into dword 3
    pub(crate) fn encode(&self, word: &mut InstructionWord) -> Result<()> {
        self.message.check_msg_type()?;
        word.set_bool(f::HEADER_PRESENT, self.header_present)?;
        word.set(f::RESPONSE_LENGTH, u32::from(self.response_length))?;
        word.set(f::MSG_LENGTH, u32::from(self.msg_length))?;
        word.set_bool(f::END_OF_THREAD, self.end_of_thread)?;

        match self.message {
            Message::Gateway {
                function,
                ack_req,
                notify,
            } => {
                word.set(f::GATEWAY_SUB_FUNCTION, function.bits())?;
                word.set_bool(f::GATEWAY_ACK_REQ, ack_req)?;
                word.set(f::GATEWAY_NOTIFY, u32::from(notify))?;
            }
            Message::Spawner {
                dereference_urb,
                child_thread,
                release_resource,
            } => {
                word.set_bool(f::SPAWNER_OPCODE, dereference_urb)?;
                word.set_bool(f::SPAWNER_REQUEST, child_thread)?;
                word.set_bool(f::SPAWNER_RESOURCE, release_resource)?;
            }
            Message::Math {
                function,
                signed,
                partial_precision,
                saturate,
                scalar,
                snapshot,
            } => {
                word.set(f::MATH_FUNCTION, function.bits())?;
                word.set_bool(f::MATH_INT_TYPE, signed)?;
                word.set_bool(f::MATH_PRECISION, partial_precision)?;
                word.set_bool(f::MATH_SATURATE, saturate)?;
                word.set_bool(f::MATH_DATA_TYPE, scalar)?;
                word.set_bool(f::MATH_SNAPSHOT, snapshot)?;
            }
            Message::Sampler {
                bti,
                sampler,
                msg_type,
                simd_mode,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::SAMPLER_INDEX, u32::from(sampler))?;
                word.set(f::SAMPLER_MSG_TYPE, u32::from(msg_type))?;
                word.set(f::SAMPLER_SIMD_MODE, simd_mode.bits())?;
            }
            Message::SamplerCache {
                bti,
                msg_control,
                msg_type,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::CACHE_MSG_CONTROL, u32::from(msg_control))?;
                word.set(f::CACHE_MSG_TYPE, u32::from(msg_type))?;
            }
            Message::Untyped {
                bti,
                rgba,
                simd_mode,
                msg_type,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::UNTYPED_RGBA, u32::from(rgba))?;
                word.set(f::UNTYPED_SIMD_MODE, simd_mode.bits())?;
                word.set(f::DP_MSG_TYPE, msg_type.bits())?;
            }
            Message::Byte {
                bti,
                simd_mode,
                data_size,
                msg_type,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::BYTE_SIMD_MODE, simd_mode.bits())?;
                word.set(f::BYTE_DATA_SIZE, data_size.bits())?;
                word.set(f::DP_MSG_TYPE, msg_type.bits())?;
            }
            Message::Scratch {
                offset,
                block_size,
                invalidate_after_read,
                dword_channels,
                write,
            } => {
                word.set(f::SCRATCH_OFFSET, u32::from(offset))?;
                word.set(f::SCRATCH_BLOCK_SIZE, u32::from(block_size))?;
                word.set_bool(f::SCRATCH_INVALIDATE, invalidate_after_read)?;
                word.set_bool(f::SCRATCH_CHANNEL_MODE, dword_channels)?;
                word.set_bool(f::SCRATCH_WRITE, write)?;
                word.set_bool(f::DP_CATEGORY, true)?;
            }
            Message::OBlock {
                bti,
                block_size,
                invalidate_after_read,
                msg_type,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::OBLOCK_BLOCK_SIZE, u32::from(block_size))?;
                word.set_bool(f::INVALIDATE_AFTER_READ, invalidate_after_read)?;
                word.set(f::DP_MSG_TYPE, msg_type.bits())?;
            }
            Message::Dword {
                bti,
                block_size,
                invalidate_after_read,
                msg_type,
                ..
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::DWORD_BLOCK_SIZE, u32::from(block_size))?;
                word.set_bool(f::INVALIDATE_AFTER_READ, invalidate_after_read)?;
                word.set(f::DP_MSG_TYPE, msg_type.bits())?;
            }
            Message::Typed {
                bti,
                channel_mask,
                slot,
                msg_type,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::TYPED_CHANNEL_MASK, u32::from(channel_mask))?;
                word.set(f::TYPED_SLOT, u32::from(slot))?;
                word.set(f::DP_MSG_TYPE, msg_type.bits())?;
            }
            Message::MemoryFence { bti, commit_enable } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set_bool(f::FENCE_COMMIT_ENABLE, commit_enable)?;
                word.set(f::DP_MSG_TYPE, DataPortMessage::MemoryFence.bits())?;
            }
            Message::Atomic {
                bti,
                op,
                simd_mode,
                return_data,
            } => {
                word.set(f::BTI, u32::from(bti))?;
                word.set(f::ATOMIC_OP, op.bits())?;
                word.set(f::ATOMIC_SIMD_MODE, simd_mode.bits())?;
                word.set_bool(f::ATOMIC_RETURN_DATA, return_data)?;
                word.set(f::DP_MSG_TYPE, DataPortMessage::UntypedAtomic.bits())?;
            }
        }
        Ok(())
    }

    /// Read a descriptor routed to `sfid` back out of dword 3
    pub(crate) fn decode(word: &InstructionWord, sfid: SharedFunction) -> Result<Self> {
        let bti = word.get(f::BTI) as u8;
        let message = match sfid {
            SharedFunction::MessageGateway => Message::Gateway {
                function: GatewayFunction::from_bits(word.get(f::GATEWAY_SUB_FUNCTION))?,
                ack_req: word.get_bool(f::GATEWAY_ACK_REQ),
                notify: word.get(f::GATEWAY_NOTIFY) as u8,
            },
            SharedFunction::ThreadSpawner => Message::Spawner {
                dereference_urb: word.get_bool(f::SPAWNER_OPCODE),
                child_thread: word.get_bool(f::SPAWNER_REQUEST),
                release_resource: word.get_bool(f::SPAWNER_RESOURCE),
            },
            SharedFunction::Math => Message::Math {
                function: MathFunction::from_bits(word.get(f::MATH_FUNCTION))?,
                signed: word.get_bool(f::MATH_INT_TYPE),
                partial_precision: word.get_bool(f::MATH_PRECISION),
                saturate: word.get_bool(f::MATH_SATURATE),
                scalar: word.get_bool(f::MATH_DATA_TYPE),
                snapshot: word.get_bool(f::MATH_SNAPSHOT),
            },
            SharedFunction::Sampler => Message::Sampler {
                bti,
                sampler: word.get(f::SAMPLER_INDEX) as u8,
                msg_type: word.get(f::SAMPLER_MSG_TYPE) as u8,
                simd_mode: SamplerSimdMode::from_bits(word.get(f::SAMPLER_SIMD_MODE))?,
            },
            SharedFunction::DataPortSampler => Message::SamplerCache {
                bti,
                msg_control: word.get(f::CACHE_MSG_CONTROL) as u8,
                msg_type: word.get(f::CACHE_MSG_TYPE) as u8,
            },
            SharedFunction::DataPortRender => Message::Typed {
                bti,
                channel_mask: word.get(f::TYPED_CHANNEL_MASK) as u8,
                slot: word.get(f::TYPED_SLOT) as u8,
                msg_type: TypedMessage::from_bits(word.get(f::DP_MSG_TYPE))?,
            },
            SharedFunction::DataPortConstant => decode_dword(word, DwordPort::Constant)?,
            SharedFunction::DataPortData => decode_data_port(word)?,
            SharedFunction::Null | SharedFunction::Urb | SharedFunction::DataPort1Data => {
                return Err(IsaError::unsupported(
                    "send",
                    format!("no message layout for shared function {}", sfid.name()),
                ))
            }
        };

        Ok(Self {
            header_present: word.get_bool(f::HEADER_PRESENT),
            response_length: word.get(f::RESPONSE_LENGTH) as u8,
            msg_length: word.get(f::MSG_LENGTH) as u8,
            end_of_thread: word.get_bool(f::END_OF_THREAD),
            message,
        })
    }
}

fn decode_dword(word: &InstructionWord, port: DwordPort) -> Result<Message> {
    let message = Message::Dword {
        port,
        bti: word.get(f::BTI) as u8,
        block_size: word.get(f::DWORD_BLOCK_SIZE) as u8,
        invalidate_after_read: word.get_bool(f::INVALIDATE_AFTER_READ),
        msg_type: DataPortMessage::from_bits(word.get(f::DP_MSG_TYPE))?,
    };
    message.check_msg_type()?;
    Ok(message)
}

fn decode_data_port(word: &InstructionWord) -> Result<Message> {
    if word.get_bool(f::DP_CATEGORY) {
        return Ok(Message::Scratch {
            offset: word.get(f::SCRATCH_OFFSET) as u16,
            block_size: word.get(f::SCRATCH_BLOCK_SIZE) as u8,
            invalidate_after_read: word.get_bool(f::SCRATCH_INVALIDATE),
            dword_channels: word.get_bool(f::SCRATCH_CHANNEL_MODE),
            write: word.get_bool(f::SCRATCH_WRITE),
        });
    }

    let bti = word.get(f::BTI) as u8;
    let msg_type = DataPortMessage::from_bits(word.get(f::DP_MSG_TYPE))?;
    use DataPortMessage::*;
    Ok(match msg_type {
        UntypedRead | UntypedWrite => Message::Untyped {
            bti,
            rgba: word.get(f::UNTYPED_RGBA) as u8,
            simd_mode: UntypedSimdMode::from_bits(word.get(f::UNTYPED_SIMD_MODE))?,
            msg_type,
        },
        ByteGather | ByteScatter => Message::Byte {
            bti,
            simd_mode: ByteSimdMode::from_bits(word.get(f::BYTE_SIMD_MODE))?,
            data_size: ByteScatterSize::from_bits(word.get(f::BYTE_DATA_SIZE))?,
            msg_type,
        },
        OBlockRead | UnalignedOBlockRead | ODBlockRead | OBlockWrite | ODBlockWrite => Message::OBlock {
            bti,
            block_size: word.get(f::OBLOCK_BLOCK_SIZE) as u8,
            invalidate_after_read: word.get_bool(f::INVALIDATE_AFTER_READ),
            msg_type,
        },
        DwordGather | DwordScatter => decode_dword(word, DwordPort::DataCache)?,
        MemoryFence => Message::MemoryFence {
            bti,
            commit_enable: word.get_bool(f::FENCE_COMMIT_ENABLE),
        },
        UntypedAtomic => Message::Atomic {
            bti,
            op: AtomicOp::from_bits(word.get(f::ATOMIC_OP))?,
            simd_mode: AtomicSimdMode::from_bits(word.get(f::ATOMIC_SIMD_MODE))?,
            return_data: word.get_bool(f::ATOMIC_RETURN_DATA),
        },
    })
}

impl fmt::Display for Message {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gateway { function, .. } => write!(out, "gateway({function:?})"),
            Self::Spawner {
                dereference_urb,
                child_thread,
                release_resource,
            } => write!(
                out,
                "spawner(deref {}, child {}, release {})",
                u8::from(*dereference_urb),
                u8::from(*child_thread),
                u8::from(*release_resource)
            ),
            Self::Math { function, .. } => write!(out, "math({})", function.name()),
            Self::Sampler {
                bti,
                sampler,
                msg_type,
                simd_mode,
            } => write!(out, "sample(bti {bti}, sampler {sampler}, type {msg_type}, {simd_mode:?})"),
            Self::SamplerCache {
                bti,
                msg_control,
                msg_type,
            } => write!(out, "sampler_cache(bti {bti}, control {msg_control}, type {msg_type})"),
            Self::Untyped {
                bti,
                rgba,
                simd_mode,
                msg_type,
            } => write!(out, "{}(bti {bti}, rgba {rgba:#x}, {simd_mode:?})", msg_type.name()),
            Self::Byte {
                bti,
                simd_mode,
                data_size,
                msg_type,
            } => write!(out, "{}(bti {bti}, {data_size:?}, {simd_mode:?})", msg_type.name()),
            Self::Scratch {
                offset,
                block_size,
                write,
                ..
            } => write!(
                out,
                "scratch_{}(offset {offset}, blocks {block_size})",
                if *write { "write" } else { "read" }
            ),
            Self::OBlock {
                bti,
                block_size,
                msg_type,
                ..
            } => write!(out, "{}(bti {bti}, blocks {block_size})", msg_type.name()),
            Self::Dword {
                port,
                bti,
                block_size,
                msg_type,
                ..
            } => write!(out, "{}(bti {bti}, blocks {block_size}, {port:?})", msg_type.name()),
            Self::Typed {
                bti,
                channel_mask,
                slot,
                msg_type,
            } => write!(out, "{msg_type:?}(bti {bti}, mask {channel_mask:#x}, slot {slot})"),
            Self::MemoryFence { bti, commit_enable } => {
                write!(out, "memory_fence(bti {bti}, commit {})", u8::from(*commit_enable))
            }
            Self::Atomic {
                bti,
                op,
                simd_mode,
                return_data,
            } => write!(
                out,
                "atomic_{op:?}(bti {bti}, {simd_mode:?}{})",
                if *return_data { ", return" } else { "" }
            ),
        }
    }
}

impl fmt::Display for MessageDescriptor {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            out,
            "{} {} mlen {} rlen {}",
            self.shared_function().name(),
            self.message,
            self.msg_length,
            self.response_length
        )?;
        if self.header_present {
            out.write_str(" header")?;
        }
        if self.end_of_thread {
            out.write_str(" EOT")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(descriptor: MessageDescriptor) -> MessageDescriptor {
        let mut word = InstructionWord::default();
        descriptor.encode(&mut word).unwrap();
        MessageDescriptor::decode(&word, descriptor.shared_function()).unwrap()
    }

    #[test]
    fn test_untyped_read_layout() {
        let descriptor = MessageDescriptor::new(
            Message::Untyped {
                bti: 1,
                rgba: 0xe,
                simd_mode: UntypedSimdMode::Simd8,
                msg_type: DataPortMessage::UntypedRead,
            },
            1,
            1,
        );
        let mut word = InstructionWord::default();
        descriptor.encode(&mut word).unwrap();
        let dw3 = word.dwords()[3];
        assert_eq!(dw3 & 0xff, 1);
        assert_eq!((dw3 >> 8) & 0xf, 0xe);
        assert_eq!((dw3 >> 12) & 0x3, 2);
        assert_eq!((dw3 >> 14) & 0xf, 5);
        assert_eq!((dw3 >> 20) & 0x1f, 1);
        assert_eq!((dw3 >> 25) & 0xf, 1);
        assert_eq!(round_trip(descriptor), descriptor);
    }

    #[test]
    fn test_scratch_uses_category_bit() {
        let descriptor = MessageDescriptor::new(
            Message::Scratch {
                offset: 12,
                block_size: 1,
                invalidate_after_read: false,
                dword_channels: true,
                write: true,
            },
            2,
            0,
        )
        .with_header();
        let mut word = InstructionWord::default();
        descriptor.encode(&mut word).unwrap();
        assert_ne!(word.dwords()[3] & (1 << 18), 0);
        assert_eq!(round_trip(descriptor), descriptor);
    }

    #[test]
    fn test_dword_port_selects_sfid() {
        let constant = Message::Dword {
            port: DwordPort::Constant,
            bti: 2,
            block_size: 0,
            invalidate_after_read: false,
            msg_type: DataPortMessage::DwordGather,
        };
        assert_eq!(constant.shared_function(), SharedFunction::DataPortConstant);
        let data = Message::Dword {
            port: DwordPort::DataCache,
            bti: 2,
            block_size: 0,
            invalidate_after_read: false,
            msg_type: DataPortMessage::DwordGather,
        };
        assert_eq!(data.shared_function(), SharedFunction::DataPortData);
        let descriptor = MessageDescriptor::new(data, 1, 1);
        assert_eq!(round_trip(descriptor), descriptor);
    }

    #[test]
    fn test_mismatched_message_type_rejected() {
        let descriptor = MessageDescriptor::new(
            Message::Untyped {
                bti: 0,
                rgba: 0,
                simd_mode: UntypedSimdMode::Simd16,
                msg_type: DataPortMessage::ByteGather,
            },
            2,
            2,
        );
        let mut word = InstructionWord::default();
        assert!(matches!(
            descriptor.encode(&mut word),
            Err(IsaError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_response_length_overflow() {
        let descriptor = MessageDescriptor::new(
            Message::MemoryFence {
                bti: 0,
                commit_enable: true,
            },
            1,
            32,
        );
        let mut word = InstructionWord::default();
        assert!(matches!(
            descriptor.encode(&mut word),
            Err(IsaError::FieldOutOfRange { bits: 5, .. })
        ));
    }

    #[test]
    fn test_atomic_and_gateway_round_trip() {
        let atomic = MessageDescriptor::new(
            Message::Atomic {
                bti: 3,
                op: AtomicOp::Add,
                simd_mode: AtomicSimdMode::Simd8,
                return_data: true,
            },
            2,
            1,
        );
        assert_eq!(round_trip(atomic), atomic);

        let barrier = MessageDescriptor::new(
            Message::Gateway {
                function: GatewayFunction::BarrierMessage,
                ack_req: false,
                notify: 0,
            },
            1,
            0,
        );
        assert_eq!(round_trip(barrier), barrier);
    }

    #[test]
    fn test_urb_has_no_layout() {
        let word = InstructionWord::default();
        assert!(MessageDescriptor::decode(&word, SharedFunction::Urb).is_err());
    }

    #[test]
    fn test_display() {
        let descriptor = MessageDescriptor::new(
            Message::Untyped {
                bti: 1,
                rgba: 0xe,
                simd_mode: UntypedSimdMode::Simd8,
                msg_type: DataPortMessage::UntypedRead,
            },
            1,
            1,
        );
        assert_eq!(
            descriptor.to_string(),
            "data untyped_read(bti 1, rgba 0xe, Simd8) mlen 1 rlen 1"
        );
    }
}

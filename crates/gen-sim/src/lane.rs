//! Lane element types
//!
//! Every lane is 32 bits wide. Float lanes follow IEEE-754 single precision,
//! integer lanes wrap on overflow, and mask lanes hold a full 32-bit word
//! that is all ones for true and zero for false.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use num_traits::{WrappingAdd, WrappingMul, WrappingSub};

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A 32-bit value held by one SIMD lane
pub trait Lane: sealed::Sealed + Pod + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Short type name used in diagnostics
    const NAME: &'static str;
}

/// Lane-wide boolean produced by comparisons
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable, serde::Serialize, serde::Deserialize)]
pub struct Mask(pub u32);

impl Mask {
    pub const TRUE: Self = Self(u32::MAX);
    pub const FALSE: Self = Self(0);

    pub const fn from_bool(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    /// A lane is set when its top bit is set
    pub const fn is_set(self) -> bool {
        self.0 >> 31 == 1
    }
}

impl From<bool> for Mask {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask({:#010x})", self.0)
    }
}

macro_rules! impl_lane {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Lane for $ty {
                const NAME: &'static str = $name;
            }
        )*
    };
}

impl_lane!(f32 => "f32", i32 => "i32", u32 => "u32", Mask => "mask");

/// Reinterpret the bits of one lane as another lane type
pub fn cast_lane<T: Lane, U: Lane>(value: T) -> U {
    bytemuck::cast(value)
}

// ================================================================================================
// Lane Operations
// ================================================================================================

/// Arithmetic on one lane
///
/// Integer lanes wrap. Integer division by zero yields all ones for the
/// quotient and the dividend for the remainder; `MIN / -1` wraps to `MIN`.
/// Float remainder has C `fmod` semantics.
pub trait ArithLane: Lane {
    fn lane_add(self, rhs: Self) -> Self;
    fn lane_sub(self, rhs: Self) -> Self;
    fn lane_mul(self, rhs: Self) -> Self;
    fn lane_div(self, rhs: Self) -> Self;
    fn lane_rem(self, rhs: Self) -> Self;
}

impl ArithLane for f32 {
    fn lane_add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn lane_sub(self, rhs: Self) -> Self {
        self - rhs
    }

    fn lane_mul(self, rhs: Self) -> Self {
        self * rhs
    }

    fn lane_div(self, rhs: Self) -> Self {
        self / rhs
    }

    fn lane_rem(self, rhs: Self) -> Self {
        self % rhs
    }
}

macro_rules! impl_int_arith {
    ($($ty:ty),*) => {
        $(
            impl ArithLane for $ty {
                fn lane_add(self, rhs: Self) -> Self {
                    WrappingAdd::wrapping_add(&self, &rhs)
                }

                fn lane_sub(self, rhs: Self) -> Self {
                    WrappingSub::wrapping_sub(&self, &rhs)
                }

                fn lane_mul(self, rhs: Self) -> Self {
                    WrappingMul::wrapping_mul(&self, &rhs)
                }

                fn lane_div(self, rhs: Self) -> Self {
                    if rhs == 0 {
                        !0
                    } else {
                        self.wrapping_div(rhs)
                    }
                }

                fn lane_rem(self, rhs: Self) -> Self {
                    if rhs == 0 {
                        self
                    } else {
                        self.wrapping_rem(rhs)
                    }
                }
            }
        )*
    };
}

impl_int_arith!(i32, u32);

/// Bitwise operations on one lane
pub trait BitLane: Lane {
    fn lane_and(self, rhs: Self) -> Self;
    fn lane_or(self, rhs: Self) -> Self;
    fn lane_xor(self, rhs: Self) -> Self;
    fn lane_not(self) -> Self;
}

macro_rules! impl_bit_lane {
    ($($ty:ty),*) => {
        $(
            impl BitLane for $ty {
                fn lane_and(self, rhs: Self) -> Self {
                    self & rhs
                }

                fn lane_or(self, rhs: Self) -> Self {
                    self | rhs
                }

                fn lane_xor(self, rhs: Self) -> Self {
                    self ^ rhs
                }

                fn lane_not(self) -> Self {
                    !self
                }
            }
        )*
    };
}

impl_bit_lane!(i32, u32);

impl BitLane for Mask {
    fn lane_and(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }

    fn lane_or(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }

    fn lane_xor(self, rhs: Self) -> Self {
        Self(self.0 ^ rhs.0)
    }

    fn lane_not(self) -> Self {
        Self(!self.0)
    }
}

/// Ordered comparisons in the lane's own domain: IEEE for floats (every
/// comparison with NaN is false except `ne`), signed for `i32`, unsigned
/// for `u32`
pub trait CmpLane: Lane {
    fn lane_eq(self, rhs: Self) -> bool;
    fn lane_lt(self, rhs: Self) -> bool;
    fn lane_le(self, rhs: Self) -> bool;

    fn lane_ne(self, rhs: Self) -> bool {
        !self.lane_eq(rhs)
    }

    fn lane_gt(self, rhs: Self) -> bool {
        rhs.lane_lt(self)
    }

    fn lane_ge(self, rhs: Self) -> bool {
        rhs.lane_le(self)
    }
}

macro_rules! impl_cmp_lane {
    ($($ty:ty),*) => {
        $(
            impl CmpLane for $ty {
                fn lane_eq(self, rhs: Self) -> bool {
                    self == rhs
                }

                fn lane_lt(self, rhs: Self) -> bool {
                    self < rhs
                }

                fn lane_le(self, rhs: Self) -> bool {
                    self <= rhs
                }
            }
        )*
    };
}

impl_cmp_lane!(f32, i32, u32);

/// Integer lanes, compared either signed or unsigned regardless of the
/// declared lane type
pub trait IntLane: ArithLane + BitLane + CmpLane {
    fn as_signed(self) -> i32 {
        cast_lane(self)
    }

    fn as_unsigned(self) -> u32 {
        cast_lane(self)
    }
}

impl IntLane for i32 {}
impl IntLane for u32 {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_division_by_zero() {
        assert_eq!(7i32.lane_div(0), -1);
        assert_eq!(7i32.lane_rem(0), 7);
        assert_eq!(7u32.lane_div(0), u32::MAX);
        assert_eq!(7u32.lane_rem(0), 7);
    }

    #[test]
    fn test_int_overflow_wraps() {
        assert_eq!(i32::MIN.lane_div(-1), i32::MIN);
        assert_eq!(i32::MIN.lane_rem(-1), 0);
        assert_eq!(i32::MAX.lane_add(1), i32::MIN);
        assert_eq!(0u32.lane_sub(1), u32::MAX);
        assert_eq!(0x1_0000u32.lane_mul(0x1_0000), 0);
    }

    #[test]
    fn test_float_lanes() {
        assert_eq!(7.5f32.lane_rem(2.0), 1.5);
        assert_eq!((-7.5f32).lane_rem(2.0), -1.5);
        assert!(f32::NAN.lane_ne(f32::NAN));
        assert!(!f32::NAN.lane_eq(f32::NAN));
        assert!(!f32::NAN.lane_ge(0.0));
        assert!(1.0f32.lane_gt(0.5));
    }

    #[test]
    fn test_mask_lanes() {
        assert!(Mask::TRUE.is_set());
        assert!(!Mask::FALSE.is_set());
        assert_eq!(Mask::from(true), Mask::TRUE);
        assert_eq!(Mask::TRUE.lane_and(Mask::FALSE), Mask::FALSE);
        assert_eq!(Mask::FALSE.lane_not(), Mask::TRUE);
    }

    #[test]
    fn test_signedness_views() {
        assert_eq!((-1i32).as_unsigned(), u32::MAX);
        assert_eq!(u32::MAX.as_signed(), -1);
        assert_eq!(cast_lane::<f32, u32>(1.0), 0x3f80_0000);
    }
}

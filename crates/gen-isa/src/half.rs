//! IEEE-754 binary16 values used for half-precision immediates and constants
//!
//! [`HalfFloat`] stores the raw 16-bit pattern. Every operation widens both
//! operands, computes in double precision and narrows the result back with
//! round-to-nearest-even. For `+ - * /` the intermediate precision is wide
//! enough that the double rounding is exact.
//!
//! ```rust
//! use gen_isa::HalfFloat;
//!
//! let a = HalfFloat::from_f32(1.5);
//! let b = HalfFloat::from_f32(0.25);
//! assert_eq!((a + b).to_f32(), 1.75);
//! assert_eq!(HalfFloat::from_bits(0x3c00).to_f32(), 1.0);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use half::f16;

/// Opaque binary16 bit pattern
#[derive(Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[repr(transparent)]
pub struct HalfFloat(u16);

impl HalfFloat {
    pub const ZERO: Self = Self(0x0000);
    pub const ONE: Self = Self(0x3c00);
    pub const INFINITY: Self = Self(0x7c00);
    pub const NEG_INFINITY: Self = Self(0xfc00);
    pub const NAN: Self = Self(0x7e00);
    /// Largest finite value (65504)
    pub const MAX: Self = Self(0x7bff);

    /// Wrap a raw bit pattern. Any pattern is accepted, including NaNs.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bit pattern
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Nearest representable value, ties to even; overflow saturates to infinity.
    pub fn from_u16(value: u16) -> Self {
        Self::from_f64(f64::from(value))
    }

    /// Nearest representable value, ties to even; overflow saturates to infinity.
    pub fn from_i16(value: i16) -> Self {
        Self::from_f64(f64::from(value))
    }

    pub fn from_f32(value: f32) -> Self {
        Self(f16::from_f32(value).to_bits())
    }

    pub fn from_f64(value: f64) -> Self {
        Self(f16::from_f64(value).to_bits())
    }

    /// Exact widening
    pub fn to_f32(self) -> f32 {
        f16::from_bits(self.0).to_f32()
    }

    /// Exact widening
    pub fn to_f64(self) -> f64 {
        f16::from_bits(self.0).to_f64()
    }

    /// Round to nearest even, then clamp to `0..=u16::MAX`. NaN converts to 0.
    pub fn to_u16(self) -> u16 {
        // `as` saturates and maps NaN to zero
        self.to_f64().round_ties_even() as u16
    }

    /// Round to nearest even, then clamp to `i16::MIN..=i16::MAX`. NaN converts to 0.
    pub fn to_i16(self) -> i16 {
        self.to_f64().round_ties_even() as i16
    }

    pub fn is_nan(self) -> bool {
        f16::from_bits(self.0).is_nan()
    }

    pub fn is_infinite(self) -> bool {
        f16::from_bits(self.0).is_infinite()
    }

    /// Truthiness used by the logical operators: only positive and negative zero are false.
    pub fn is_truthy(self) -> bool {
        self.0 & 0x7fff != 0
    }

    /// Logical and: false if either operand is zero.
    pub fn and(self, rhs: Self) -> bool {
        self.is_truthy() && rhs.is_truthy()
    }

    /// Logical or: false only if both operands are zero.
    pub fn or(self, rhs: Self) -> bool {
        self.is_truthy() || rhs.is_truthy()
    }

    /// IEEE-754 remainder: `self - n * rhs` with `n = self / rhs` rounded to nearest even.
    ///
    /// This differs from C `fmod` (which truncates the quotient) whenever the
    /// truncated remainder exceeds half of `rhs`.
    pub fn ieee_rem(self, rhs: Self) -> Self {
        let a = self.to_f64();
        let b = rhs.to_f64();
        let mut r = a % b;
        if r.is_nan() || b.is_infinite() {
            return Self::from_f64(r);
        }
        let half_b = b.abs() / 2.0;
        if r.abs() > half_b || (r.abs() == half_b && truncated_quotient_is_odd(a, r, b)) {
            r -= b.abs().copysign(r);
        }
        // A zero remainder keeps the sign of the dividend
        if r == 0.0 {
            r = 0.0f64.copysign(a);
        }
        Self::from_f64(r)
    }
}

// Both inputs come from binary16, so `(a - r) / b` is an exact integer in f64.
fn truncated_quotient_is_odd(a: f64, r: f64, b: f64) -> bool {
    ((a - r) / b).abs() % 2.0 == 1.0
}

impl fmt::Debug for HalfFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HalfFloat({:#06x} = {})", self.0, self.to_f32())
    }
}

impl fmt::Display for HalfFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f32(), f)
    }
}

impl From<HalfFloat> for f32 {
    fn from(value: HalfFloat) -> Self {
        value.to_f32()
    }
}

impl From<HalfFloat> for f64 {
    fn from(value: HalfFloat) -> Self {
        value.to_f64()
    }
}

impl PartialEq for HalfFloat {
    fn eq(&self, other: &Self) -> bool {
        self.to_f32() == other.to_f32()
    }
}

impl PartialOrd for HalfFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.to_f32().partial_cmp(&other.to_f32())
    }
}

macro_rules! half_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for HalfFloat {
            type Output = HalfFloat;

            fn $method(self, rhs: HalfFloat) -> HalfFloat {
                HalfFloat::from_f64(self.to_f64() $op rhs.to_f64())
            }
        }
    };
}

half_binary_op!(Add, add, +);
half_binary_op!(Sub, sub, -);
half_binary_op!(Mul, mul, *);
half_binary_op!(Div, div, /);

impl Rem for HalfFloat {
    type Output = HalfFloat;

    fn rem(self, rhs: HalfFloat) -> HalfFloat {
        self.ieee_rem(rhs)
    }
}

impl Neg for HalfFloat {
    type Output = HalfFloat;

    fn neg(self) -> HalfFloat {
        HalfFloat(self.0 ^ 0x8000)
    }
}

//! Elementwise lane operations
//!
//! Every binary operation takes two [`Operand`]s of the same width and
//! returns a vector, which covers vector⊗vector, vector⊗scalar and
//! scalar⊗vector with one entry point. Comparisons return mask vectors.
//! The 1-wide family has its own entry points in [`scalar`].
//!
//! | Family  | Operations                                                  |
//! |---------|-------------------------------------------------------------|
//! | arith   | `add sub mul div rem` (f32, i32, u32)                       |
//! | bitwise | `and or xor` (i32, u32, mask)                               |
//! | compare | `eq ne lt le gt ge` in the lane's own domain                |
//! | int     | signed `slt sle sgt sge`, unsigned `ult ule ugt uge`        |

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Rem, Sub};

use crate::lane::{ArithLane, BitLane, CmpLane, IntLane, Lane, Mask};
use crate::vector::{GenScalar, GenVec, Lanes, Operand, SupportedWidth, SUB_LANES};

fn zip_with<T, U, const N: usize>(
    a: &impl Operand<T, N>,
    b: &impl Operand<T, N>,
    f: impl Fn(T, T) -> U,
) -> GenVec<U, N>
where
    T: Lane,
    U: Lane,
    Lanes<N>: SupportedWidth,
{
    let mut m = [[U::default(); SUB_LANES]; N];
    for (index, sub) in m.iter_mut().enumerate() {
        let (x, y) = (a.sub_register(index), b.sub_register(index));
        for lane in 0..SUB_LANES {
            sub[lane] = f(x[lane], y[lane]);
        }
    }
    GenVec::from_sub_registers(m)
}

/// Generate binary operations returning `T` lanes
macro_rules! vec_op {
    ($($(#[$meta:meta])* $name:ident: $bound:ident::$lane_fn:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name<T: $bound, const N: usize>(a: &impl Operand<T, N>, b: &impl Operand<T, N>) -> GenVec<T, N>
            where
                Lanes<N>: SupportedWidth,
            {
                zip_with(a, b, <T as $bound>::$lane_fn)
            }
        )*
    };
}

/// Generate comparisons returning mask lanes
macro_rules! vec_cmp {
    ($($(#[$meta:meta])* $name:ident: $bound:ident => |$x:ident, $y:ident| $body:expr),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name<T: $bound, const N: usize>(a: &impl Operand<T, N>, b: &impl Operand<T, N>) -> GenVec<Mask, N>
            where
                Lanes<N>: SupportedWidth,
            {
                zip_with(a, b, |$x: T, $y: T| Mask::from_bool($body))
            }
        )*
    };
}

vec_op! {
    add: ArithLane::lane_add,
    sub: ArithLane::lane_sub,
    mul: ArithLane::lane_mul,
    /// Integer division by zero yields all ones
    div: ArithLane::lane_div,
    /// Float remainder truncates like C `fmod`; integer remainder by zero
    /// yields the dividend
    rem: ArithLane::lane_rem,
    and: BitLane::lane_and,
    or: BitLane::lane_or,
    xor: BitLane::lane_xor,
}

vec_cmp! {
    eq: CmpLane => |x, y| x.lane_eq(y),
    /// True on unordered float lanes
    ne: CmpLane => |x, y| x.lane_ne(y),
    lt: CmpLane => |x, y| x.lane_lt(y),
    le: CmpLane => |x, y| x.lane_le(y),
    gt: CmpLane => |x, y| x.lane_gt(y),
    ge: CmpLane => |x, y| x.lane_ge(y),
    slt: IntLane => |x, y| x.as_signed() < y.as_signed(),
    sle: IntLane => |x, y| x.as_signed() <= y.as_signed(),
    sgt: IntLane => |x, y| x.as_signed() > y.as_signed(),
    sge: IntLane => |x, y| x.as_signed() >= y.as_signed(),
    ult: IntLane => |x, y| x.as_unsigned() < y.as_unsigned(),
    ule: IntLane => |x, y| x.as_unsigned() <= y.as_unsigned(),
    ugt: IntLane => |x, y| x.as_unsigned() > y.as_unsigned(),
    uge: IntLane => |x, y| x.as_unsigned() >= y.as_unsigned(),
}

/// Bitwise complement
pub fn not<T: BitLane, const N: usize>(a: &GenVec<T, N>) -> GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    a.map(BitLane::lane_not)
}

/// Per-lane choice: `a` where `mask` is set, `b` elsewhere
pub fn select<T: Lane, const N: usize>(
    mask: &GenVec<Mask, N>,
    a: &impl Operand<T, N>,
    b: &impl Operand<T, N>,
) -> GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    let mut m = [[T::default(); SUB_LANES]; N];
    for (index, sub) in m.iter_mut().enumerate() {
        let (x, y, k) = (a.sub_register(index), b.sub_register(index), mask.sub_registers()[index]);
        for lane in 0..SUB_LANES {
            sub[lane] = if k[lane].is_set() { x[lane] } else { y[lane] };
        }
    }
    GenVec::from_sub_registers(m)
}

macro_rules! vec_operator {
    ($($trait:ident::$method:ident => $op:ident: $bound:ident),* $(,)?) => {
        $(
            impl<T: $bound, R: Operand<T, N>, const N: usize> $trait<R> for GenVec<T, N>
            where
                Lanes<N>: SupportedWidth,
            {
                type Output = GenVec<T, N>;

                fn $method(self, rhs: R) -> Self::Output {
                    $op(&self, &rhs)
                }
            }
        )*
    };
}

vec_operator! {
    Add::add => add: ArithLane,
    Sub::sub => sub: ArithLane,
    Mul::mul => mul: ArithLane,
    Div::div => div: ArithLane,
    Rem::rem => rem: ArithLane,
    BitAnd::bitand => and: BitLane,
    BitOr::bitor => or: BitLane,
    BitXor::bitxor => xor: BitLane,
}

/// Operations on the 1-wide family
///
/// Only lane 0 is computed. The scratch lanes 1..3 of the result are
/// copied from the first operand.
pub mod scalar {
    use super::*;

    fn apply<T: Lane, U: Lane>(a: &GenScalar<T>, b: &GenScalar<T>, f: impl Fn(T, T) -> U) -> GenScalar<U> {
        let mut out = a.cast::<U>();
        out.set_value(f(a.value(), b.value()));
        out
    }

    macro_rules! scalar_op {
        ($($name:ident: $bound:ident::$lane_fn:ident),* $(,)?) => {
            $(
                pub fn $name<T: $bound>(a: &GenScalar<T>, b: &GenScalar<T>) -> GenScalar<T> {
                    apply(a, b, <T as $bound>::$lane_fn)
                }
            )*
        };
    }

    macro_rules! scalar_cmp {
        ($($name:ident: $bound:ident => |$x:ident, $y:ident| $body:expr),* $(,)?) => {
            $(
                pub fn $name<T: $bound>(a: &GenScalar<T>, b: &GenScalar<T>) -> GenScalar<Mask> {
                    apply(a, b, |$x: T, $y: T| Mask::from_bool($body))
                }
            )*
        };
    }

    scalar_op! {
        add: ArithLane::lane_add,
        sub: ArithLane::lane_sub,
        mul: ArithLane::lane_mul,
        div: ArithLane::lane_div,
        rem: ArithLane::lane_rem,
        and: BitLane::lane_and,
        or: BitLane::lane_or,
        xor: BitLane::lane_xor,
    }

    scalar_cmp! {
        eq: CmpLane => |x, y| x.lane_eq(y),
        ne: CmpLane => |x, y| x.lane_ne(y),
        lt: CmpLane => |x, y| x.lane_lt(y),
        le: CmpLane => |x, y| x.lane_le(y),
        gt: CmpLane => |x, y| x.lane_gt(y),
        ge: CmpLane => |x, y| x.lane_ge(y),
        slt: IntLane => |x, y| x.as_signed() < y.as_signed(),
        sle: IntLane => |x, y| x.as_signed() <= y.as_signed(),
        sgt: IntLane => |x, y| x.as_signed() > y.as_signed(),
        sge: IntLane => |x, y| x.as_signed() >= y.as_signed(),
        ult: IntLane => |x, y| x.as_unsigned() < y.as_unsigned(),
        ule: IntLane => |x, y| x.as_unsigned() <= y.as_unsigned(),
        ugt: IntLane => |x, y| x.as_unsigned() > y.as_unsigned(),
        uge: IntLane => |x, y| x.as_unsigned() >= y.as_unsigned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{GenF1, GenF16, GenF4, GenI1, GenI8, GenM8, GenU1, GenU4, GenU8};

    #[test]
    fn test_vector_vector() {
        let a = GenF4::from_fn(|i| i as f32);
        let b = GenF4::splat(2.0);
        assert_eq!(mul(&a, &b).to_vec(), vec![0.0, 2.0, 4.0, 6.0]);
        assert_eq!(div(&a, &b).to_vec(), vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_scalar_broadcast_both_sides() {
        let a = GenI8::from_fn(|i| i as i32);
        let s = GenI1::new(3);
        assert_eq!(sub(&a, &s).lane(7), 4);
        assert_eq!(sub(&s, &a).lane(7), -4);
        assert_eq!(sub(&a, &s), sub(&a, &GenI8::splat(3)));
    }

    #[test]
    fn test_operators() {
        let a = GenU8::from_fn(|i| i as u32);
        let b = GenU8::splat(0b101);
        assert_eq!((a + b).lane(1), 6);
        assert_eq!((a & b).lane(7), 0b101);
        assert_eq!((a ^ GenU1::new(1)).lane(2), 3);
        assert_eq!((a % GenU1::new(3)).to_vec(), vec![0, 1, 2, 0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_signed_and_unsigned_compares() {
        let a = GenI8::from_fn(|i| i as i32 - 4);
        let zero = GenI1::new(0);
        assert_eq!(slt(&a, &zero).mask(), 0b0000_1111);
        // -1 is the largest unsigned value
        assert_eq!(ugt(&a, &zero).mask(), 0b1110_1111);
        assert_eq!(uge(&a, &zero).mask(), 0xff);
        assert_eq!(lt(&a, &zero), slt(&a, &zero));
        let u = GenU4::from_fn(|i| i as u32);
        assert_eq!(slt(&u, &GenU1::new(u32::MAX)).mask(), 0);
    }

    #[test]
    fn test_float_compares_with_nan() {
        let a = GenF4::from_sub_registers([[1.0, f32::NAN, 3.0, -0.0]]);
        let b = GenF4::from_sub_registers([[1.0, f32::NAN, 2.0, 0.0]]);
        assert_eq!(eq(&a, &b).mask(), 0b1001);
        assert_eq!(ne(&a, &b).mask(), 0b0110);
        assert_eq!(ge(&a, &b).mask(), 0b1101);
        assert_eq!(lt(&a, &b).mask(), 0);
    }

    #[test]
    fn test_mask_logic_and_select() {
        let a = GenF16::from_fn(|i| i as f32);
        let low = lt(&a, &GenF1::new(8.0));
        let even = GenVec::<Mask, 4>::from_fn(|i| Mask::from(i % 2 == 0));
        let both = and(&low, &even);
        assert_eq!(both.mask(), 0b0101_0101);
        let picked = select(&both, &a, &GenF1::new(-1.0));
        assert_eq!(picked.lane(2), 2.0);
        assert_eq!(picked.lane(3), -1.0);
        assert_eq!(not(&GenM8::splat(Mask::FALSE)).mask(), 0xff);
    }

    #[test]
    fn test_scalar_ops_keep_scratch_lanes() {
        let a = GenScalar::<i32>::splat(5);
        let b = GenI1::new(7);
        let sum = scalar::add(&a, &b);
        assert_eq!(sum.value(), 12);
        assert_eq!(sum.sub_register()[1..], [5, 5, 5]);
        assert_eq!(scalar::div(&a, &GenI1::new(0)).value(), -1);
        assert_eq!(scalar::lt(&GenF1::new(1.0), &GenF1::new(2.0)).mask(), 1);
        assert_eq!(scalar::ult(&GenI1::new(-1), &GenI1::new(0)).mask(), 0);
    }
}

//! Width-generic SIMD lane vectors
//!
//! A [`GenVec<T, N>`] holds `N` sub-registers of four lanes each, so one
//! type covers the 4, 8, 16 and 32-wide families. [`GenScalar<T>`] is the
//! 1-wide family: it is stored as one sub-register but only lane 0 carries
//! a value.
//!
//! Operations accept anything implementing [`Operand`], which lets a
//! scalar stand in for a vector by broadcasting lane 0:
//!
//! ```
//! use gen_sim::{ops, GenF8, GenF1};
//!
//! let a = GenF8::from_fn(|i| i as f32);
//! let b = GenF1::new(10.0);
//! let sum = ops::add(&a, &b);
//! assert_eq!(sum.lane(7), 17.0);
//! ```

use std::fmt;

use crate::lane::{cast_lane, sealed, Lane, Mask};

/// Lanes per sub-register
pub const SUB_LANES: usize = 4;

/// Marker carrying a sub-register count
pub struct Lanes<const N: usize>;

/// Sub-register counts with a vector family: 1, 2, 4 and 8
pub trait SupportedWidth: sealed::Sealed {}

macro_rules! supported_widths {
    ($($n:literal),*) => {
        $(
            impl sealed::Sealed for Lanes<$n> {}
            impl SupportedWidth for Lanes<$n> {}
        )*
    };
}

supported_widths!(1, 2, 4, 8);

/// `4 * N` lanes of `T`
#[derive(Clone, Copy, PartialEq)]
pub struct GenVec<T, const N: usize> {
    pub(crate) m: [[T; SUB_LANES]; N],
}

/// A single lane of `T`
///
/// Lanes 1..3 of the backing sub-register are scratch: scalar operations
/// leave whatever the first operand held there.
#[derive(Clone, Copy, PartialEq)]
pub struct GenScalar<T> {
    pub(crate) m: [T; SUB_LANES],
}

/// Source of sub-registers for vector operations
///
/// Vectors yield their own sub-registers; scalars yield lane 0 broadcast to
/// every lane.
pub trait Operand<T: Lane, const N: usize> {
    fn sub_register(&self, index: usize) -> [T; SUB_LANES];
}

impl<T: Lane, const N: usize> Operand<T, N> for GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    fn sub_register(&self, index: usize) -> [T; SUB_LANES] {
        self.m[index]
    }
}

impl<T: Lane, const N: usize> Operand<T, N> for GenScalar<T>
where
    Lanes<N>: SupportedWidth,
{
    fn sub_register(&self, _index: usize) -> [T; SUB_LANES] {
        [self.m[0]; SUB_LANES]
    }
}

impl<T: Lane, const N: usize> GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    /// Number of lanes
    pub const LANES: usize = SUB_LANES * N;

    pub fn from_sub_registers(m: [[T; SUB_LANES]; N]) -> Self {
        Self { m }
    }

    /// Build a vector from a per-lane function
    pub fn from_fn(mut f: impl FnMut(usize) -> T) -> Self {
        let mut m = [[T::default(); SUB_LANES]; N];
        for (index, sub) in m.iter_mut().enumerate() {
            for (lane, value) in sub.iter_mut().enumerate() {
                *value = f(index * SUB_LANES + lane);
            }
        }
        Self { m }
    }

    /// Every lane set to `value`
    pub fn splat(value: T) -> Self {
        Self {
            m: [[value; SUB_LANES]; N],
        }
    }

    pub fn sub_registers(&self) -> &[[T; SUB_LANES]; N] {
        &self.m
    }

    /// Value of lane `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= Self::LANES`, like slice indexing.
    pub fn lane(&self, index: usize) -> T {
        self.m[index / SUB_LANES][index % SUB_LANES]
    }

    pub fn get(&self, index: usize) -> Option<T> {
        (index < Self::LANES).then(|| self.lane(index))
    }

    /// # Panics
    ///
    /// Panics if `index >= Self::LANES`.
    pub fn set_lane(&mut self, index: usize, value: T) {
        self.m[index / SUB_LANES][index % SUB_LANES] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.m.iter().flatten().copied()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    pub fn map<U: Lane>(&self, mut f: impl FnMut(T) -> U) -> GenVec<U, N> {
        GenVec::from_fn(|index| f(self.lane(index)))
    }

    /// Reinterpret every lane's bits as `U`
    pub fn cast<U: Lane>(&self) -> GenVec<U, N> {
        self.map(cast_lane)
    }

    /// One bit per lane, bit `i` being the top bit of lane `i`
    pub fn mask(&self) -> u32 {
        self.iter()
            .enumerate()
            .fold(0, |bits, (index, value)| bits | ((cast_lane::<T, u32>(value) >> 31) << index))
    }
}

impl<T: Lane, const N: usize> Default for GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    fn default() -> Self {
        Self::splat(T::default())
    }
}

impl<T: Lane, const N: usize> fmt::Debug for GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenVec<{}, {}>", T::NAME, Self::LANES)?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Lane> GenScalar<T> {
    /// Lane 0 set to `value`, scratch lanes zeroed
    pub fn new(value: T) -> Self {
        let mut m = [T::default(); SUB_LANES];
        m[0] = value;
        Self { m }
    }

    pub fn splat(value: T) -> Self {
        Self { m: [value; SUB_LANES] }
    }

    pub fn value(&self) -> T {
        self.m[0]
    }

    pub fn set_value(&mut self, value: T) {
        self.m[0] = value;
    }

    /// The backing sub-register, scratch lanes included
    pub fn sub_register(&self) -> [T; SUB_LANES] {
        self.m
    }

    /// Every lane of an `N` sub-register vector set to the value
    pub fn broadcast<const N: usize>(&self) -> GenVec<T, N>
    where
        Lanes<N>: SupportedWidth,
    {
        GenVec::splat(self.m[0])
    }

    pub fn cast<U: Lane>(&self) -> GenScalar<U> {
        GenScalar {
            m: self.m.map(cast_lane),
        }
    }

    /// Bit 0 is the top bit of the value
    pub fn mask(&self) -> u32 {
        cast_lane::<T, u32>(self.m[0]) >> 31
    }
}

impl<T: Lane> Default for GenScalar<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Lane> fmt::Debug for GenScalar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenScalar<{}>({:?})", T::NAME, self.m[0])
    }
}

impl<T: Lane> From<T> for GenScalar<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

// ================================================================================================
// Family Aliases
// ================================================================================================

pub type GenF1 = GenScalar<f32>;
pub type GenF4 = GenVec<f32, 1>;
pub type GenF8 = GenVec<f32, 2>;
pub type GenF16 = GenVec<f32, 4>;
pub type GenF32 = GenVec<f32, 8>;

pub type GenI1 = GenScalar<i32>;
pub type GenI4 = GenVec<i32, 1>;
pub type GenI8 = GenVec<i32, 2>;
pub type GenI16 = GenVec<i32, 4>;
pub type GenI32 = GenVec<i32, 8>;

pub type GenU1 = GenScalar<u32>;
pub type GenU4 = GenVec<u32, 1>;
pub type GenU8 = GenVec<u32, 2>;
pub type GenU16 = GenVec<u32, 4>;
pub type GenU32 = GenVec<u32, 8>;

pub type GenM1 = GenScalar<Mask>;
pub type GenM4 = GenVec<Mask, 1>;
pub type GenM8 = GenVec<Mask, 2>;
pub type GenM16 = GenVec<Mask, 4>;
pub type GenM32 = GenVec<Mask, 8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_layout() {
        let v = GenI16::from_fn(|i| i as i32);
        assert_eq!(GenI16::LANES, 16);
        assert_eq!(v.sub_registers()[2], [8, 9, 10, 11]);
        assert_eq!(v.lane(13), 13);
        assert_eq!(v.get(16), None);
        assert_eq!(v.to_vec(), (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn test_set_lane() {
        let mut v = GenU8::splat(1);
        v.set_lane(5, 9);
        assert_eq!(v.to_vec(), vec![1, 1, 1, 1, 1, 9, 1, 1]);
    }

    #[test]
    fn test_mask_bits() {
        let m = GenM32::from_fn(|i| Mask::from(i % 3 == 0));
        let expected = (0..32).filter(|i| i % 3 == 0).fold(0u32, |bits, i| bits | 1 << i);
        assert_eq!(m.mask(), expected);
        assert_eq!(GenM1::new(Mask::TRUE).mask(), 1);
        assert_eq!(GenM1::new(Mask::FALSE).mask(), 0);
    }

    #[test]
    fn test_cast_preserves_bits() {
        let f = GenF4::from_fn(|i| i as f32 - 1.5);
        let bits = f.cast::<u32>();
        assert_eq!(bits.lane(0), (-1.5f32).to_bits());
        assert_eq!(bits.cast::<f32>(), f);
        assert_eq!(GenI1::new(-1).cast::<u32>().value(), u32::MAX);
    }

    #[test]
    fn test_scalar_operand_broadcasts() {
        let s = GenF1::new(2.5);
        assert_eq!(Operand::<f32, 2>::sub_register(&s, 1), [2.5; 4]);
        assert_eq!(s.broadcast::<2>(), GenF8::splat(2.5));
    }

    #[test]
    fn test_debug_format() {
        let v = GenI4::from_fn(|i| i as i32);
        assert_eq!(format!("{v:?}"), "GenVec<i32, 4>[0, 1, 2, 3]");
        assert_eq!(format!("{:?}", GenF1::new(1.0)), "GenScalar<f32>(1.0)");
    }
}

//! Memory primitives: contiguous load/store, immediates, gather/scatter
//!
//! Byte buffers are read and written unaligned through `bytemuck`, so a
//! lane may start at any byte offset. Every access is bounds-checked
//! before anything is read or written; a failed scatter leaves the buffer
//! untouched.

use std::ops::Range;

use crate::error::{Result, SimError};
use crate::lane::Lane;
use crate::vector::{GenScalar, GenVec, Lanes, Operand, SupportedWidth, SUB_LANES};

const LANE_BYTES: usize = 4;

/// Byte range of one lane access, or `OutOfBounds`
fn lane_range(offset: u64, len: usize) -> Result<Range<usize>> {
    let out_of_bounds = || SimError::OutOfBounds {
        offset,
        size: LANE_BYTES,
        len,
    };
    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    match start.checked_add(LANE_BYTES) {
        Some(end) if end <= len => Ok(start..end),
        _ => Err(out_of_bounds()),
    }
}

/// Byte offset of lane `index` in a run starting at `offset`; saturates so
/// huge offsets fail the bounds check instead of wrapping
fn lane_offset(offset: usize, index: usize) -> u64 {
    (offset as u64).saturating_add((index * LANE_BYTES) as u64)
}

fn read_lane<T: Lane>(bytes: &[u8], offset: u64) -> Result<T> {
    let range = lane_range(offset, bytes.len())?;
    Ok(bytemuck::pod_read_unaligned(&bytes[range]))
}

fn write_lane<T: Lane>(bytes: &mut [u8], range: Range<usize>, value: T) {
    bytes[range].copy_from_slice(bytemuck::bytes_of(&value));
}

fn check_len(needed: usize, len: usize) -> Result<()> {
    if len < needed {
        return Err(SimError::BufferTooSmall { needed, len });
    }
    Ok(())
}

impl<T: Lane, const N: usize> GenVec<T, N>
where
    Lanes<N>: SupportedWidth,
{
    /// Load the first `LANES` elements of `src`
    ///
    /// # Errors
    ///
    /// Returns `BufferTooSmall` if `src` holds fewer than `LANES` elements.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gen_sim::GenI8;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let data: Vec<i32> = (0..10).collect();
    /// let v = GenI8::load(&data)?;
    /// assert_eq!(v.lane(7), 7);
    /// # Ok(())
    /// # }
    /// ```
    pub fn load(src: &[T]) -> Result<Self> {
        check_len(Self::LANES, src.len())?;
        Ok(Self::from_fn(|index| src[index]))
    }

    /// Store every lane into the first `LANES` elements of `dst`
    pub fn store(&self, dst: &mut [T]) -> Result<()> {
        check_len(Self::LANES, dst.len())?;
        for (slot, value) in dst.iter_mut().zip(self.iter()) {
            *slot = value;
        }
        Ok(())
    }

    /// Load `LANES` consecutive lanes starting at byte `offset`
    pub fn load_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        let mut m = [[T::default(); SUB_LANES]; N];
        for (index, value) in m.iter_mut().flatten().enumerate() {
            *value = read_lane(bytes, lane_offset(offset, index))?;
        }
        Ok(Self::from_sub_registers(m))
    }

    /// Store every lane consecutively starting at byte `offset`
    pub fn store_bytes(&self, bytes: &mut [u8], offset: usize) -> Result<()> {
        let size = Self::LANES * LANE_BYTES;
        let end = match offset.checked_add(size) {
            Some(end) if end <= bytes.len() => end,
            _ => {
                return Err(SimError::OutOfBounds {
                    offset: offset as u64,
                    size,
                    len: bytes.len(),
                })
            }
        };
        bytes[offset..end].copy_from_slice(bytemuck::cast_slice(self.m.as_slice()));
        Ok(())
    }

    /// Immediate load: every lane set to `value`
    pub fn load_immediate(value: T) -> Self {
        Self::splat(value)
    }

    /// Lane `i` is read from `base` at byte offset `offsets[i]`
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` for the first lane whose four bytes do not fit
    /// in `base`.
    pub fn gather(base: &[u8], offsets: &impl Operand<u32, N>) -> Result<Self> {
        let mut m = [[T::default(); SUB_LANES]; N];
        for (index, sub) in m.iter_mut().enumerate() {
            for (value, offset) in sub.iter_mut().zip(offsets.sub_register(index)) {
                *value = read_lane(base, offset.into())?;
            }
        }
        Ok(Self::from_sub_registers(m))
    }

    /// Lane `i` is written to `base` at byte offset `offsets[i]`
    ///
    /// All offsets are validated before the first write. Lanes are written
    /// in ascending order, so when offsets collide the highest lane wins.
    pub fn scatter(&self, base: &mut [u8], offsets: &impl Operand<u32, N>) -> Result<()> {
        let mut ranges = Vec::with_capacity(Self::LANES);
        for index in 0..N {
            for offset in offsets.sub_register(index) {
                ranges.push(lane_range(offset.into(), base.len())?);
            }
        }
        for (range, value) in ranges.into_iter().zip(self.iter()) {
            write_lane(base, range, value);
        }
        Ok(())
    }
}

impl<T: Lane> GenScalar<T> {
    /// Load `src[0]`
    pub fn load(src: &[T]) -> Result<Self> {
        check_len(1, src.len())?;
        Ok(Self::new(src[0]))
    }

    /// Store the value into `dst[0]`
    pub fn store(&self, dst: &mut [T]) -> Result<()> {
        check_len(1, dst.len())?;
        dst[0] = self.value();
        Ok(())
    }

    pub fn load_bytes(bytes: &[u8], offset: usize) -> Result<Self> {
        read_lane(bytes, offset as u64).map(Self::new)
    }

    pub fn store_bytes(&self, bytes: &mut [u8], offset: usize) -> Result<()> {
        let range = lane_range(offset as u64, bytes.len())?;
        write_lane(bytes, range, self.value());
        Ok(())
    }

    pub fn load_immediate(value: T) -> Self {
        Self::new(value)
    }

    pub fn gather(base: &[u8], offset: &GenScalar<u32>) -> Result<Self> {
        read_lane(base, offset.value().into()).map(Self::new)
    }

    pub fn scatter(&self, base: &mut [u8], offset: &GenScalar<u32>) -> Result<()> {
        let range = lane_range(offset.value().into(), base.len())?;
        write_lane(base, range, self.value());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{GenF1, GenF4, GenI16, GenU1, GenU4, GenU8};

    #[test]
    fn test_load_store_slices() {
        let src: Vec<i32> = (100..120).collect();
        let v = GenI16::load(&src).unwrap();
        assert_eq!(v.lane(15), 115);

        let mut dst = vec![0; 16];
        v.store(&mut dst).unwrap();
        assert_eq!(dst, src[..16]);

        assert_eq!(
            GenI16::load(&src[..10]),
            Err(SimError::BufferTooSmall { needed: 16, len: 10 })
        );
        assert!(v.store(&mut [0; 4]).is_err());
    }

    #[test]
    fn test_unaligned_bytes() {
        let mut bytes = vec![0u8; 19];
        let v = GenF4::from_fn(|i| i as f32 + 0.5);
        v.store_bytes(&mut bytes, 3).unwrap();
        assert_eq!(GenF4::load_bytes(&bytes, 3).unwrap(), v);
        assert_eq!(&bytes[3..7], &0.5f32.to_le_bytes());

        let err = v.store_bytes(&mut bytes, 4).unwrap_err();
        assert_eq!(
            err,
            SimError::OutOfBounds {
                offset: 4,
                size: 16,
                len: 19
            }
        );
        assert!(GenF4::load_bytes(&bytes, 4).is_err());
    }

    #[test]
    fn test_byte_offsets_near_usize_max() {
        let mut bytes = [0u8; 16];
        let offset = usize::MAX - 2;
        assert!(matches!(
            GenF4::splat(1.0).store_bytes(&mut bytes, offset),
            Err(SimError::OutOfBounds { size: 16, len: 16, .. })
        ));
        assert!(matches!(GenF4::load_bytes(&bytes, offset), Err(SimError::OutOfBounds { .. })));
        assert!(GenF1::new(1.0).store_bytes(&mut bytes, offset).is_err());
        assert!(GenF1::load_bytes(&bytes, offset).is_err());
        assert_eq!(bytes, [0u8; 16]);
    }

    #[test]
    fn test_gather_reverse() {
        let data: Vec<u32> = (0..8).map(|i| i * 10).collect();
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let offsets = GenU8::from_fn(|i| (7 - i as u32) * 4);
        let v = GenU8::gather(bytes, &offsets).unwrap();
        assert_eq!(v.to_vec(), vec![70, 60, 50, 40, 30, 20, 10, 0]);

        // a scalar offset broadcasts to every lane
        let same = GenU8::gather(bytes, &GenU1::new(8)).unwrap();
        assert_eq!(same, GenU8::splat(20));
    }

    #[test]
    fn test_gather_out_of_bounds() {
        let bytes = [0u8; 16];
        let offsets = GenU4::from_sub_registers([[0, 4, 13, 8]]);
        assert_eq!(
            GenU4::gather(&bytes, &offsets),
            Err(SimError::OutOfBounds {
                offset: 13,
                size: 4,
                len: 16
            })
        );
        assert!(GenU4::gather(&bytes, &GenU1::new(u32::MAX)).is_err());
    }

    #[test]
    fn test_scatter_is_all_or_nothing() {
        let mut bytes = [0u8; 16];
        let v = GenU4::splat(0xffff_ffff);
        let offsets = GenU4::from_sub_registers([[0, 4, 8, 16]]);
        assert!(v.scatter(&mut bytes, &offsets).is_err());
        assert_eq!(bytes, [0; 16]);
    }

    #[test]
    fn test_scatter_duplicates_last_lane_wins() {
        let mut bytes = [0u8; 8];
        let v = GenU4::from_fn(|i| i as u32 + 1);
        v.scatter(&mut bytes, &GenU1::new(4)).unwrap();
        assert_eq!(bytes[..4], [0; 4]);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 4);
    }

    #[test]
    fn test_scalar_memory() {
        let mut bytes = [0u8; 8];
        GenF1::load_immediate(2.0).scatter(&mut bytes, &GenU1::new(4)).unwrap();
        assert_eq!(GenF1::gather(&bytes, &GenU1::new(4)).unwrap().value(), 2.0);
        assert_eq!(GenF1::load_bytes(&bytes, 0).unwrap().value(), 0.0);
        assert!(GenF1::load(&[]).is_err());
        let mut out = [0.0f32; 1];
        GenF1::new(3.0).store(&mut out).unwrap();
        assert_eq!(out, [3.0]);
    }
}

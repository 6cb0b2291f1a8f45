//! Program-scope constant pool
//!
//! Constants are laid out back to back in a single byte buffer. Each entry is
//! placed at the smallest multiple of its alignment at or after the current
//! end of the buffer, and the gap is zero-filled.
//!
//! ```text
//! append("foo", 3 bytes, align 1)   data: f o o
//! append("bar", 3 bytes, align 4)   data: f o o 0 b a r
//!                                   offsets: foo = 0, bar = 4
//! ```
//!
//! The pool is append-only: entries never move once placed, so offsets handed
//! out to the code generator stay valid for the lifetime of the program.

use tracing::trace;

use crate::error::{IsaError, Result};

const POOL_MAGIC: &[u8; 4] = b"CNST";
const POOL_END_MAGIC: &[u8; 4] = b"TSNC";

/// One named entry in a [`ConstantPool`]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Constant {
    name: String,
    size: u32,
    alignment: u32,
    offset: u32,
}

impl Constant {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// Byte offset of the first byte in the pool buffer
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// One past the last byte of this constant
    pub fn end(&self) -> u32 {
        self.offset + self.size
    }
}

/// Append-only pool of aligned constants backed by a single byte buffer
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConstantPool {
    data: Vec<u8>,
    constants: Vec<Constant>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `size` bytes of `data` under `name`, aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// - `InvalidAlignment` if `alignment` is zero or not a power of two
    /// - `ConstantTooShort` if `data` holds fewer than `size` bytes
    ///
    /// # Example
    ///
    /// ```rust
    /// use gen_isa::ConstantPool;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let mut pool = ConstantPool::new();
    /// pool.append(b"foo", "foo", 3, 1)?;
    /// let bar = pool.append(b"bar", "bar", 3, 4)?;
    /// assert_eq!(bar.offset(), 4);
    /// assert_eq!(pool.data(), b"foo\0bar");
    /// # Ok(())
    /// # }
    /// ```
    pub fn append(&mut self, data: &[u8], name: impl Into<String>, size: u32, alignment: u32) -> Result<&Constant> {
        let name = name.into();
        if alignment == 0 || !alignment.is_power_of_two() {
            return Err(IsaError::InvalidAlignment(alignment));
        }
        if data.len() < size as usize {
            return Err(IsaError::ConstantTooShort {
                name,
                size,
                available: data.len(),
            });
        }

        let offset = align_up(self.data.len(), alignment as usize);
        let offset = u32::try_from(offset).map_err(|_| IsaError::FieldOutOfRange {
            field: "constant.offset",
            value: offset as i64,
            bits: 32,
        })?;
        self.data.resize(offset as usize, 0);
        self.data.extend_from_slice(&data[..size as usize]);

        trace!(name = %name, offset, size, alignment, "constant appended");
        self.constants.push(Constant {
            name,
            size,
            alignment,
            offset,
        });
        let index = self.constants.len() - 1;
        Ok(&self.constants[index])
    }

    /// Number of constants
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Constant at insertion index `index`
    pub fn constant(&self, index: usize) -> Option<&Constant> {
        self.constants.get(index)
    }

    /// First constant registered under `name`
    pub fn constant_by_name(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Constants in insertion order
    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }

    /// The packed buffer, padding included
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of one constant
    pub fn bytes_of(&self, constant: &Constant) -> &[u8] {
        &self.data[constant.offset as usize..constant.end() as usize]
    }

    /// Serialize into the framed binary image:
    ///
    /// ```text
    /// "CNST" | data_len:u64 | data | count:u64
    ///   | { byte_count:u64 | name_len:u64 | name | size:u32 | alignment:u32 | offset:u32 }*
    /// | "TSNC" | total_len:u64
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.image_len());
        out.extend_from_slice(POOL_MAGIC);
        out.extend_from_slice(&(self.data.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&(self.constants.len() as u64).to_le_bytes());
        for c in &self.constants {
            out.extend_from_slice(&(entry_len(c) as u64).to_le_bytes());
            out.extend_from_slice(&(c.name.len() as u64).to_le_bytes());
            out.extend_from_slice(c.name.as_bytes());
            out.extend_from_slice(&c.size.to_le_bytes());
            out.extend_from_slice(&c.alignment.to_le_bytes());
            out.extend_from_slice(&c.offset.to_le_bytes());
        }
        out.extend_from_slice(POOL_END_MAGIC);
        let total = out.len() as u64 + 8;
        out.extend_from_slice(&total.to_le_bytes());
        out
    }

    /// Read back an image produced by [`ConstantPool::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ImageReader { bytes, pos: 0 };
        if reader.take(4)? != POOL_MAGIC {
            return Err(IsaError::MalformedConstantPool("missing CNST header".into()));
        }
        let data_len = reader.read_len()?;
        let data = reader.take(data_len)?.to_vec();

        let count = reader.read_len()?;
        let mut constants = Vec::with_capacity(count.min(1024));
        let mut previous_end = 0u32;
        for _ in 0..count {
            let start = reader.pos;
            let byte_count = reader.read_len()?;
            let name_len = reader.read_len()?;
            let name = String::from_utf8(reader.take(name_len)?.to_vec())
                .map_err(|_| IsaError::MalformedConstantPool("constant name is not UTF-8".into()))?;
            let size = reader.read_u32()?;
            let alignment = reader.read_u32()?;
            let offset = reader.read_u32()?;
            if reader.pos - start != byte_count {
                return Err(IsaError::MalformedConstantPool(format!(
                    "entry {name:?} declares {byte_count} bytes but occupies {}",
                    reader.pos - start
                )));
            }
            let entry = Constant {
                name,
                size,
                alignment,
                offset,
            };
            if !alignment.is_power_of_two() || offset % alignment != 0 || offset < previous_end {
                return Err(IsaError::MalformedConstantPool(format!("entry {:?} is misplaced", entry.name)));
            }
            if entry.end() as usize > data.len() {
                return Err(IsaError::MalformedConstantPool(format!(
                    "entry {:?} extends past the data buffer",
                    entry.name
                )));
            }
            previous_end = entry.end();
            constants.push(entry);
        }

        if reader.take(4)? != POOL_END_MAGIC {
            return Err(IsaError::MalformedConstantPool("missing TSNC trailer".into()));
        }
        let total = reader.read_len()?;
        if total != bytes.len() {
            return Err(IsaError::MalformedConstantPool(format!(
                "trailer records {total} bytes, image has {}",
                bytes.len()
            )));
        }
        Ok(Self { data, constants })
    }

    fn image_len(&self) -> usize {
        4 + 8 + self.data.len() + 8 + self.constants.iter().map(entry_len).sum::<usize>() + 4 + 8
    }
}

fn entry_len(c: &Constant) -> usize {
    8 + 8 + c.name.len() + 4 * 3
}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

struct ImageReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ImageReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| IsaError::MalformedConstantPool(format!("unexpected end of image at byte {}", self.pos)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_len(&mut self) -> Result<usize> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        usize::try_from(u64::from_le_bytes(raw))
            .map_err(|_| IsaError::MalformedConstantPool("length does not fit in memory".into()))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> ConstantPool {
        let mut pool = ConstantPool::new();
        pool.append(b"foo", "foo", 3, 1).unwrap();
        pool.append(b"bar", "bar", 3, 4).unwrap();
        pool
    }

    #[test]
    fn test_foo_bar_layout() {
        let pool = sample_pool();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.constant(0).unwrap().offset(), 0);
        assert_eq!(pool.constant(1).unwrap().offset(), 4);
        assert_eq!(pool.data(), b"foo\0bar");
        assert_eq!(pool.data().len(), 7);
    }

    #[test]
    fn test_foo_bar_both_word_aligned() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.append(b"foo", "foo", 3, 4).unwrap().offset(), 0);
        assert_eq!(pool.append(b"bar", "bar", 3, 4).unwrap().offset(), 4);
        assert_eq!(pool.data(), b"foo\0bar");
    }

    #[test]
    fn test_lookup_by_name() {
        let pool = sample_pool();
        let bar = pool.constant_by_name("bar").unwrap();
        assert_eq!(pool.bytes_of(bar), b"bar");
        assert!(pool.constant_by_name("baz").is_none());
    }

    #[test]
    fn test_duplicate_names_resolve_to_first() {
        let mut pool = ConstantPool::new();
        pool.append(&[1, 2], "x", 2, 2).unwrap();
        pool.append(&[3, 4, 5, 6], "x", 4, 4).unwrap();
        assert_eq!(pool.constant_by_name("x").unwrap().offset(), 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_append_uses_only_declared_size() {
        let mut pool = ConstantPool::new();
        pool.append(&[9, 9, 9, 9], "partial", 2, 1).unwrap();
        assert_eq!(pool.data(), &[9, 9]);
    }

    #[test]
    fn test_invalid_alignment() {
        let mut pool = ConstantPool::new();
        assert_eq!(pool.append(b"a", "a", 1, 0).unwrap_err(), IsaError::InvalidAlignment(0));
        assert_eq!(pool.append(b"a", "a", 1, 3).unwrap_err(), IsaError::InvalidAlignment(3));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_short_data_rejected() {
        let mut pool = ConstantPool::new();
        let err = pool.append(b"ab", "short", 4, 1).unwrap_err();
        assert!(matches!(err, IsaError::ConstantTooShort { size: 4, available: 2, .. }));
        assert!(pool.data().is_empty());
    }

    #[test]
    fn test_zero_sized_constant_still_aligns() {
        let mut pool = ConstantPool::new();
        pool.append(b"a", "a", 1, 1).unwrap();
        let empty = pool.append(&[], "empty", 0, 8).unwrap();
        assert_eq!(empty.offset(), 8);
        assert_eq!(pool.data().len(), 8);
    }

    #[test]
    fn test_image_round_trip() {
        let pool = sample_pool();
        let bytes = pool.to_bytes();
        assert_eq!(&bytes[..4], b"CNST");
        assert_eq!(bytes.len(), pool.image_len());
        let restored = ConstantPool::from_bytes(&bytes).unwrap();
        assert_eq!(restored, pool);
    }

    #[test]
    fn test_image_rejects_corruption() {
        let bytes = sample_pool().to_bytes();
        assert!(ConstantPool::from_bytes(&bytes[..bytes.len() - 1]).is_err());

        let mut bad_magic = bytes.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            ConstantPool::from_bytes(&bad_magic),
            Err(IsaError::MalformedConstantPool(_))
        ));

        let mut trailing = bytes;
        trailing.push(0);
        assert!(ConstantPool::from_bytes(&trailing).is_err());
    }

    #[test]
    fn test_empty_pool_image() {
        let pool = ConstantPool::new();
        let restored = ConstantPool::from_bytes(&pool.to_bytes()).unwrap();
        assert!(restored.is_empty());
        assert!(restored.data().is_empty());
    }
}

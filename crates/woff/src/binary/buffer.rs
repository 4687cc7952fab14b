//! Owned byte arena with append and offset-based big-endian accessors.

use read_fonts::types::Tag;

use super::checksum::padding;
use crate::error::{Result, WoffError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FontBuffer {
    data: Vec<u8>,
}

macro_rules! push_be {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, value: $ty) -> &mut Self {
            self.data.extend_from_slice(&value.to_be_bytes());
            self
        }
    };
}

macro_rules! set_be {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self, offset: usize, value: $ty) -> Result<()> {
            self.set_bytes(offset, &value.to_be_bytes())
        }
    };
}

macro_rules! get_be {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self, offset: usize) -> Result<$ty> {
            let mut raw = [0u8; size_of::<$ty>()];
            let len = raw.len();
            raw.copy_from_slice(self.get_bytes(offset, len)?);
            Ok(<$ty>::from_be_bytes(raw))
        }
    };
}

impl FontBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    push_be!(push_u8, u8);
    push_be!(push_i8, i8);
    push_be!(push_u16, u16);
    push_be!(push_i16, i16);
    push_be!(push_u32, u32);
    push_be!(push_i32, i32);
    push_be!(push_u64, u64);
    push_be!(push_i64, i64);

    pub fn push_tag(&mut self, tag: Tag) -> &mut Self {
        self.data.extend_from_slice(&tag.to_be_bytes());
        self
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn push_zeros(&mut self, count: usize) -> &mut Self {
        self.data.resize(self.data.len() + count, 0);
        self
    }

    /// Zero-pads the buffer to a multiple of four bytes.
    pub fn pad4(&mut self) -> &mut Self {
        self.push_zeros(padding(self.data.len()))
    }

    set_be!(set_u16, u16);
    set_be!(set_i16, i16);
    set_be!(set_u32, u32);

    get_be!(get_u16, u16);
    get_be!(get_i16, i16);
    get_be!(get_u32, u32);

    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let available = self.data.len();
        let target = offset
            .checked_add(bytes.len())
            .and_then(|end| self.data.get_mut(offset..end))
            .ok_or(WoffError::UnexpectedEof {
                offset,
                needed: bytes.len(),
                available: available.saturating_sub(offset),
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    pub fn get_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(WoffError::UnexpectedEof {
                offset,
                needed: len,
                available: self.data.len().saturating_sub(offset),
            })
    }
}

impl From<Vec<u8>> for FontBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for FontBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_patch() {
        let mut buf = FontBuffer::new();
        buf.push_u16(1).push_u32(0).push_u8(7);
        buf.set_u32(2, 0xDEADBEEF).unwrap();
        assert_eq!(buf.get_u32(2).unwrap(), 0xDEADBEEF);
        assert_eq!(buf.as_slice(), &[0, 1, 0xDE, 0xAD, 0xBE, 0xEF, 7]);
    }

    #[test]
    fn test_pad4() {
        let mut buf = FontBuffer::new();
        buf.push_bytes(&[1, 2, 3, 4, 5]).pad4();
        assert_eq!(buf.len(), 8);
        buf.pad4();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_out_of_range_set_fails() {
        let mut buf = FontBuffer::from(vec![0; 3]);
        assert!(buf.set_u32(0, 1).is_err());
        assert!(buf.get_u16(2).is_err());
    }
}

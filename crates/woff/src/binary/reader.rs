//! Big-endian cursor over a borrowed byte slice.

use font_types::{F2Dot14, Fixed};
use read_fonts::types::Tag;

use crate::error::{Result, WoffError};

/// Sequential big-endian reader. Every read is bounds checked.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.array::<{ size_of::<$ty>() }>()?;
            Ok(<$ty>::from_be_bytes(bytes))
        }
    };
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader starting at `offset`, failing if it is past the end.
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self> {
        let mut reader = Self::new(data);
        reader.seek(offset)?;
        Ok(reader)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.data.len() {
            return Err(self.eof(offset.saturating_sub(self.pos)));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(self.eof(len));
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Splits off the next `len` bytes as an independent reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader<'a>> {
        self.bytes(len).map(Reader::new)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    read_be!(u8, u8);
    read_be!(i8, i8);
    read_be!(u16, u16);
    read_be!(i16, i16);
    read_be!(u32, u32);
    read_be!(i32, i32);
    read_be!(u64, u64);
    read_be!(i64, i64);

    pub fn tag(&mut self) -> Result<Tag> {
        Ok(Tag::new(&self.array::<4>()?))
    }

    /// 16.16 fixed point value.
    pub fn fixed(&mut self) -> Result<Fixed> {
        Ok(Fixed::from_bits(self.i32()?))
    }

    /// 2.14 fixed point value.
    pub fn f2dot14(&mut self) -> Result<F2Dot14> {
        Ok(F2Dot14::from_bits(self.i16()?))
    }

    fn eof(&self, needed: usize) -> WoffError {
        WoffError::UnexpectedEof { offset: self.pos, needed, available: self.remaining() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let data = [0x00, 0x01, 0xFF, 0xFE, 0x12, 0x34, 0x56, 0x78];
        let mut r = Reader::new(&data);
        assert_eq!(r.u16().unwrap(), 1);
        assert_eq!(r.i16().unwrap(), -2);
        assert_eq!(r.u32().unwrap(), 0x12345678);
        assert!(r.is_empty());
    }

    #[test]
    fn test_truncated_read_fails() {
        let data = [0x00, 0x01, 0x02];
        let mut r = Reader::new(&data);
        r.u8().unwrap();
        let err = r.u32().unwrap_err();
        assert!(matches!(
            err,
            WoffError::UnexpectedEof { offset: 1, needed: 4, available: 2 }
        ));
        // a failed read does not advance
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn test_fixed_point() {
        let data = [0x00, 0x01, 0x80, 0x00, 0x40, 0x00];
        let mut r = Reader::new(&data);
        assert_eq!(r.fixed().unwrap(), Fixed::from_f64(1.5));
        assert_eq!(r.f2dot14().unwrap(), F2Dot14::from_f32(1.0));
    }

    #[test]
    fn test_tag_and_seek() {
        let data = b"xxglyf";
        let mut r = Reader::at(data, 2).unwrap();
        assert_eq!(r.tag().unwrap(), Tag::new(b"glyf"));
        assert!(Reader::at(data, 7).is_err());
    }
}

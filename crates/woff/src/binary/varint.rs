//! Variable-length integers used by WOFF2: `UIntBase128` and `255UInt16`.

use super::{buffer::FontBuffer, reader::Reader};
use crate::error::{Result, WoffError};

const WORD_CODE: u8 = 253;
const ONE_MORE_BYTE_CODE2: u8 = 254;
const ONE_MORE_BYTE_CODE1: u8 = 255;
const LOWEST_U_CODE: u16 = 253;

impl Reader<'_> {
    /// Reads a `UIntBase128`, rejecting leading zeros and values above u32.
    pub fn uint_base128(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for i in 0..5 {
            let byte = self.u8()?;
            if i == 0 && byte == 0x80 {
                return Err(WoffError::InvalidBase128("leading zero"));
            }
            if value & 0xFE00_0000 != 0 {
                return Err(WoffError::InvalidBase128("overflow"));
            }
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WoffError::InvalidBase128("longer than 5 bytes"))
    }

    pub fn read_255_u16(&mut self) -> Result<u16> {
        let code = self.u8()?;
        match code {
            WORD_CODE => self.u16(),
            ONE_MORE_BYTE_CODE1 => Ok(LOWEST_U_CODE + u16::from(self.u8()?)),
            ONE_MORE_BYTE_CODE2 => Ok(LOWEST_U_CODE * 2 + u16::from(self.u8()?)),
            _ => Ok(u16::from(code)),
        }
    }
}

impl FontBuffer {
    pub fn push_uint_base128(&mut self, value: u32) -> &mut Self {
        let len = base128_len(value);
        for i in (0..len).rev() {
            let mut byte = ((value >> (7 * i)) & 0x7F) as u8;
            if i != 0 {
                byte |= 0x80;
            }
            self.push_u8(byte);
        }
        self
    }

    pub fn push_255_u16(&mut self, value: u16) -> &mut Self {
        if value < LOWEST_U_CODE {
            self.push_u8(value as u8)
        } else if value < LOWEST_U_CODE * 2 {
            self.push_u8(ONE_MORE_BYTE_CODE1).push_u8((value - LOWEST_U_CODE) as u8)
        } else if value < LOWEST_U_CODE * 3 + 3 {
            self.push_u8(ONE_MORE_BYTE_CODE2).push_u8((value - LOWEST_U_CODE * 2) as u8)
        } else {
            self.push_u8(WORD_CODE).push_u16(value)
        }
    }
}

/// Number of bytes the minimal `UIntBase128` encoding of `value` takes.
pub fn base128_len(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_base128(bytes: &[u8]) -> Result<u32> {
        Reader::new(bytes).uint_base128()
    }

    fn encode_255(value: u16) -> Vec<u8> {
        let mut buf = FontBuffer::new();
        buf.push_255_u16(value);
        buf.into_vec()
    }

    #[test]
    fn test_base128_known_values() {
        assert_eq!(decode_base128(&[0x00]).unwrap(), 0);
        assert_eq!(decode_base128(&[0x7F]).unwrap(), 127);
        assert_eq!(decode_base128(&[0x81, 0x00]).unwrap(), 128);
        assert_eq!(decode_base128(&[0x8F, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap(), u32::MAX);
    }

    #[test]
    fn test_base128_rejects_leading_zero() {
        assert!(matches!(
            decode_base128(&[0x80, 0x01]),
            Err(WoffError::InvalidBase128("leading zero"))
        ));
    }

    #[test]
    fn test_base128_rejects_overflow() {
        assert!(matches!(
            decode_base128(&[0x90, 0x80, 0x80, 0x80, 0x00]),
            Err(WoffError::InvalidBase128("overflow"))
        ));
        assert!(matches!(
            decode_base128(&[0x81, 0x80, 0x80, 0x80, 0x80]),
            Err(WoffError::InvalidBase128("longer than 5 bytes"))
        ));
    }

    #[test]
    fn test_base128_round_trip() {
        for value in [0, 1, 127, 128, 16383, 16384, 0x0FFF_FFFF, 0x1000_0000, u32::MAX] {
            let mut buf = FontBuffer::new();
            buf.push_uint_base128(value);
            assert_eq!(buf.len(), base128_len(value));
            assert_eq!(decode_base128(buf.as_slice()).unwrap(), value, "value {value}");
        }
    }

    #[test]
    fn test_255_u16_codes() {
        assert_eq!(Reader::new(&[252]).read_255_u16().unwrap(), 252);
        assert_eq!(Reader::new(&[255, 0]).read_255_u16().unwrap(), 253);
        assert_eq!(Reader::new(&[254, 0]).read_255_u16().unwrap(), 506);
        assert_eq!(Reader::new(&[253, 0x12, 0x34]).read_255_u16().unwrap(), 0x1234);
        assert!(Reader::new(&[253, 0x12]).read_255_u16().is_err());
    }

    #[test]
    fn test_255_u16_round_trip() {
        for value in 0..=u16::MAX {
            let bytes = encode_255(value);
            if value < 253 {
                assert_eq!(bytes.len(), 1);
            }
            assert_eq!(Reader::new(&bytes).read_255_u16().unwrap(), value);
        }
    }
}

//! Padding and OpenType checksum arithmetic.

use read_fonts::types::Tag;

use crate::tags::HEAD;

/// Magic value the whole-font checksum must sum to.
pub const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// Byte offset of `checksumAdjustment` inside the head table.
pub const HEAD_ADJUSTMENT_OFFSET: usize = 8;

/// Bytes needed to round `len` up to a multiple of four.
pub fn padding(len: usize) -> usize {
    (4 - (len & 3)) & 3
}

pub fn round4(len: usize) -> usize {
    len + padding(len)
}

/// Wrapping sum of big-endian u32 words, treating the data as zero padded.
pub fn checksum(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(4);
    let mut sum = chunks
        .by_ref()
        .fold(0u32, |acc, word| acc.wrapping_add(u32::from_be_bytes([word[0], word[1], word[2], word[3]])));
    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut last = [0u8; 4];
        last[..rest.len()].copy_from_slice(rest);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}

/// Table checksum; for `head` the adjustment field counts as zero.
pub fn table_checksum(tag: Tag, data: &[u8]) -> u32 {
    let sum = checksum(data);
    if tag == HEAD && data.len() >= HEAD_ADJUSTMENT_OFFSET + 4 {
        let field = &data[HEAD_ADJUSTMENT_OFFSET..HEAD_ADJUSTMENT_OFFSET + 4];
        sum.wrapping_sub(u32::from_be_bytes([field[0], field[1], field[2], field[3]]))
    } else {
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 3);
        assert_eq!(padding(2), 2);
        assert_eq!(padding(3), 1);
        assert_eq!(padding(4), 0);
        assert_eq!(round4(13), 16);
    }

    #[test]
    fn test_checksum_pads_trailing_bytes() {
        assert_eq!(checksum(&[0, 0, 0, 1, 0, 0, 0, 2]), 3);
        assert_eq!(checksum(&[1]), 0x0100_0000);
        assert_eq!(checksum(&[0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 2]), 1);
    }

    #[test]
    fn test_head_checksum_ignores_adjustment() {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&[0, 1, 0, 0]);
        let base = table_checksum(HEAD, &head);
        head[8..12].copy_from_slice(&0x1234_5678u32.to_be_bytes());
        assert_eq!(table_checksum(HEAD, &head), base);
        assert_ne!(table_checksum(Tag::new(b"hhea"), &head), base);
    }
}

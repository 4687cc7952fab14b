use crate::{
    binary::{CHECKSUM_MAGIC, FontBuffer, HEAD_ADJUSTMENT_OFFSET},
    error::{Result, WoffError},
    tags::HEAD,
};

const HEAD_MIN_LEN: usize = 54;
const INDEX_TO_LOC_FORMAT_OFFSET: usize = 50;

fn check_len(data: &[u8]) -> Result<()> {
    if data.len() < HEAD_MIN_LEN {
        return Err(WoffError::TableTooShort { tag: HEAD, len: data.len() });
    }
    Ok(())
}

/// Clears `checksumAdjustment` so it can be recomputed on export.
pub fn zero_adjustment(data: Vec<u8>) -> Result<Vec<u8>> {
    check_len(&data)?;
    let mut head = FontBuffer::from(data);
    head.set_u32(HEAD_ADJUSTMENT_OFFSET, 0)?;
    Ok(head.into_vec())
}

pub fn index_to_loc_format(data: &[u8]) -> Result<u16> {
    check_len(data)?;
    Ok(u16::from_be_bytes([data[INDEX_TO_LOC_FORMAT_OFFSET], data[INDEX_TO_LOC_FORMAT_OFFSET + 1]]))
}

/// `0xB1B0AFBA - (sum of table checksums + header checksum)`, wrapping.
pub fn checksum_adjustment(table_sum: u32, header_checksum: u32) -> u32 {
    CHECKSUM_MAGIC.wrapping_sub(table_sum.wrapping_add(header_checksum))
}

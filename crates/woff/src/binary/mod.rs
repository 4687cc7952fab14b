//! Byte-level primitives shared by the container readers and writers.

mod buffer;
mod checksum;
mod reader;
mod varint;

pub use buffer::FontBuffer;
pub use checksum::{CHECKSUM_MAGIC, HEAD_ADJUSTMENT_OFFSET, checksum, padding, round4, table_checksum};
pub use reader::Reader;
pub use varint::base128_len;

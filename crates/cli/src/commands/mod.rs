//! CLI command implementations.

mod decode;
mod encode;
mod info;

pub use decode::{DecodeArgs, decode_files};
pub use encode::{EncodeArgs, encode_files};
pub use info::font_info;

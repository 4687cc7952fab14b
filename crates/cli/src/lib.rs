//! Webfont CLI library.

pub mod cli;
pub mod commands;
pub mod io;
pub mod parallel;

pub use commands::{decode_files, encode_files, font_info};

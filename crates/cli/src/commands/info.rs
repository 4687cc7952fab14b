use std::{fmt::Write, path::Path};

use anyhow::{Context, Result};
use webfont_woff::{DecodeOptions, Decoder};

use crate::io::FontFile;

fn tag_name(value: u32) -> String {
    String::from_utf8_lossy(&value.to_be_bytes()).into_owned()
}

/// Describe a WOFF/WOFF2 file: header fields, fonts and the table directory.
pub fn font_info(path: &Path) -> Result<String> {
    let data = FontFile::new(path).read()?;
    let decoded = Decoder::new(DecodeOptions::new().repair_names(false))
        .decode(&data)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let header = decoded.header();

    let mut out = String::new();
    writeln!(out, "{}", path.display())?;
    writeln!(out, "  format:          {}", header.version)?;
    writeln!(out, "  flavor:          {}", tag_name(header.flavor))?;
    writeln!(out, "  length:          {}", header.length)?;
    writeln!(out, "  total sfnt size: {}", header.total_sfnt_size)?;
    if header.total_compressed_size > 0 {
        writeln!(out, "  brotli stream:   {}", header.total_compressed_size)?;
    }
    writeln!(out, "  font version:    {}.{}", header.major_version, header.minor_version)?;
    writeln!(out, "  metadata:        {} bytes", decoded.metadata().map_or(0, <[u8]>::len))?;
    writeln!(out, "  private data:    {} bytes", decoded.private_data().map_or(0, <[u8]>::len))?;

    if let Some(collection) = decoded.collection() {
        writeln!(out, "  collection:      version {:#010x}", collection.version)?;
    }
    for (i, font) in decoded.fonts().iter().enumerate() {
        let transformed = if font.transformed { ", transformed" } else { "" };
        writeln!(
            out,
            "  font {i}: {} ({} tables{transformed})",
            tag_name(font.flavor),
            font.num_tables()
        )?;
    }

    writeln!(out, "  tables:")?;
    for table in decoded.tables() {
        writeln!(
            out,
            "    {}  transform {}  stored {:>8}  length {:>8}  checksum {:#010x}",
            table.tag,
            table.transform_version(),
            table.comp_length,
            table.orig_length,
            table.checksum
        )?;
    }
    Ok(out)
}

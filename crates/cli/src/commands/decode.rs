use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use webfont_woff::{DecodeOptions, Decoder};

use crate::{
    io::FontFile,
    parallel::{BatchResult, run_parallel},
};

#[derive(Debug, Clone, Default)]
pub struct DecodeArgs {
    pub output_dir: Option<PathBuf>,
    pub repair_names: bool,
    pub max_size: Option<u64>,
}

impl DecodeArgs {
    fn options(&self) -> DecodeOptions {
        let options = DecodeOptions::new().repair_names(self.repair_names);
        match self.max_size {
            Some(limit) => options.max_decompressed_size(limit),
            None => options,
        }
    }
}

/// Decode WOFF/WOFF2 files next to their inputs (or into `output_dir`).
pub fn decode_files(files: &[PathBuf], args: &DecodeArgs) -> Result<BatchResult> {
    let decoder = Decoder::new(args.options());
    run_parallel("Decode", files, |path| {
        decode_single(&decoder, path, args.output_dir.as_deref()).map(|_| ())
    })
}

fn decode_single(decoder: &Decoder, path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let input = FontFile::new(path);
    let data = input.read()?;
    let decoded = decoder
        .decode(&data)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let sfnt = decoded.to_sfnt()?;

    let output = input.output(output_dir, decoded.extension());
    output.write(&sfnt)?;
    info!(
        "{} ({}, {} tables) -> {} ({} bytes)",
        path.display(),
        decoded.version(),
        decoded.tables().len(),
        output.path().display(),
        sfnt.len()
    );
    Ok(output.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, read, remove_dir_all, write};

    use webfont_woff::{ContainerVersion, encode};

    use super::*;

    #[test]
    fn test_decode_writes_sfnt_with_flavor_extension() {
        let dir = std::env::temp_dir().join("webfont-cli-decode-test");
        let _ = remove_dir_all(&dir);
        create_dir_all(&dir).unwrap();

        let sfnt = font_test_data::SIMPLE_GLYF;
        let woff2 = encode(sfnt, ContainerVersion::Woff2).unwrap();
        let input = dir.join("simple.woff2");
        write(&input, &woff2).unwrap();

        let args = DecodeArgs { output_dir: Some(dir.join("out")), ..Default::default() };
        let decoder = Decoder::new(args.options());
        let output = decode_single(&decoder, &input, args.output_dir.as_deref()).unwrap();

        assert_eq!(output, dir.join("out/simple.ttf"));
        let decoded = read(&output).unwrap();
        assert_eq!(webfont_woff::checksum(&decoded), webfont_woff::CHECKSUM_MAGIC);

        remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_batch_counts_bad_inputs() {
        let dir = std::env::temp_dir().join("webfont-cli-decode-batch-test");
        let _ = remove_dir_all(&dir);
        create_dir_all(&dir).unwrap();

        let good = dir.join("good.woff");
        write(&good, encode(font_test_data::SIMPLE_GLYF, ContainerVersion::Woff1).unwrap())
            .unwrap();
        let bad = dir.join("bad.woff");
        write(&bad, b"not a font").unwrap();

        let result = decode_files(&[good, bad], &DecodeArgs::default()).unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(result.failed, 1);
        assert!(dir.join("good.ttf").exists());

        remove_dir_all(&dir).unwrap();
    }
}

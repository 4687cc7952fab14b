use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use webfont_woff::{ContainerVersion, EncodeOptions, Encoder};

use crate::{
    io::FontFile,
    parallel::{BatchResult, run_parallel},
};

#[derive(Debug, Clone)]
pub struct EncodeArgs {
    pub version: ContainerVersion,
    pub transform: bool,
    pub metadata: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for EncodeArgs {
    fn default() -> Self {
        Self { version: ContainerVersion::Woff2, transform: true, metadata: None, output_dir: None }
    }
}

impl EncodeArgs {
    fn options(&self) -> Result<EncodeOptions> {
        let options = EncodeOptions::new(self.version).transform(self.transform);
        match &self.metadata {
            Some(path) => {
                let xml = FontFile::new(path)
                    .read()
                    .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
                Ok(options.metadata(xml))
            }
            None => Ok(options),
        }
    }
}

/// Encode sfnt fonts or collections into `.woff`/`.woff2` files.
pub fn encode_files(files: &[PathBuf], args: &EncodeArgs) -> Result<BatchResult> {
    let encoder = Encoder::new(args.options()?);
    run_parallel("Encode", files, |path| {
        encode_single(&encoder, path, args.output_dir.as_deref()).map(|_| ())
    })
}

fn encode_single(encoder: &Encoder, path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let input = FontFile::new(path);
    let data = input.read()?;
    let encoded = encoder
        .encode(&data)
        .with_context(|| format!("Failed to encode {}", path.display()))?;

    let output = input.output(output_dir, encoder.options().version.extension());
    output.write(&encoded)?;
    info!(
        "{} ({} bytes) -> {} ({} bytes)",
        path.display(),
        data.len(),
        output.path().display(),
        encoded.len()
    );
    Ok(output.path().to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, read, remove_dir_all, write};

    use webfont_woff::{ContainerVersion, Decoder};

    use super::*;

    #[test]
    fn test_encode_embeds_metadata() {
        let dir = std::env::temp_dir().join("webfont-cli-encode-test");
        let _ = remove_dir_all(&dir);
        create_dir_all(&dir).unwrap();

        let input = dir.join("simple.ttf");
        write(&input, font_test_data::SIMPLE_GLYF).unwrap();
        let xml = b"<?xml version=\"1.0\"?><metadata version=\"1.0\"/>";
        let metadata = dir.join("meta.xml");
        write(&metadata, xml).unwrap();

        let args = EncodeArgs {
            version: ContainerVersion::Woff1,
            metadata: Some(metadata),
            ..Default::default()
        };
        let encoder = Encoder::new(args.options().unwrap());
        let output = encode_single(&encoder, &input, None).unwrap();
        assert_eq!(output, dir.join("simple.woff"));

        let decoded = Decoder::default().decode(&read(&output).unwrap()).unwrap();
        assert_eq!(decoded.version(), ContainerVersion::Woff1);
        assert_eq!(decoded.metadata(), Some(&xml[..]));

        remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_metadata_file_fails() {
        let args = EncodeArgs {
            metadata: Some(PathBuf::from("/nonexistent/meta.xml")),
            ..Default::default()
        };
        assert!(encode_files(&[], &args).is_err());
    }
}

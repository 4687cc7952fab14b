//! Shared font I/O utilities.

use std::{
    fs::{create_dir_all, read, write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use glob::glob;

/// A font file handle for I/O operations.
#[derive(Debug, Clone)]
pub struct FontFile {
    path: PathBuf,
}

impl FontFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read font data from the file.
    pub fn read(&self) -> Result<Vec<u8>> {
        read(&self.path).with_context(|| format!("Failed to read font: {}", self.path.display()))
    }

    /// Write font data to the file, creating its directory first.
    pub fn write(&self, data: impl AsRef<[u8]>) -> Result<()> {
        self.ensure_parent_dir()?;
        write(&self.path, data)
            .with_context(|| format!("Failed to write font: {}", self.path.display()))
    }

    /// Sibling path with a new extension, optionally moved into `dir`.
    pub fn output(&self, dir: Option<&Path>, extension: &str) -> FontFile {
        let renamed = self.path.with_extension(extension);
        match (dir, renamed.file_name()) {
            (Some(dir), Some(name)) => FontFile::new(dir.join(name)),
            _ => FontFile::new(renamed),
        }
    }

    /// Create parent directory if it doesn't exist.
    pub fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

impl AsRef<Path> for FontFile {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Expand glob patterns; arguments that match nothing are kept as literal paths.
pub fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let matches: Vec<PathBuf> = glob(pattern)
            .with_context(|| format!("Failed to glob pattern: {pattern}"))?
            .filter_map(Result::ok)
            .collect();
        if matches.is_empty() {
            files.push(PathBuf::from(pattern));
        } else {
            files.extend(matches);
        }
    }
    if files.is_empty() {
        bail!("No input files");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_keeps_stem() {
        let file = FontFile::new("fonts/Example-Regular.woff2");
        assert_eq!(file.output(None, "ttf").path(), Path::new("fonts/Example-Regular.ttf"));
        assert_eq!(
            file.output(Some(Path::new("dist")), "otf").path(),
            Path::new("dist/Example-Regular.otf")
        );
    }

    #[test]
    fn test_unmatched_pattern_kept_literally() {
        let files = expand_inputs(&["does/not/exist-*.woff".to_string()]).unwrap();
        assert_eq!(files, vec![PathBuf::from("does/not/exist-*.woff")]);
    }
}

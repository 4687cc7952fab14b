//! Parallel file processing utilities.

use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{info, warn};
use rayon::prelude::*;

/// Result of a parallel batch operation.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn ok_or_bail(&self, operation: &str) -> Result<()> {
        if !self.all_succeeded() {
            bail!("{operation} failed for {} of {} files", self.failed, self.total());
        }
        Ok(())
    }
}

/// Run an operation on multiple files in parallel with consistent error reporting.
pub fn run_parallel<T, F>(label: &str, items: &[T], op: F) -> Result<BatchResult>
where
    T: AsRef<Path> + Sync,
    F: Fn(&Path) -> Result<()> + Sync,
{
    let results: Vec<_> = items
        .par_iter()
        .map(|item| {
            let path = item.as_ref();
            op(path).with_context(|| format!("Failed to process {}", path.display()))
        })
        .collect();

    let mut result = BatchResult::default();
    for r in &results {
        if let Err(e) = r {
            warn!("{e:?}");
            result.failed += 1;
        } else {
            result.succeeded += 1;
        }
    }

    if result.all_succeeded() {
        info!("{label}: {} files", result.total());
    } else {
        warn!("{label}: {} of {} files failed", result.failed, result.total());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_all_succeeded() {
        let result = run_parallel("Test", &["a.woff", "b.woff"], |_| Ok(())).unwrap();
        assert!(result.all_succeeded());
        assert_eq!(result.total(), 2);
        assert!(result.ok_or_bail("Test").is_ok());
    }

    #[test]
    fn test_counts_failures() {
        let items = ["a.woff", "b.woff2", "c.woff"];
        let result = run_parallel("Test", &items, |path| {
            if path.extension().is_some_and(|ext| ext == "woff2") {
                Err(anyhow!("unsupported"))
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.total(), 3);
        assert!(!result.all_succeeded());
        let message = result.ok_or_bail("Test").unwrap_err().to_string();
        assert_eq!(message, "Test failed for 1 of 3 files");
    }
}

//! Run configuration, built once and shared read-only by every stage

use std::fs;
use std::path::{Path, PathBuf};

use super::error::ScanError;
use super::signature::{SignatureTable, DEFAULT_PREFIX_LEN};

/// Default read size for hashing: bounds memory regardless of file size
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Directory to scan and the extension to look for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    root: PathBuf,
    extension: String,
}

impl ScanTarget {
    /// Validate and normalize the scan input
    ///
    /// # Arguments
    /// * `root` - Existing, readable directory; canonicalized
    /// * `extension` - Extension with or without a leading dot, any case
    pub fn new(root: &Path, extension: &str) -> Result<Self, ScanError> {
        let extension = normalize_extension(extension);
        if extension.is_empty() {
            return Err(ScanError::InvalidInput(
                "extension must not be empty".to_string(),
            ));
        }

        let root = root.canonicalize().map_err(|e| {
            ScanError::InvalidInput(format!("cannot resolve {}: {}", root.display(), e))
        })?;

        if !root.is_dir() {
            return Err(ScanError::InvalidInput(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        fs::read_dir(&root).map_err(|e| {
            ScanError::InvalidInput(format!("cannot read {}: {}", root.display(), e))
        })?;

        Ok(Self { root, extension })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized extension: no leading dot, lower case
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Strip leading dots and surrounding whitespace, then lower-case
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Immutable configuration for a scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub target: ScanTarget,
    /// Bytes per read while hashing
    pub chunk_size: usize,
    /// Bytes read from the start of each file for signature checks
    pub prefix_len: usize,
    /// Follow symbolic links; walkdir reports loops as errors
    pub follow_links: bool,
    /// Skip entries whose name starts with `.`
    pub skip_hidden: bool,
    /// Worker threads for hashing; `None` runs sequentially
    pub workers: Option<usize>,
    pub check_signatures: bool,
    pub signatures: SignatureTable,
}

impl ScanConfig {
    pub fn new(target: ScanTarget) -> Self {
        Self {
            target,
            chunk_size: DEFAULT_CHUNK_SIZE,
            prefix_len: DEFAULT_PREFIX_LEN,
            follow_links: false,
            skip_hidden: false,
            workers: None,
            check_signatures: true,
            signatures: SignatureTable::builtin(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_prefix_len(mut self, prefix_len: usize) -> Self {
        self.prefix_len = prefix_len;
        self
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers.filter(|&n| n > 0);
        self
    }

    pub fn with_signature_check(mut self, check_signatures: bool) -> Self {
        self.check_signatures = check_signatures;
        self
    }

    pub fn with_signatures(mut self, signatures: SignatureTable) -> Self {
        self.signatures = signatures;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension(".TXT"), "txt");
        assert_eq!(normalize_extension("Pdf"), "pdf");
        assert_eq!(normalize_extension(" .jpeg "), "jpeg");
        assert_eq!(normalize_extension("."), "");
    }

    #[test]
    fn test_scan_target_valid() {
        let temp_dir = TempDir::new().unwrap();
        let target = ScanTarget::new(temp_dir.path(), ".TXT").unwrap();
        assert_eq!(target.extension(), "txt");
        assert!(target.root().is_absolute());
    }

    #[test]
    fn test_scan_target_empty_extension() {
        let temp_dir = TempDir::new().unwrap();
        let err = ScanTarget::new(temp_dir.path(), ".").unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn test_scan_target_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let err = ScanTarget::new(&missing, "txt").unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(_)));
    }

    #[test]
    fn test_scan_target_file_root() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("a.txt");
        File::create(&file_path).unwrap();
        let err = ScanTarget::new(&file_path, "txt").unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_scan_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ScanConfig::new(ScanTarget::new(temp_dir.path(), "txt").unwrap());
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.prefix_len, DEFAULT_PREFIX_LEN);
        assert!(!config.follow_links);
        assert!(config.workers.is_none());
        assert!(config.check_signatures);

        let config = config.with_workers(Some(0)).with_chunk_size(0);
        assert!(config.workers.is_none());
        assert_eq!(config.chunk_size, 1);
    }
}

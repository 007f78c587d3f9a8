//! Directory walking and candidate file collection

use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::core::config::ScanConfig;
use crate::core::error::ScanError;

/// A file whose name carries the requested extension
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub size: u64,
}

impl CandidateFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Check if `path` ends with `extension` (already normalized), ignoring case
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase() == extension)
        .unwrap_or(false)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Lazy walk over the scan root yielding matching regular files.
///
/// Inaccessible entries come out as [`ScanError::Enumeration`] items and the
/// walk carries on. Entries are visited in file-name order so repeated runs on
/// an unchanged tree see the same sequence.
pub struct FileEnumerator {
    walker: Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>,
    root: PathBuf,
    extension: String,
}

impl FileEnumerator {
    pub fn new(config: &ScanConfig) -> Self {
        let root = config.target.root().to_path_buf();
        let skip_hidden = config.skip_hidden;

        let walker = WalkDir::new(&root)
            .follow_links(config.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !(skip_hidden && is_hidden(entry)));

        Self {
            walker: Box::new(walker),
            root,
            extension: config.target.extension().to_string(),
        }
    }

    fn candidate_from(&self, entry: DirEntry) -> Option<Result<CandidateFile, ScanError>> {
        if !entry.file_type().is_file() || !has_extension(entry.path(), &self.extension) {
            return None;
        }

        match entry.metadata() {
            Ok(metadata) => Some(Ok(CandidateFile::new(
                entry.path().to_path_buf(),
                metadata.len(),
            ))),
            Err(e) => Some(Err(ScanError::Enumeration {
                path: entry.path().to_path_buf(),
                source: e,
            })),
        }
    }
}

impl Iterator for FileEnumerator {
    type Item = Result<CandidateFile, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walker.next()? {
                Ok(entry) => {
                    if let Some(item) = self.candidate_from(entry) {
                        return Some(item);
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    log::warn!("Skipping {}: {}", path.display(), e);
                    return Some(Err(ScanError::Enumeration { path, source: e }));
                }
            }
        }
    }
}

/// Collect every candidate file, separating enumeration errors
///
/// # Arguments
/// * `config` - Scan configuration (root, extension, link and hidden policy)
///
/// # Returns
/// Candidate files in walk order and the non-fatal errors met on the way
pub fn collect_candidate_files(config: &ScanConfig) -> (Vec<CandidateFile>, Vec<ScanError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for item in FileEnumerator::new(config) {
        match item {
            Ok(file) => files.push(file),
            Err(e) => errors.push(e),
        }
    }

    (files, errors)
}

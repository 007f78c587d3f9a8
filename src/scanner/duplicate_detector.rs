//! Duplicate file detection using SHA-256 hashing

use sha2::{Digest as _, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::core::error::ScanError;
use crate::scanner::file_scanner::CandidateFile;

/// SHA-256 output
pub type Digest = [u8; 32];

/// Lower-case hex rendering of a digest
pub fn digest_to_hex(digest: &Digest) -> String {
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compute SHA-256 hash of a file, reading `chunk_size` bytes at a time
///
/// # Arguments
/// * `path` - Path to the file
/// * `chunk_size` - Read buffer size; the digest does not depend on it
///
/// # Returns
/// The 32-byte digest, or [`ScanError::Read`] tagged with the path
pub fn compute_file_hash(path: &Path, chunk_size: usize) -> Result<Digest, ScanError> {
    let read_error = |source| ScanError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// A successfully hashed candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub file: CandidateFile,
    pub digest: Digest,
}

/// Two or more files with identical content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub digest: Digest,
    pub files: Vec<CandidateFile>,
}

impl DuplicateGroup {
    pub fn hash_hex(&self) -> String {
        digest_to_hex(&self.digest)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Bytes that would be freed by keeping a single copy
    pub fn redundant_bytes(&self) -> u64 {
        self.files
            .first()
            .map(|f| f.size * (self.files.len() as u64 - 1))
            .unwrap_or(0)
    }
}

/// Groups digests by value, remembering first-seen order
#[derive(Debug, Default)]
pub struct DuplicateGrouper {
    index: HashMap<Digest, usize>,
    buckets: Vec<(Digest, Vec<CandidateFile>)>,
    total_files: usize,
}

impl DuplicateGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: FileDigest) {
        self.total_files += 1;
        match self.index.get(&entry.digest) {
            Some(&slot) => self.buckets[slot].1.push(entry.file),
            None => {
                self.index.insert(entry.digest, self.buckets.len());
                self.buckets.push((entry.digest, vec![entry.file]));
            }
        }
    }

    /// Files added so far
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Distinct digests seen so far
    pub fn unique_digests(&self) -> usize {
        self.buckets.len()
    }

    /// Groups with at least two members, ordered by first occurrence
    pub fn finish(self) -> Vec<DuplicateGroup> {
        self.buckets
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(digest, files)| DuplicateGroup { digest, files })
            .collect()
    }
}

impl Extend<FileDigest> for DuplicateGrouper {
    fn extend<I: IntoIterator<Item = FileDigest>>(&mut self, iter: I) {
        for entry in iter {
            self.add(entry);
        }
    }
}

/// Hash every file and group the ones with identical content
///
/// # Arguments
/// * `files` - Candidates to check, in the order they should be reported
/// * `chunk_size` - Read buffer size for hashing
///
/// # Returns
/// Duplicate groups plus the read errors of files that could not be hashed
pub fn find_duplicates(
    files: &[CandidateFile],
    chunk_size: usize,
) -> (Vec<DuplicateGroup>, Vec<ScanError>) {
    let mut grouper = DuplicateGrouper::new();
    let mut errors = Vec::new();

    for file in files {
        match compute_file_hash(&file.path, chunk_size) {
            Ok(digest) => grouper.add(FileDigest {
                file: file.clone(),
                digest,
            }),
            Err(e) => {
                log::warn!("{}", e);
                errors.push(e);
            }
        }
    }

    (grouper.finish(), errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_CHUNK_SIZE;
    use sha2::Digest as _;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn candidate(path: &str) -> CandidateFile {
        CandidateFile::new(PathBuf::from(path), 5)
    }

    #[test]
    fn test_compute_file_hash() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"test content").unwrap();

        let hash = compute_file_hash(temp_file.path(), DEFAULT_CHUNK_SIZE).unwrap();
        // SHA-256 of "test content"
        assert_eq!(
            digest_to_hex(&hash),
            "6ae8a75555209fd6c44157c0aed8016e763ff435a19cf186f76863140143ff72"
        );
    }

    #[test]
    fn test_hash_independent_of_chunk_size() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        let whole: Digest = Sha256::digest(&content).into();
        for chunk_size in [1, 7, 4096, DEFAULT_CHUNK_SIZE, 1 << 20] {
            assert_eq!(compute_file_hash(temp_file.path(), chunk_size).unwrap(), whole);
        }
    }

    #[test]
    fn test_single_byte_difference() {
        let mut file1 = NamedTempFile::new().unwrap();
        let mut file2 = NamedTempFile::new().unwrap();
        file1.write_all(b"hello world").unwrap();
        file2.write_all(b"hello worle").unwrap();

        assert_ne!(
            compute_file_hash(file1.path(), DEFAULT_CHUNK_SIZE).unwrap(),
            compute_file_hash(file2.path(), DEFAULT_CHUNK_SIZE).unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = compute_file_hash(Path::new("/definitely/not/here.txt"), 1024).unwrap_err();
        assert!(matches!(err, ScanError::Read { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_find_duplicates() {
        let mut file1 = NamedTempFile::new().unwrap();
        let mut file2 = NamedTempFile::new().unwrap();
        let mut file3 = NamedTempFile::new().unwrap();

        file1.write_all(b"same content").unwrap();
        file2.write_all(b"same content").unwrap();
        file3.write_all(b"different content").unwrap();

        let files: Vec<_> = [&file1, &file2, &file3]
            .iter()
            .map(|f| CandidateFile::new(f.path().to_path_buf(), 12))
            .collect();

        let (duplicates, errors) = find_duplicates(&files, DEFAULT_CHUNK_SIZE);
        assert!(errors.is_empty());
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].len(), 2);
        assert_eq!(duplicates[0].files[0].path, file1.path());
        assert_eq!(duplicates[0].redundant_bytes(), 12);
    }

    #[test]
    fn test_grouper_drops_singletons_and_keeps_order() {
        let stream = vec![
            FileDigest { file: candidate("/b1"), digest: [2; 32] },
            FileDigest { file: candidate("/a1"), digest: [1; 32] },
            FileDigest { file: candidate("/u"), digest: [9; 32] },
            FileDigest { file: candidate("/a2"), digest: [1; 32] },
            FileDigest { file: candidate("/b2"), digest: [2; 32] },
        ];

        let mut grouper = DuplicateGrouper::new();
        grouper.extend(stream.clone());
        assert_eq!(grouper.total_files(), 5);
        assert_eq!(grouper.unique_digests(), 3);

        let groups = grouper.finish();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].digest, [2; 32]);
        assert_eq!(groups[0].files, vec![candidate("/b1"), candidate("/b2")]);
        assert_eq!(groups[1].files, vec![candidate("/a1"), candidate("/a2")]);
        assert!(groups.iter().all(|g| g.digest != [9; 32]));

        // Same stream, same result
        let mut again = DuplicateGrouper::new();
        again.extend(stream);
        assert_eq!(again.finish(), groups);
    }

    #[test]
    fn test_digest_to_hex() {
        let mut digest = [0u8; 32];
        digest[0] = 0xAB;
        digest[31] = 0x01;
        let hex = digest_to_hex(&digest);
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
    }
}

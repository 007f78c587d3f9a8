//! File scanning, hashing and duplicate grouping

pub mod file_scanner;
pub mod duplicate_detector;
pub mod pipeline;

pub use file_scanner::{collect_candidate_files, CandidateFile, FileEnumerator};
pub use duplicate_detector::{
    compute_file_hash, digest_to_hex, find_duplicates, Digest, DuplicateGroup, DuplicateGrouper,
    FileDigest,
};
pub use pipeline::{ScanReport, ScanSummary, Scanner, SignatureFinding};

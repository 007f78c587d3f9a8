//! Duplicate File Finder Library
//!
//! Finds files with identical content under a directory tree and flags files
//! whose content signature contradicts their extension.

pub mod core;
pub mod logging;
pub mod reporting;
pub mod scanner;

pub use crate::core::signature;
pub use crate::reporting::report_writer;
pub use crate::scanner::file_scanner;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::core::config::{normalize_extension, ScanConfig, ScanTarget};
    pub use crate::core::error::{IssueKind, ScanError, ScanIssue};
    pub use crate::core::signature::{FileType, Identification, SignatureTable};
    pub use crate::scanner::duplicate_detector::{
        compute_file_hash, digest_to_hex, find_duplicates, DuplicateGroup, DuplicateGrouper,
        FileDigest,
    };
    pub use crate::scanner::file_scanner::{collect_candidate_files, CandidateFile, FileEnumerator};
    pub use crate::scanner::pipeline::{ScanReport, ScanSummary, Scanner, SignatureFinding};
    pub use crate::reporting::report_writer::{
        read_csv_rows, render, write_report, CsvRow, ReportFormat,
    };
}

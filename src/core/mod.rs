//! Configuration, signature identification and error types

pub mod config;
pub mod error;
pub mod signature;

pub use config::{normalize_extension, ScanConfig, ScanTarget, DEFAULT_CHUNK_SIZE};
pub use error::{IssueKind, ScanError, ScanIssue};
pub use signature::{read_prefix, FileType, Identification, Signature, SignatureTable, DEFAULT_PREFIX_LEN};

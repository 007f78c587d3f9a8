//! Error taxonomy for scanning and reporting

use serde::Serialize;
use std::io;
use std::path::PathBuf;

/// Errors produced while scanning a tree or writing a report
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Bad root directory or extension; aborts before scanning starts
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A directory entry could not be visited
    #[error("Cannot enumerate {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A candidate file could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The report could not be written
    #[error("Cannot write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// CSV serialization failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Enumeration { .. } | Self::Read { .. })
    }

    /// Path the error is attached to, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Enumeration { path, .. }
            | Self::Read { path, .. }
            | Self::ReportWrite { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Convert a non-fatal error into a report entry
    pub fn to_issue(&self) -> Option<ScanIssue> {
        let (path, kind) = match self {
            Self::Enumeration { path, .. } => (path.clone(), IssueKind::Enumeration),
            Self::Read { path, .. } => (path.clone(), IssueKind::Read),
            _ => return None,
        };
        Some(ScanIssue {
            path,
            kind,
            message: self.to_string(),
        })
    }
}

/// Category of a non-fatal, per-entry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Directory or entry skipped during the tree walk
    Enumeration,
    /// File skipped because it could not be read
    Read,
}

/// A non-fatal error recorded in the scan report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub kind: IssueKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_is_not_fatal() {
        let err = ScanError::Read {
            path: PathBuf::from("/data/a.txt"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.path(), Some(&PathBuf::from("/data/a.txt")));

        let issue = err.to_issue().unwrap();
        assert_eq!(issue.kind, IssueKind::Read);
        assert!(issue.message.contains("/data/a.txt"));
    }

    #[test]
    fn test_invalid_input_is_fatal() {
        let err = ScanError::InvalidInput("extension must not be empty".to_string());
        assert!(err.is_fatal());
        assert!(err.to_issue().is_none());
        assert_eq!(err.to_string(), "Invalid input: extension must not be empty");
    }

    #[test]
    fn test_report_write_is_fatal() {
        let err = ScanError::ReportWrite {
            path: PathBuf::from("/ro/report.csv"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("Cannot write report /ro/report.csv"));
    }
}

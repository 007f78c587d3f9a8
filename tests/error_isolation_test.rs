//! Integration tests for error isolation
//!
//! Per-file and per-directory failures must not abort a scan; they are
//! recorded in the report and the counts still reconcile.

use dup_file_finder_rs::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};

fn write_file(path: &Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

/// Missing files produce read errors, not panics
#[test]
fn test_vanished_file_is_recorded() {
    let mut present = NamedTempFile::new().unwrap();
    present.write_all(b"still here").unwrap();
    present.flush().unwrap();

    let files = vec![
        CandidateFile::new(present.path().to_path_buf(), 10),
        CandidateFile::new(PathBuf::from("/nonexistent/dir/gone.txt"), 10),
    ];

    let (groups, errors) = find_duplicates(&files, 4096);
    assert!(groups.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], ScanError::Read { path, .. } if path.ends_with("gone.txt")));
}

/// Empty files hash fine and group together
#[test]
fn test_empty_files_are_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    File::create(temp_dir.path().join("a.log")).unwrap();
    File::create(temp_dir.path().join("b.log")).unwrap();

    let config = ScanConfig::new(ScanTarget::new(temp_dir.path(), "log").unwrap());
    let report = Scanner::new(config).run();

    assert_eq!(report.duplicates.len(), 1);
    assert!(report.suspects.is_empty());
}

/// Broken symlinks are skipped as enumeration errors when following links
#[cfg(unix)]
#[test]
fn test_dangling_symlink_does_not_abort() {
    let temp_dir = TempDir::new().unwrap();
    write_file(&temp_dir.path().join("ok.txt"), b"fine");
    std::os::unix::fs::symlink(
        temp_dir.path().join("missing-target.txt"),
        temp_dir.path().join("broken.txt"),
    )
    .unwrap();

    let config = ScanConfig::new(ScanTarget::new(temp_dir.path(), "txt").unwrap())
        .with_follow_links(true);
    let report = Scanner::new(config).run();

    assert_eq!(report.files_hashed, 1);
    assert_eq!(report.enumeration_error_count(), 1);
    assert!(report.is_reconciled());
    assert!(render(&report, ReportFormat::Table)
        .unwrap()
        .contains("Errors (1):"));
}

/// Without link following, symlinks are neither hashed nor errors
#[cfg(unix)]
#[test]
fn test_symlinks_ignored_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let real = temp_dir.path().join("real.txt");
    write_file(&real, b"content");
    std::os::unix::fs::symlink(&real, temp_dir.path().join("link.txt")).unwrap();

    let config = ScanConfig::new(ScanTarget::new(temp_dir.path(), "txt").unwrap());
    let report = Scanner::new(config).run();

    assert_eq!(report.files_considered, 1);
    assert!(report.errors.is_empty());
    assert!(report.duplicates.is_empty());
}

/// Unreadable subdirectories are skipped (only meaningful when not root)
#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let locked = temp_dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_file(&locked.join("hidden.txt"), b"same");
    write_file(&temp_dir.path().join("a.txt"), b"same");
    write_file(&temp_dir.path().join("b.txt"), b"same");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let still_readable = fs::read_dir(&locked).is_ok();

    let config = ScanConfig::new(ScanTarget::new(temp_dir.path(), "txt").unwrap());
    let report = Scanner::new(config).run();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.duplicates.len(), 1);
    if still_readable {
        // Running with elevated privileges
        assert_eq!(report.files_considered, 3);
    } else {
        assert_eq!(report.files_considered, 2);
        assert_eq!(report.enumeration_error_count(), 1);
    }
    assert!(report.is_reconciled());
}

/// A candidate that cannot be opened is left out of the groups but still
/// counted, so the report reconciles (only meaningful when not root)
#[cfg(unix)]
#[test]
fn test_unreadable_file_is_recorded() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let locked = temp_dir.path().join("locked.txt");
    write_file(&locked, b"same");
    write_file(&temp_dir.path().join("a.txt"), b"same");
    write_file(&temp_dir.path().join("b.txt"), b"same");

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    let still_readable = File::open(&locked).is_ok();

    let config = ScanConfig::new(ScanTarget::new(temp_dir.path(), "txt").unwrap());
    let report = Scanner::new(config).run();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.files_considered, 3);
    assert_eq!(report.duplicates.len(), 1);
    assert!(report.is_reconciled());
    if still_readable {
        // Running with elevated privileges
        assert_eq!(report.duplicates[0].len(), 3);
        assert!(report.errors.is_empty());
    } else {
        assert_eq!(report.read_error_count(), 1);
        assert_eq!(report.files_hashed, 2);
        assert_eq!(report.errors[0].kind, IssueKind::Read);
        assert!(report.errors[0].path.ends_with("locked.txt"));
        assert!(report.duplicates[0]
            .files
            .iter()
            .all(|f| !f.path.ends_with("locked.txt")));
        assert!(render(&report, ReportFormat::Table)
            .unwrap()
            .contains("Errors (1):"));
    }
}

/// Large files are hashed in chunks with the same result
#[test]
fn test_large_file_chunked_hash() {
    let temp_dir = TempDir::new().unwrap();
    let content = vec![0x5Au8; 3 * 64 * 1024 + 17];
    write_file(&temp_dir.path().join("big1.dat"), &content);
    write_file(&temp_dir.path().join("big2.dat"), &content);

    let small_chunks = ScanConfig::new(ScanTarget::new(temp_dir.path(), "dat").unwrap())
        .with_chunk_size(1000);
    let report = Scanner::new(small_chunks).run();
    assert_eq!(report.duplicates.len(), 1);

    let digest = compute_file_hash(&temp_dir.path().join("big1.dat"), 64 * 1024).unwrap();
    assert_eq!(report.duplicates[0].digest, digest);
}

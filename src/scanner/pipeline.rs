//! Scan pipeline: enumerate, hash and sniff, group, collect findings

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::config::ScanConfig;
use crate::core::error::{IssueKind, ScanError, ScanIssue};
use crate::core::signature::{read_prefix, FileType, Identification};
use crate::scanner::duplicate_detector::{
    compute_file_hash, Digest, DuplicateGroup, DuplicateGrouper, FileDigest,
};
use crate::scanner::file_scanner::{CandidateFile, FileEnumerator};

/// A file whose content contradicts its extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureFinding {
    pub file: CandidateFile,
    pub claimed: String,
    pub matched: BTreeSet<FileType>,
}

impl SignatureFinding {
    pub fn matched_extensions(&self) -> BTreeSet<&'static str> {
        Identification::Matched(self.matched.clone()).extensions()
    }
}

/// Everything a scan produced; read-only once built
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Candidate files taken into the hashing stage
    pub files_considered: usize,
    /// Files hashed successfully
    pub files_hashed: usize,
    /// Distinct digests among hashed files
    pub unique_digests: usize,
    pub duplicates: Vec<DuplicateGroup>,
    pub suspects: Vec<SignatureFinding>,
    pub errors: Vec<ScanIssue>,
    /// Candidates seen more than once through links, dropped before hashing
    pub aliases_skipped: usize,
    pub interrupted: bool,
}

impl ScanReport {
    /// Files belonging to some duplicate group
    pub fn duplicate_file_count(&self) -> usize {
        self.duplicates.iter().map(DuplicateGroup::len).sum()
    }

    /// Copies beyond the first in each group
    pub fn redundant_file_count(&self) -> usize {
        self.duplicates.iter().map(|g| g.len() - 1).sum()
    }

    pub fn redundant_bytes(&self) -> u64 {
        self.duplicates.iter().map(DuplicateGroup::redundant_bytes).sum()
    }

    pub fn read_error_count(&self) -> usize {
        self.issue_count(IssueKind::Read)
    }

    pub fn enumeration_error_count(&self) -> usize {
        self.issue_count(IssueKind::Enumeration)
    }

    fn issue_count(&self, kind: IssueKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Every considered file is either hashed or listed as a read error
    pub fn is_reconciled(&self) -> bool {
        self.files_hashed + self.read_error_count() == self.files_considered
    }
}

/// Summary counts, serialized into JSON reports
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub files_considered: usize,
    pub files_hashed: usize,
    pub unique_digests: usize,
    pub duplicate_groups: usize,
    pub duplicate_files: usize,
    pub redundant_bytes: u64,
    pub suspect_files: usize,
    pub read_errors: usize,
    pub enumeration_errors: usize,
    pub interrupted: bool,
}

impl From<&ScanReport> for ScanSummary {
    fn from(report: &ScanReport) -> Self {
        Self {
            files_considered: report.files_considered,
            files_hashed: report.files_hashed,
            unique_digests: report.unique_digests,
            duplicate_groups: report.duplicates.len(),
            duplicate_files: report.duplicate_file_count(),
            redundant_bytes: report.redundant_bytes(),
            suspect_files: report.suspects.len(),
            read_errors: report.read_error_count(),
            enumeration_errors: report.enumeration_error_count(),
            interrupted: report.interrupted,
        }
    }
}

/// Per-file result of the hashing stage
struct Inspection {
    digest: Digest,
    identification: Option<Identification>,
}

/// Runs a scan described by a [`ScanConfig`]
pub struct Scanner {
    config: ScanConfig,
    shutdown: Arc<AtomicBool>,
    progress: ProgressBar,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: ProgressBar::hidden(),
        }
    }

    /// Stop between files once `flag` is set
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }

    /// Advance `progress` once per file
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Walk the tree, dropping paths already reached through another link
    fn enumerate(&self, report: &mut ScanReport) -> Vec<CandidateFile> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut files = Vec::new();

        for item in FileEnumerator::new(&self.config) {
            match item {
                Ok(file) => {
                    let resolved = file.path.canonicalize().unwrap_or_else(|_| file.path.clone());
                    if seen.insert(resolved) {
                        files.push(file);
                    } else {
                        log::debug!("Already seen through another path: {}", file.path.display());
                        report.aliases_skipped += 1;
                    }
                }
                Err(e) => report.errors.extend(e.to_issue()),
            }
        }

        files
    }

    fn inspect(&self, file: &CandidateFile) -> Result<Inspection, ScanError> {
        let identification = if self.config.check_signatures {
            let prefix = read_prefix(&file.path, self.config.prefix_len).map_err(|source| {
                ScanError::Read {
                    path: file.path.clone(),
                    source,
                }
            })?;
            Some(self.config.signatures.identify(&prefix))
        } else {
            None
        };

        let digest = compute_file_hash(&file.path, self.config.chunk_size)?;
        log::debug!("Hashed {}", file.path.display());

        Ok(Inspection {
            digest,
            identification,
        })
    }

    /// Inspect files in order; `None` marks files skipped after shutdown
    fn inspect_all(&self, files: &[CandidateFile]) -> Vec<Option<Result<Inspection, ScanError>>> {
        let inspect_one = |file: &CandidateFile| {
            if self.is_shutdown_requested() {
                None
            } else {
                let outcome = self.inspect(file);
                self.progress.inc(1);
                Some(outcome)
            }
        };

        if let Some(workers) = self.config.workers {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => {
                    log::debug!("Hashing with {} worker thread(s)", workers);
                    return pool.install(|| files.par_iter().map(inspect_one).collect());
                }
                Err(e) => log::warn!("Failed to build thread pool, hashing sequentially: {}", e),
            }
        }

        files.iter().map(inspect_one).collect()
    }

    /// Run the scan to completion (or until shutdown is requested)
    pub fn run(&self) -> ScanReport {
        let mut report = ScanReport::default();
        let extension = self.config.target.extension();

        log::debug!(
            "Scanning {} for '{}' files",
            self.config.target.root().display(),
            extension
        );

        let files = self.enumerate(&mut report);
        log::info!("Found {} candidate file(s)", files.len());
        let candidate_count = files.len();
        self.progress.set_length(candidate_count as u64);

        let mut grouper = DuplicateGrouper::new();

        let outcomes = self.inspect_all(&files);

        for (file, outcome) in files.into_iter().zip(outcomes) {
            let Some(outcome) = outcome else {
                report.interrupted = true;
                continue;
            };
            report.files_considered += 1;

            match outcome {
                Ok(inspection) => {
                    if let Some(identification) = inspection.identification {
                        if identification.contradicts(extension) {
                            log::warn!(
                                "Signature mismatch: {} does not look like a '{}' file",
                                file.path.display(),
                                extension
                            );
                            if let Identification::Matched(matched) = identification {
                                report.suspects.push(SignatureFinding {
                                    file: file.clone(),
                                    claimed: extension.to_string(),
                                    matched,
                                });
                            }
                        }
                    }
                    grouper.add(FileDigest {
                        file,
                        digest: inspection.digest,
                    });
                }
                Err(e) => {
                    log::warn!("{}", e);
                    report.errors.extend(e.to_issue());
                }
            }
        }
        self.progress.finish_and_clear();

        if report.interrupted {
            log::warn!(
                "Scan interrupted after {} of {} file(s)",
                report.files_considered,
                candidate_count
            );
        }

        report.files_hashed = grouper.total_files();
        report.unique_digests = grouper.unique_digests();
        report.duplicates = grouper.finish();

        log::info!(
            "{} duplicate group(s), {} unique digest(s) of {} file(s)",
            report.duplicates.len(),
            report.unique_digests,
            report.files_hashed
        );
        report
    }
}

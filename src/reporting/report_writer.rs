//! Report writing functionality

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

use crate::core::error::{ScanError, ScanIssue};
use crate::scanner::pipeline::{ScanReport, ScanSummary};

/// Output format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{}' (expected table, csv or json)", other)),
        }
    }
}

/// One CSV line: a file inside a duplicate group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub group_id: usize,
    pub digest: String,
    pub path: String,
    pub size: u64,
}

fn csv_rows(report: &ScanReport) -> impl Iterator<Item = CsvRow> + '_ {
    report
        .duplicates
        .iter()
        .enumerate()
        .flat_map(|(idx, group)| {
            let digest = group.hash_hex();
            group.files.iter().map(move |file| CsvRow {
                group_id: idx + 1,
                digest: digest.clone(),
                path: file.path.to_string_lossy().to_string(),
                size: file.size,
            })
        })
}

/// Render the duplicate groups as a text table with a summary line
pub fn render_table(report: &ScanReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Duplicate Files");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out);

    if report.duplicates.is_empty() {
        let _ = writeln!(out, "  No duplicates found.");
        let _ = writeln!(out);
    }

    for (idx, group) in report.duplicates.iter().enumerate() {
        let size = group.files.first().map(|f| f.size).unwrap_or(0);
        let _ = writeln!(out, "Group {} ({}):", idx + 1, group.hash_hex());
        let _ = writeln!(out, "  {} files, {} bytes each", group.len(), size);
        for (file_idx, file) in group.files.iter().enumerate() {
            let marker = if file_idx == 0 { "[KEEP]" } else { "[DUP] " };
            let _ = writeln!(out, "    {} {}", marker, file.path.display());
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "--------");
    let _ = writeln!(
        out,
        "  Unique file hashes: {} of {}",
        report.unique_digests, report.files_considered
    );
    let _ = writeln!(out, "  Duplicate groups: {}", report.duplicates.len());
    let _ = writeln!(
        out,
        "  Redundant files: {} ({} bytes)",
        report.redundant_file_count(),
        report.redundant_bytes()
    );
    let _ = writeln!(out, "  Files hashed: {}", report.files_hashed);
    let _ = writeln!(out, "  Unreadable files: {}", report.read_error_count());
    if report.interrupted {
        let _ = writeln!(out, "  Scan was interrupted; results are partial");
    }

    out
}

/// Render suspect signature findings; empty when there are none
pub fn render_suspects(report: &ScanReport) -> String {
    let mut out = String::new();
    if report.suspects.is_empty() {
        return out;
    }

    let claimed = &report.suspects[0].claimed;
    let _ = writeln!(
        out,
        "Signature mismatches: content of these '{}' files looks like another format",
        claimed
    );
    let _ = writeln!(out, "{}", "-".repeat(70));
    for (num, finding) in report.suspects.iter().enumerate() {
        let matched: Vec<_> = finding.matched_extensions().into_iter().collect();
        let _ = writeln!(
            out,
            "  [{}] {} (looks like: {})",
            num + 1,
            finding.file.path.display(),
            matched.join(", ")
        );
    }

    out
}

/// Render non-fatal errors; empty when there are none
pub fn render_errors(report: &ScanReport) -> String {
    let mut out = String::new();
    if report.errors.is_empty() {
        return out;
    }

    let _ = writeln!(out, "Errors ({}):", report.errors.len());
    let _ = writeln!(out, "{}", "-".repeat(70));
    for issue in &report.errors {
        let _ = writeln!(out, "  {}", issue.message);
    }

    out
}

/// Suspect and error blocks together, separated by a blank line; empty when
/// the scan has neither
pub fn render_findings(report: &ScanReport) -> String {
    [render_suspects(report), render_errors(report)]
        .into_iter()
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write one CSV row per file of every duplicate group
pub fn write_csv<W: Write>(report: &ScanReport, writer: W) -> Result<(), ScanError> {
    // Header is written by hand so an empty report is still valid CSV
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(["group_id", "digest", "path", "size"])?;
    for row in csv_rows(report) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Parse CSV produced by [`write_csv`]
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<CsvRow>, ScanError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let rows = csv_reader
        .deserialize()
        .collect::<Result<Vec<CsvRow>, csv::Error>>()?;
    Ok(rows)
}

#[derive(Serialize)]
struct JsonGroup {
    digest: String,
    size: u64,
    files: Vec<PathBuf>,
}

#[derive(Serialize)]
struct JsonSuspect<'a> {
    path: &'a Path,
    claimed: &'a str,
    matched: Vec<&'static str>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: ScanSummary,
    duplicates: Vec<JsonGroup>,
    suspects: Vec<JsonSuspect<'a>>,
    errors: &'a [ScanIssue],
}

/// Write the whole report as pretty-printed JSON
pub fn write_json<W: Write>(report: &ScanReport, writer: W) -> Result<(), ScanError> {
    let json = JsonReport {
        summary: ScanSummary::from(report),
        duplicates: report
            .duplicates
            .iter()
            .map(|group| JsonGroup {
                digest: group.hash_hex(),
                size: group.files.first().map(|f| f.size).unwrap_or(0),
                files: group.files.iter().map(|f| f.path.clone()).collect(),
            })
            .collect(),
        suspects: report
            .suspects
            .iter()
            .map(|finding| JsonSuspect {
                path: &finding.file.path,
                claimed: &finding.claimed,
                matched: finding.matched_extensions().into_iter().collect(),
            })
            .collect(),
        errors: &report.errors,
    };
    serde_json::to_writer_pretty(writer, &json)?;
    Ok(())
}

/// Render a report in the given format
pub fn render(report: &ScanReport, format: ReportFormat) -> Result<String, ScanError> {
    match format {
        ReportFormat::Table => {
            let mut out = render_table(report);
            let findings = render_findings(report);
            if !findings.is_empty() {
                out.push('\n');
                out.push_str(&findings);
            }
            Ok(out)
        }
        ReportFormat::Csv => {
            let mut buffer = Vec::new();
            write_csv(report, &mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).to_string())
        }
        ReportFormat::Json => {
            let mut buffer = Vec::new();
            write_json(report, &mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).to_string())
        }
    }
}

/// Stream a report into `writer`. I/O failures come back as
/// [`ScanError::ReportWrite`] naming `output_path`.
fn stream_report<W: Write>(
    report: &ScanReport,
    format: ReportFormat,
    mut writer: W,
    output_path: &Path,
) -> Result<(), ScanError> {
    let write_error = |source: io::Error| ScanError::ReportWrite {
        path: output_path.to_path_buf(),
        source,
    };

    match format {
        ReportFormat::Table => writer
            .write_all(render(report, format)?.as_bytes())
            .map_err(write_error),
        ReportFormat::Csv => write_csv(report, writer).map_err(|e| match e {
            ScanError::Csv(err) if err.is_io_error() => write_error(err.into()),
            other => other,
        }),
        ReportFormat::Json => write_json(report, writer).map_err(|e| match e {
            ScanError::Json(err) if err.is_io() => write_error(err.into()),
            other => other,
        }),
    }
}

/// Write a report file
///
/// The report is written to a temporary file next to `output_path` and moved
/// into place only once complete, so a partial report never sits at the
/// target path.
///
/// # Arguments
/// * `output_path` - Path to output file
/// * `report` - Scan results to write
/// * `format` - Table, CSV or JSON
pub fn write_report(
    output_path: &Path,
    report: &ScanReport,
    format: ReportFormat,
) -> Result<(), ScanError> {
    let write_error = |source: io::Error| ScanError::ReportWrite {
        path: output_path.to_path_buf(),
        source,
    };

    let parent = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(write_error)?;
    stream_report(report, format, temp.as_file_mut(), output_path)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(output_path).map_err(|e| write_error(e.error))?;

    log::info!("Report written to {}", output_path.display());
    Ok(())
}

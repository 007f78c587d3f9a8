//! Report rendering and writing

pub mod report_writer;

pub use report_writer::{
    read_csv_rows, render, render_errors, render_findings, render_suspects, render_table, write_csv, write_json,
    write_report, CsvRow, ReportFormat,
};

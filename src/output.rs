//! Report encoding and persistence.
//!
//! Supports CSV, JSON and XLSX, optionally gzip-compressed. A report is
//! encoded fully in memory and then moved into place, so a failure never
//! leaves a partial file behind.

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::analyzers::report::{Cell, ReportRow};

/// Worksheet the XLSX report is written to.
pub const SHEET_NAME: &str = "rating";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
            ReportFormat::Xlsx => "xlsx",
        }
    }
}

/// Logs any serializable value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Encodes rows as CSV: a header line with `fields`, then one line per row.
pub fn encode_csv(rows: &[ReportRow], fields: &[String]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(fields)?;
    for row in rows {
        writer.write_record(row.cells(fields).iter().map(ToString::to_string))?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("flushing CSV buffer: {}", e.error()))
}

/// Encodes rows as a pretty-printed JSON array of objects keyed in `fields` order.
pub fn encode_json(rows: &[ReportRow], fields: &[String]) -> Result<Vec<u8>> {
    let ordered: Vec<_> = rows.iter().map(|r| r.ordered(fields)).collect();
    Ok(serde_json::to_vec_pretty(&ordered)?)
}

/// Encodes rows as a single-sheet workbook: `fields` in the first row, then
/// one row per report row. Empty cells are left blank.
pub fn encode_xlsx(rows: &[ReportRow], fields: &[String]) -> Result<Vec<u8>> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, field) in fields.iter().enumerate() {
        sheet.write_string(0, u16::try_from(col)?, field.as_str())?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = u32::try_from(i + 1)?;
        for (col, cell) in row.cells(fields).into_iter().enumerate() {
            let c = u16::try_from(col)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    sheet.write_string(r, c, text)?;
                }
                Cell::Decimal(v) => {
                    sheet.write_number(r, c, v)?;
                }
                Cell::Count(n) => {
                    sheet.write_number(r, c, n as f64)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Encodes and writes the report, returning the path actually written
/// (`.gz` is appended when compressing).
#[tracing::instrument(skip(rows, fields), fields(path = %path.display(), rows = rows.len()))]
pub fn write_report(
    path: &Path,
    rows: &[ReportRow],
    fields: &[String],
    format: ReportFormat,
    compress: bool,
) -> Result<PathBuf> {
    let encoded = match format {
        ReportFormat::Csv => encode_csv(rows, fields)?,
        ReportFormat::Json => encode_json(rows, fields)?,
        ReportFormat::Xlsx => encode_xlsx(rows, fields)?,
    };

    let (body, target) = if compress {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        (gzip(&encoded)?, PathBuf::from(name))
    } else {
        (encoded, path.to_path_buf())
    };

    if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {}", dir.display()))?;
    }

    let mut staging = target.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);

    debug!(staging = %staging.display(), bytes = body.len(), "Writing report");
    let moved = fs::write(&staging, &body)
        .with_context(|| format!("cannot write {}", staging.display()))
        .and_then(|()| {
            fs::rename(&staging, &target)
                .with_context(|| format!("cannot move report into {}", target.display()))
        });
    if let Err(e) = moved {
        if let Err(cleanup) = fs::remove_file(&staging) {
            warn!(staging = %staging.display(), error = %cleanup, "Staging file not removed");
        }
        return Err(e);
    }

    info!(path = %target.display(), ?format, compress, "Report written");
    Ok(target)
}

//! Report writers.
//!
//! CSV output has one row per suggestion with the columns `sentence`,
//! `phrase_to_replace`, `suggestion`, `cosine_score`, in report order.
//! JSON output is the whole [`Report`], run statistics included.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::{InputError, InputResult};
use crate::model::Report;

/// Report serialization format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// Comma-separated rows with a header.
    #[default]
    Csv,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Guess the format from a file extension; anything but `.json` is CSV.
    pub fn from_path(path: &Utf8Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }

    /// Returns the format name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(InputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Write suggestion rows as CSV.
pub fn write_csv<W: Write>(report: &Report, writer: W) -> InputResult<()> {
    let mut csv = csv::Writer::from_writer(writer);
    // serialize() only emits a header once a row exists
    csv.write_record(["sentence", "phrase_to_replace", "suggestion", "cosine_score"])?;
    for record in &report.records {
        let score = record.cosine_score.to_string();
        csv.write_record([
            record.sentence.as_str(),
            record.phrase_to_replace.as_str(),
            record.suggestion.as_str(),
            score.as_str(),
        ])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write the full report as pretty JSON.
pub fn write_json<W: Write>(report: &Report, mut writer: W) -> InputResult<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n").map_err(serde_json::Error::io)?;
    writer.flush().map_err(serde_json::Error::io)?;
    Ok(())
}

/// Write `report` in `format`.
pub fn write_report<W: Write>(report: &Report, format: OutputFormat, writer: W) -> InputResult<()> {
    match format {
        OutputFormat::Csv => write_csv(report, writer),
        OutputFormat::Json => write_json(report, writer),
    }
}

/// Create (or truncate) `path` and write `report` to it.
#[tracing::instrument(skip(report), fields(path = %path, records = report.len()))]
pub fn write_report_to_path(
    report: &Report,
    format: OutputFormat,
    path: &Utf8Path,
) -> InputResult<()> {
    let file = std::fs::File::create(path).map_err(|source| InputError::Io {
        path: path.to_owned(),
        source,
    })?;
    write_report(report, format, std::io::BufWriter::new(file))?;
    tracing::info!("report written");
    Ok(())
}

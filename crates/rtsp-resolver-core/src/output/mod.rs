//! Snapshot output writers
//!
//! Renders a snapshot of sources into one of the supported shapes:
//!
//! | Format | Shape |
//! |---|---|
//! | `args` | resolved addresses, each followed by a space |
//! | `nl` | resolved addresses, one per line |
//! | `json` | object mapping original to resolved |
//! | `csv` | `original,resolved` rows, no header |

use crate::error::{Error, Result};
use crate::source::Source;
use std::collections::BTreeMap;
use std::io::Write;
use std::str::FromStr;

/// One-shot output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Space-joined resolved addresses
    Args,
    /// Newline-joined resolved addresses
    NewLines,
    /// JSON object original -> resolved
    Json,
    /// CSV rows of (original, resolved)
    Csv,
}

impl OutputFormat {
    /// File the format is written to, or `None` for stdout formats
    pub fn file_name(&self) -> Option<&'static str> {
        match self {
            OutputFormat::Args | OutputFormat::NewLines => None,
            OutputFormat::Json => Some("redirect_sources.json"),
            OutputFormat::Csv => Some("redirect_sources.csv"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Args => "args",
            OutputFormat::NewLines => "nl",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "args" => Ok(OutputFormat::Args),
            "nl" => Ok(OutputFormat::NewLines),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(Error::config(format!("Unknown output format: {}", other))),
        }
    }
}

/// Mapping original -> resolved, ordered by original
pub fn to_mapping(sources: &[Source]) -> BTreeMap<String, String> {
    sources
        .iter()
        .map(|s| (s.original().to_string(), s.resolved().to_string()))
        .collect()
}

/// Write a snapshot in the given format
pub fn write_snapshot<W: Write>(format: OutputFormat, sources: &[Source], mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Args => write_joined(sources, " ", writer),
        OutputFormat::NewLines => write_joined(sources, "\n", writer),
        OutputFormat::Json => {
            serde_json::to_writer(&mut writer, &to_mapping(sources))?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            Ok(())
        }
        OutputFormat::Csv => {
            let mut csv_writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer);
            for source in sources {
                csv_writer.write_record([source.original(), source.resolved()])?;
            }
            csv_writer.flush()?;
            Ok(())
        }
    }
}

fn write_joined<W: Write>(sources: &[Source], separator: &str, mut writer: W) -> Result<()> {
    for source in sources {
        writer.write_all(source.resolved().as_bytes())?;
        writer.write_all(separator.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

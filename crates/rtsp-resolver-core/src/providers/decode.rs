//! Source list decoders
//!
//! Every decoded address becomes a fresh [`Source`] with an empty resolved
//! address. The output holds exactly the input's entries, in input order.

use crate::config::FileFormat;
use crate::error::Result;
use crate::source::Source;

/// Decode a list in the given format
pub fn decode_sources(format: FileFormat, bytes: &[u8]) -> Result<Vec<Source>> {
    match format {
        FileFormat::Json => sources_from_json(bytes),
        FileFormat::Csv => sources_from_csv(bytes),
    }
}

/// Decode a JSON array of address strings
pub fn sources_from_json(bytes: &[u8]) -> Result<Vec<Source>> {
    let addresses: Vec<String> = serde_json::from_slice(bytes)?;
    Ok(addresses.into_iter().map(Source::new).collect())
}

/// Decode CSV rows, taking the address from the first column
///
/// There is no header row. Rows may differ in length; rows whose first column
/// is empty are skipped.
pub fn sources_from_csv(bytes: &[u8]) -> Result<Vec<Source>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut sources = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(address) = record.get(0)
            && !address.is_empty()
        {
            sources.push(Source::new(address));
        }
    }

    Ok(sources)
}

//! Reshapes sparse result rows into a column-uniform CSV table.
use crate::error::{CrateError, Result};
use crate::export::search::ExportRow;
use crate::locale::{MessageKey, sanitize_html, translate};
use csv::WriterBuilder;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Write;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    /// Union of row keys, in the order they were first seen.
    pub columns: Vec<String>,
    pub rows: Vec<ExportRow>,
}

pub fn build_table(rows: Vec<ExportRow>) -> ExportTable {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    ExportTable { columns, rows }
}

/// Text for one CSV cell. Missing values and JSON null are empty cells.
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// The notice row appended when the search matched more than `limit` rows.
pub fn truncation_notice(limit: usize, language: &str) -> String {
    let count = limit.to_string();
    sanitize_html(&translate(
        language,
        MessageKey::DataBetaSearchLimit,
        &[("count", count.as_str())],
    ))
}

/// Writes the header, one line per row and, when `total_matched > limit`,
/// a final single-cell notice.
pub fn write_table<W: Write>(
    writer: W,
    table: &ExportTable,
    total_matched: u64,
    limit: usize,
    language: &str,
) -> Result<()> {
    // The notice row has one field while data rows have one per column.
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);

    if !table.columns.is_empty() {
        csv_writer.write_record(&table.columns)?;
        for row in &table.rows {
            csv_writer.write_record(
                table
                    .columns
                    .iter()
                    .map(|column| cell_text(row.get(column))),
            )?;
        }
    }

    if total_matched > limit as u64 {
        csv_writer.write_record([truncation_notice(limit, language)])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn serialize(
    table: &ExportTable,
    total_matched: u64,
    limit: usize,
    language: &str,
) -> Result<String> {
    let mut buffer = Vec::new();
    write_table(&mut buffer, table, total_matched, limit, language)?;
    String::from_utf8(buffer).map_err(|e| {
        CrateError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

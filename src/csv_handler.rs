use crate::error::{CrateError, Result};
use csv::{StringRecord, WriterBuilder};
use std::path::Path;

/// Column names to read from the input CSV.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub name: String,
    /// Optional column holding a curated canonical form for the name.
    pub canonical_form: Option<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            name: "name".to_string(),
            canonical_form: None,
        }
    }
}

// Represents a row from the input CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRecord {
    pub row: usize,
    pub name: String,
    pub canonical_form: Option<String>,
}

fn column_index(headers: &StringRecord, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| CrateError::MissingHeader(column.to_string()))
}

// Loads and validates the input CSV file.
pub fn load_and_validate_csv(file_path: &Path, columns: &ColumnConfig) -> Result<Vec<InputRecord>> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let headers = reader.headers()?.clone();

    // 1. Validate Headers
    let name_index = column_index(&headers, &columns.name)?;
    let canonical_index = columns
        .canonical_form
        .as_deref()
        .map(|column| column_index(&headers, column))
        .transpose()?;

    let mut valid_records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let row_num = i + 2; // +1 for header, +1 for 0-based index

        // 2. Validate Required Values are not empty
        let name = record.get(name_index).unwrap_or("").trim();
        if name.is_empty() {
            return Err(CrateError::MissingValue {
                column: columns.name.clone(),
                row: row_num,
            });
        }
        let canonical_form = canonical_index
            .and_then(|index| record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from);

        valid_records.push(InputRecord {
            row: row_num,
            name: name.to_string(),
            canonical_form,
        });
    }

    Ok(valid_records)
}

/// One line of the per-record status report.
#[derive(Debug, Clone, PartialEq)]
pub struct NameReport {
    pub row: usize,
    pub name: String,
    pub clean_name: String,
    pub canonical_form: String,
    pub canonical_verified: bool,
    pub surrogate_or_hybrid: bool,
    pub status: NameStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameStatus {
    Created { name_id: u64 },
    Duplicate { existing_id: u64 },
    Rejected { reason: String },
}

impl NameStatus {
    fn label(&self) -> &'static str {
        match self {
            NameStatus::Created { .. } => "created",
            NameStatus::Duplicate { .. } => "duplicate",
            NameStatus::Rejected { .. } => "rejected",
        }
    }
}

fn bool_to_label(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub fn write_status_report(rows: &[NameReport], path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.write_record([
        "row",
        "name",
        "clean_name",
        "canonical_form",
        "canonical_verified",
        "surrogate_or_hybrid",
        "status",
        "name_id",
        "issues",
    ])?;

    for row in rows {
        let (name_id, issues) = match &row.status {
            NameStatus::Created { name_id } => (name_id.to_string(), String::new()),
            NameStatus::Duplicate { existing_id } => (
                existing_id.to_string(),
                format!("Clean name already used by name {}", existing_id),
            ),
            NameStatus::Rejected { reason } => (String::new(), reason.clone()),
        };
        let row_num = row.row.to_string();
        writer.write_record([
            row_num.as_str(),
            row.name.as_str(),
            row.clean_name.as_str(),
            row.canonical_form.as_str(),
            bool_to_label(row.canonical_verified),
            bool_to_label(row.surrogate_or_hybrid),
            row.status.label(),
            name_id.as_str(),
            issues.as_str(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

// Basic tests for the CSV handler
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    fn with_canonical() -> ColumnConfig {
        ColumnConfig {
            name: "name".to_string(),
            canonical_form: Some("canonical".to_string()),
        }
    }

    #[test]
    fn test_load_valid_csv() {
        let content = "name,canonical,rank\nCanis lupus,,species\n\"Vulpes vulpes (Linnaeus, 1758)\",Vulpes vulpes,species";
        let file = create_test_csv(content);
        let records = load_and_validate_csv(file.path(), &with_canonical()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Canis lupus");
        assert_eq!(records[0].canonical_form, None);
        assert_eq!(records[1].name, "Vulpes vulpes (Linnaeus, 1758)");
        assert_eq!(records[1].canonical_form.as_deref(), Some("Vulpes vulpes"));
        assert_eq!(records[1].row, 3);
    }

    #[test]
    fn test_custom_name_column() {
        let content = "scientific_name\nPanthera leo";
        let file = create_test_csv(content);
        let columns = ColumnConfig {
            name: "scientific_name".to_string(),
            canonical_form: None,
        };
        let records = load_and_validate_csv(file.path(), &columns).unwrap();
        assert_eq!(records[0].name, "Panthera leo");
    }

    #[test]
    fn test_missing_header() {
        let content = "name\nCanis lupus";
        let file = create_test_csv(content);
        let result = load_and_validate_csv(file.path(), &with_canonical());
        assert!(matches!(result, Err(CrateError::MissingHeader(h)) if h == "canonical"));
    }

    #[test]
    fn test_missing_value() {
        let content = "name,canonical\nCanis lupus,\n  ,Vulpes vulpes";
        let file = create_test_csv(content);
        let result = load_and_validate_csv(file.path(), &with_canonical());
        assert!(matches!(result, Err(CrateError::MissingValue{ column, row }) if column == "name" && row == 3));
    }

    #[test]
    fn test_empty_csv() {
        let content = "name";
        let file = create_test_csv(content);
        let records = load_and_validate_csv(file.path(), &ColumnConfig::default()).unwrap();
        assert_eq!(records.len(), 0);
    }

    #[test]
    fn test_malformed_csv() {
        let content = "name,canonical\nCanis lupus"; // Missing canonical column
        let file = create_test_csv(content);
        let result = load_and_validate_csv(file.path(), &with_canonical());
        assert!(matches!(result, Err(CrateError::CsvError(_))));
    }

    #[test]
    fn test_write_status_report() {
        let file = NamedTempFile::new().unwrap();
        let rows = vec![
            NameReport {
                row: 2,
                name: "Canis lupus".to_string(),
                clean_name: "canis lupus".to_string(),
                canonical_form: "Canis lupus".to_string(),
                canonical_verified: false,
                surrogate_or_hybrid: false,
                status: NameStatus::Created { name_id: 1 },
            },
            NameReport {
                row: 3,
                name: "canis lupus.".to_string(),
                clean_name: "canis lupus".to_string(),
                canonical_form: String::new(),
                canonical_verified: false,
                surrogate_or_hybrid: false,
                status: NameStatus::Duplicate { existing_id: 1 },
            },
        ];
        write_status_report(&rows, file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("row\tname\tclean_name"));
        assert_eq!(lines[1], "2\tCanis lupus\tcanis lupus\tCanis lupus\tno\tno\tcreated\t1\t");
        assert!(lines[2].contains("duplicate\t1\tClean name already used by name 1"));
    }
}

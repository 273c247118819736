use crate::error::{ExportError, Result};
use crate::types::Row;
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;

/// Some dump headers carry stray single quotes (`'person_object_id'`);
/// strip them so callers and output use clean column names.
fn clean_header(raw: &str) -> String {
    raw.trim().trim_matches('\'').to_string()
}

/// A dump CSV opened for one linear scan.
#[derive(Debug)]
pub struct Table {
    reader: csv::Reader<File>,
    headers: Vec<String>,
}

impl Table {
    /// Open a table with the dialect the dump was written in: comma
    /// delimited, double-quoted, backslash-escaped, whitespace around
    /// fields ignored. Validates that `required` columns exist before any
    /// row is read.
    pub fn open(path: &Path, required: &[&str]) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("table")
            .to_string();
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .escape(Some(b'\\'))
            .trim(csv::Trim::Fields)
            .from_reader(file);
        let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();
        for column in required {
            if !headers.iter().any(|h| h == column) {
                return Err(ExportError::MissingColumn {
                    table: name,
                    column: column.to_string(),
                });
            }
        }
        Ok(Self { reader, headers })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Iterate rows as field maps. Values come out exactly as the file has
    /// them (wrapped in `Some`); sentinel conversion is a separate,
    /// explicit step via [`convert_empty_fields`].
    pub fn rows(&mut self) -> impl Iterator<Item = Result<Row>> + '_ {
        let headers = self.headers.clone();
        self.reader.records().map(move |record| {
            let record = record?;
            Ok(headers
                .iter()
                .cloned()
                .zip(record.iter().map(|value| Some(value.to_string())))
                .collect())
        })
    }
}

/// Convert the dump's `"N"` placeholder into a real null, field by field.
/// Flat (never descends into nested values) and idempotent.
pub fn convert_empty_fields(fields: &mut Row) {
    for value in fields.values_mut() {
        if matches!(value.as_deref(), Some(v) if v.trim() == "N") {
            *value = None;
        }
    }
}

/// Borrow a field's value, treating a missing column and a null the same.
pub fn field<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(|v| v.as_deref())
}

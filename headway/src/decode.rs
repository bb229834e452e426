use serde_json::Value;
use std::path::Path;

use crate::error::DecodeError;
use crate::normalize::RawRow;

/// Turns the bytes of a source file into untyped rows.
pub trait RowDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError>;
}

/// Delimited text with a header row.
#[derive(Debug, Clone, Copy)]
pub struct CsvDecoder {
    delimiter: u8,
}

impl CsvDecoder {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl RowDecoder for CsvDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: RawRow = headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| {
                    let value = if cell.is_empty() {
                        Value::Null
                    } else {
                        Value::String(cell.to_string())
                    };
                    (header.to_string(), value)
                })
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

/// A JSON array of row objects, as spreadsheet exporters commonly emit.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl RowDecoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawRow>, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Array(items) = value else {
            return Err(DecodeError::NotRowObjects);
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                _ => Err(DecodeError::NotRowObjects),
            })
            .collect()
    }
}

/// Picks a decoder from the file extension.
pub fn decoder_for_path(path: &Path, csv_delimiter: u8) -> Result<Box<dyn RowDecoder>, DecodeError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" | "txt" => Ok(Box::new(CsvDecoder::new(csv_delimiter))),
        "tsv" => Ok(Box::new(CsvDecoder::new(b'\t'))),
        "json" => Ok(Box::new(JsonDecoder)),
        other => Err(DecodeError::UnsupportedFormat(other.to_string())),
    }
}

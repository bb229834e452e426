use thiserror::Error;

use crate::types::{Dimension, RecordId};

/// The source file could not be turned into rows.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected an array of row objects")]
    NotRowObjects,
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),
}

/// A load attempt was rejected. Persisted state is left untouched.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("the file is empty or could not be read")]
    EmptyInput,
    #[error("no valid rows found in the file")]
    NoValidRows,
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Operator input that cannot be accepted as typed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("enter a valid 5-digit vehicle number before the observed time (row {id})")]
    InvalidVehicle { id: RecordId, vehicle: String },
    #[error("\"{0}\" is not a valid HH:MM time")]
    MalformedTime(String),
    #[error("no record with id {0}")]
    UnknownRecord(RecordId),
}

/// A quick-search token did not match any known value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("{dimension} \"{token}\" not found in the file{}", suggestion_hint(.suggestion))]
    NotFound {
        dimension: Dimension,
        token: String,
        suggestion: Option<String>,
    },
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(value) => format!(" (did you mean \"{}\"?)", value),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
#[error("unknown timezone: {0}")]
pub struct UnknownTimezone(pub String);

/// Everything an engine command can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;

//! Turns decoder output into typed [`ScheduleRecord`]s.
//!
//! Untyped rows stop here: nothing past this module sees a `RawRow`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::IngestionError;
use crate::time_of_day::{is_hh_mm, time_suffix};
use crate::types::{RecordId, ScheduleRecord};

/// A decoded row: column header -> cell value.
pub type RawRow = serde_json::Map<String, Value>;

/// Source column names for each record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub line: String,
    pub table: String,
    pub operator: String,
    pub control_post: String,
    pub scheduled_time: String,
    pub passage_type: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            line: "GOP_PDH_LINHA".to_string(),
            table: "GOP_PDH_TABELA".to_string(),
            operator: "GOP_PDH_EMPRESA".to_string(),
            control_post: "GOP_PDH_POSTO_CONTROLE_INICIAL".to_string(),
            scheduled_time: "GOP_PDH_HORARIO_INICIO".to_string(),
            passage_type: "GOP_PDH_COD_PASSAGEM_INICIAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub records: Vec<ScheduleRecord>,
    /// Rows rejected because their scheduled time had no `HH:MM` suffix.
    pub dropped: usize,
}

/// Validates and types raw rows. Ids are assigned over surviving rows, in order, from 0.
pub fn normalize(rows: &[RawRow], columns: &ColumnMap) -> Result<Normalized, IngestionError> {
    if rows.is_empty() {
        return Err(IngestionError::EmptyInput);
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = 0;

    for row in rows {
        let raw_time = cell(row, &columns.scheduled_time);
        let scheduled_time = time_suffix(&raw_time);
        if !is_hh_mm(scheduled_time) {
            debug!(raw_time = %raw_time, "dropping row without a valid scheduled time");
            dropped += 1;
            continue;
        }

        records.push(ScheduleRecord {
            id: records.len() as RecordId,
            line: cell(row, &columns.line),
            table: cell(row, &columns.table),
            operator: cell(row, &columns.operator),
            control_post: cell(row, &columns.control_post),
            scheduled_time: scheduled_time.to_string(),
            passage_type_code: cell(row, &columns.passage_type),
        });
    }

    if records.is_empty() {
        return Err(IngestionError::NoValidRows);
    }

    info!(kept = records.len(), dropped, "normalized schedule rows");
    Ok(Normalized { records, dropped })
}

/// Coerces a cell to a trimmed string. Missing cells become empty.
fn cell(row: &RawRow, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

use serde::Serialize;
use std::io;

use crate::deviation::Deviation;
use crate::engine::ViewRow;

/// A view row flattened into plain columns for spreadsheet or document output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Line")]
    pub line: String,
    #[serde(rename = "Table")]
    pub table: String,
    #[serde(rename = "Operator")]
    pub operator: String,
    #[serde(rename = "Passage type")]
    pub passage_type: String,
    #[serde(rename = "Control post")]
    pub control_post: String,
    #[serde(rename = "Scheduled")]
    pub scheduled_time: String,
    #[serde(rename = "Vehicle")]
    pub vehicle: String,
    #[serde(rename = "Observed")]
    pub observed_time: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl From<&ViewRow> for ExportRow {
    fn from(row: &ViewRow) -> Self {
        Self {
            line: row.record.line.clone(),
            table: row.record.table.clone(),
            operator: row.record.operator.clone(),
            passage_type: row.record.passage_type_code.clone(),
            control_post: row.record.control_post.clone(),
            scheduled_time: row.record.scheduled_time.clone(),
            vehicle: row.input.vehicle_id.clone(),
            observed_time: row.input.observed_time.clone(),
            status: status_label(row).to_string(),
        }
    }
}

fn status_label(row: &ViewRow) -> &'static str {
    match row.deviation {
        Deviation::OnTime => "On time",
        Deviation::Late => "Late",
        Deviation::Early => "Early",
        Deviation::Invalid => "Invalid vehicle",
        Deviation::Unclassified if row.past_due => "Missing",
        Deviation::Unclassified => "",
    }
}

pub fn flatten(rows: &[ViewRow]) -> Vec<ExportRow> {
    rows.iter().map(ExportRow::from).collect()
}

/// Writes the rows as CSV with a header line.
pub fn write_csv<W: io::Write>(rows: &[ViewRow], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in flatten(rows) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

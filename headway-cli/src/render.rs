use headway::{Deviation, Effect, RecordId, Theme, ViewRow};
use std::collections::BTreeMap;
use std::io::{self, Write};

pub const EMPTY_VIEW: &str = "No results for the selected filters.";
pub const NO_DATASET: &str = "No schedule loaded. Use `load <file>`.";

/// Turns engine effects into terminal output.
///
/// Keeps the last known past-due marker per row so ticks only print what changed.
pub struct Printer<W: Write> {
    out: W,
    theme: Theme,
    markers: BTreeMap<RecordId, bool>,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            theme: Theme::default(),
            markers: BTreeMap::new(),
        }
    }

    /// Prints notices only. Used after restoring a session for one-shot commands.
    pub fn notices(&mut self, effects: &[Effect]) -> io::Result<()> {
        for effect in effects {
            if let Effect::Notify(message) = effect {
                writeln!(self.out, "! {}", message)?;
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, effects: &[Effect]) -> io::Result<()> {
        for effect in effects {
            match effect {
                Effect::Render(rows) => self.table(rows)?,
                Effect::UpdateRow(row) => {
                    self.markers.insert(row.record.id, row.past_due);
                    writeln!(self.out, "{}", self.row_line(row))?;
                }
                Effect::Markers(markers) => self.markers_changed(markers)?,
                Effect::FocusVehicle(id) => {
                    writeln!(self.out, "  -> enter a 5-digit vehicle for row {}", id)?;
                }
                Effect::Notify(message) => writeln!(self.out, "! {}", message)?,
                Effect::ApplyTheme(theme) => self.theme = *theme,
                Effect::Cleared => {
                    self.markers.clear();
                    writeln!(self.out, "{}", NO_DATASET)?;
                }
            }
        }
        self.out.flush()
    }

    fn table(&mut self, rows: &[ViewRow]) -> io::Result<()> {
        self.markers = rows
            .iter()
            .map(|row| (row.record.id, row.past_due))
            .collect();

        if rows.is_empty() {
            return writeln!(self.out, "{}", EMPTY_VIEW);
        }
        writeln!(
            self.out,
            "{:>4}  {:<6} {:<6} {:<20} {:<16} {:<6} {:<7} {:<6}",
            "id", "line", "table", "post", "operator", "sched", "vehicle", "seen"
        )?;
        for row in rows {
            writeln!(self.out, "{}", self.row_line(row))?;
        }
        Ok(())
    }

    fn markers_changed(&mut self, markers: &[(RecordId, bool)]) -> io::Result<()> {
        for &(id, past_due) in markers {
            let previous = self.markers.insert(id, past_due);
            if past_due && previous != Some(true) {
                writeln!(self.out, "{} row {} is past due", self.accent(), id)?;
            }
        }
        Ok(())
    }

    fn row_line(&self, row: &ViewRow) -> String {
        let mut status = match row.deviation {
            Deviation::OnTime => "ok".to_string(),
            other => other.marker().unwrap_or_default().to_string(),
        };
        if row.past_due {
            if !status.is_empty() {
                status.push(' ');
            }
            status.push_str(self.accent());
        }
        format!(
            "{:>4}  {:<6} {:<6} {:<20} {:<16} {:<6} {:<7} {:<6} {}",
            row.record.id,
            row.record.line,
            row.record.table,
            row.record.control_post,
            row.record.operator,
            row.record.scheduled_time,
            row.input.vehicle_id,
            row.input.observed_time,
            status
        )
        .trim_end()
        .to_string()
    }

    fn accent(&self) -> &'static str {
        match self.theme {
            Theme::Light => "*",
            Theme::Dark => "●",
        }
    }
}

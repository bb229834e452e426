//! The reconciliation engine: one loaded dataset, its filters, the operator's inputs and
//! the past-due ticker, driven through explicit commands.
//!
//! Every command mutates the engine and returns the [`Effect`]s a front end has to act on.

use tracing::{debug, info};

use crate::clock::Clock;
use crate::decode::RowDecoder;
use crate::deviation::{classify, evaluate, Deviation};
use crate::error::{IngestionError, Result, ValidationError};
use crate::filter::{self, FilterOptions};
use crate::normalize::{normalize, ColumnMap, RawRow};
use crate::past_due::{is_past_due, REFRESH_INTERVAL};
use crate::store::Store;
use crate::ticker::{TickHandle, TickScheduler};
use crate::time_of_day::is_hh_mm;
use crate::types::{
    Dimension, FilterState, RecordId, ScheduleRecord, Theme, UserInput, UserInputs,
};

/// A displayed row and everything derived for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    pub record: ScheduleRecord,
    pub input: UserInput,
    pub deviation: Deviation,
    pub past_due: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the displayed rows. Empty means nothing matches the filters.
    Render(Vec<ViewRow>),
    /// A single row changed in place.
    UpdateRow(ViewRow),
    /// Fresh past-due markers for the displayed rows.
    Markers(Vec<(RecordId, bool)>),
    /// Send the operator back to the vehicle field of a row.
    FocusVehicle(RecordId),
    Notify(String),
    ApplyTheme(Theme),
    /// No dataset is loaded anymore.
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Vehicle,
    ObservedTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    /// Add an exact known value. Unknown values are ignored.
    Select(Dimension, String),
    Deselect(Dimension, String),
    ToggleAll(Dimension),
    /// `None` keeps a bound, an empty string clears it.
    TimeRange {
        start: Option<String>,
        end: Option<String>,
    },
    Reset,
}

pub struct Engine {
    store: Store,
    clock: Box<dyn Clock>,
    scheduler: Box<dyn TickScheduler>,
    columns: ColumnMap,
    records: Vec<ScheduleRecord>,
    options: FilterOptions,
    filter: FilterState,
    inputs: UserInputs,
    theme: Theme,
    view: Vec<RecordId>,
    ticker: Option<Box<dyn TickHandle>>,
}

impl Engine {
    pub fn new(
        store: Store,
        clock: impl Clock + 'static,
        scheduler: impl TickScheduler + 'static,
    ) -> Self {
        Self {
            store,
            clock: Box::new(clock),
            scheduler: Box::new(scheduler),
            columns: ColumnMap::default(),
            records: Vec::new(),
            options: FilterOptions::default(),
            filter: FilterState::default(),
            inputs: UserInputs::new(),
            theme: Theme::default(),
            view: Vec::new(),
            ticker: None,
        }
    }

    pub fn with_columns(mut self, columns: ColumnMap) -> Self {
        self.columns = columns;
        self
    }

    /// Restores the last session from the store and renders it.
    pub fn load(&mut self) -> Result<Vec<Effect>> {
        self.theme = self.store.load_theme().unwrap_or_default();
        let mut effects = vec![Effect::ApplyTheme(self.theme)];

        let records = self.store.load_dataset().unwrap_or_default();
        if records.is_empty() {
            self.forget_dataset();
            effects.push(Effect::Cleared);
            return Ok(effects);
        }

        self.options = FilterOptions::from_records(&records);
        self.records = records;
        self.inputs = self.store.load_user_inputs().unwrap_or_default();
        self.filter = self.store.load_filter_state().unwrap_or_default();
        if self.options.prune(&mut self.filter) > 0 {
            self.store.save_filter_state(&self.filter)?;
        }
        info!(records = self.records.len(), "restored session");

        effects.extend(self.render()?);
        Ok(effects)
    }

    /// Wipes every persisted slot and the in-memory session.
    pub fn reset(&mut self) -> Result<Vec<Effect>> {
        self.store.clear_all()?;
        self.forget_dataset();
        self.theme = Theme::default();
        info!("cleared all data");
        Ok(vec![Effect::ApplyTheme(self.theme), Effect::Cleared])
    }

    /// Stops the ticker. The engine stays usable; the next render restarts it.
    pub fn dispose(&mut self) {
        self.stop_ticker();
    }

    /// Decodes a source file and loads it as the new dataset.
    pub fn load_file(&mut self, decoder: &dyn RowDecoder, bytes: &[u8]) -> Result<Vec<Effect>> {
        let rows = decoder.decode(bytes).map_err(IngestionError::from)?;
        self.on_file_loaded(rows)
    }

    /// Replaces the dataset. Inputs and filters of the previous dataset are discarded since
    /// positional ids would otherwise point at unrelated rows.
    ///
    /// A rejected load leaves both memory and the store untouched.
    pub fn on_file_loaded(&mut self, rows: Vec<RawRow>) -> Result<Vec<Effect>> {
        let normalized = normalize(&rows, &self.columns)?;
        self.store.replace_dataset(&normalized.records)?;

        self.options = FilterOptions::from_records(&normalized.records);
        self.records = normalized.records;
        self.inputs.clear();
        self.filter = FilterState::default();

        let mut effects = self.render()?;
        if normalized.dropped > 0 {
            effects.push(Effect::Notify(format!(
                "{} rows loaded, {} without a valid scheduled time were skipped",
                self.records.len(),
                normalized.dropped
            )));
        }
        Ok(effects)
    }

    pub fn on_filter_changed(&mut self, change: FilterChange) -> Result<Vec<Effect>> {
        if self.records.is_empty() {
            return Ok(vec![Effect::Cleared]);
        }
        debug!(?change, "filter changed");
        match change {
            FilterChange::Select(dimension, value) => {
                if self.options.contains(dimension, &value) {
                    self.filter.selection_mut(dimension).insert(value);
                } else {
                    debug!(%dimension, value = %value, "ignoring selection of unknown value");
                }
            }
            FilterChange::Deselect(dimension, value) => {
                self.filter.selection_mut(dimension).remove(&value);
            }
            FilterChange::ToggleAll(dimension) => {
                let toggled = filter::toggle_select_all(
                    self.options.values(dimension),
                    self.filter.selection(dimension),
                );
                *self.filter.selection_mut(dimension) = toggled;
            }
            FilterChange::TimeRange { start, end } => {
                let start = start.map(range_bound).transpose()?;
                let end = end.map(range_bound).transpose()?;
                if let Some(start) = start {
                    self.filter.start_time = start;
                }
                if let Some(end) = end {
                    self.filter.end_time = end;
                }
            }
            FilterChange::Reset => {
                self.filter = FilterState::default();
            }
        }

        self.store.save_filter_state(&self.filter)?;
        self.render()
    }

    /// Resolves a typed value and adds it to the selection. A miss changes nothing.
    pub fn on_quick_search(&mut self, dimension: Dimension, token: &str) -> Result<Vec<Effect>> {
        if token.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value = filter::resolve_quick_search(dimension, token, self.options.values(dimension))?;
        self.filter.selection_mut(dimension).insert(value);
        self.store.save_filter_state(&self.filter)?;
        self.render()
    }

    /// Stores what the operator typed into one field of a row.
    ///
    /// A vehicle number is only saved. An observed time is classified right away, and
    /// an observed time typed without a 5-character vehicle number is cleared again.
    pub fn on_field_edited(
        &mut self,
        id: RecordId,
        field: Field,
        value: &str,
    ) -> Result<Vec<Effect>> {
        let value = value.trim();
        let record = find_record(&self.records, id)
            .ok_or(ValidationError::UnknownRecord(id))?
            .clone();

        match field {
            Field::Vehicle => {
                self.inputs.entry(id).or_default().vehicle_id = value.to_string();
                self.store.save_user_inputs(&self.inputs)?;
                Ok(Vec::new())
            }
            Field::ObservedTime => {
                if !value.is_empty() && !is_hh_mm(value) {
                    return Err(ValidationError::MalformedTime(value.to_string()).into());
                }
                let input = self.inputs.entry(id).or_default();
                input.observed_time = value.to_string();
                let deviation = evaluate(&record, input);
                let input = input.clone();
                self.store.save_user_inputs(&self.inputs)?;

                let past_due = is_past_due(
                    &record.scheduled_time,
                    self.clock.now_minutes(),
                    input.has_observed_time(),
                );
                let vehicle = input.vehicle_id.clone();
                let mut effects = vec![Effect::UpdateRow(ViewRow {
                    record,
                    input,
                    deviation,
                    past_due,
                })];
                if deviation == Deviation::Invalid {
                    effects.push(Effect::Notify(
                        ValidationError::InvalidVehicle { id, vehicle }.to_string(),
                    ));
                    effects.push(Effect::FocusVehicle(id));
                }
                Ok(effects)
            }
        }
    }

    /// Recomputes past-due markers for the displayed rows.
    pub fn on_tick(&self) -> Vec<Effect> {
        if self.view.is_empty() {
            return Vec::new();
        }
        let now = self.clock.now_minutes();
        let markers = self
            .view
            .iter()
            .filter_map(|&id| find_record(&self.records, id))
            .map(|record| {
                let filled = self
                    .inputs
                    .get(&record.id)
                    .is_some_and(UserInput::has_observed_time);
                (record.id, is_past_due(&record.scheduled_time, now, filled))
            })
            .collect();
        vec![Effect::Markers(markers)]
    }

    pub fn on_theme_toggled(&mut self) -> Result<Vec<Effect>> {
        self.theme = self.theme.toggled();
        self.store.save_theme(self.theme)?;
        Ok(vec![Effect::ApplyTheme(self.theme)])
    }

    pub fn records(&self) -> &[ScheduleRecord] {
        &self.records
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    pub fn input(&self, id: RecordId) -> Option<&UserInput> {
        self.inputs.get(&id)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn has_active_ticker(&self) -> bool {
        self.ticker.as_ref().is_some_and(|ticker| ticker.is_active())
    }

    /// The current view, classified without side effects. This is what exporters receive.
    pub fn view_rows(&self) -> Vec<ViewRow> {
        let now = self.clock.now_minutes();
        self.view
            .iter()
            .filter_map(|&id| find_record(&self.records, id))
            .map(|record| self.view_row(record, now))
            .collect()
    }

    fn view_row(&self, record: &ScheduleRecord, now: u16) -> ViewRow {
        let input = self.inputs.get(&record.id).cloned().unwrap_or_default();
        let deviation = classify(record, &input);
        let past_due = is_past_due(&record.scheduled_time, now, input.has_observed_time());
        ViewRow {
            record: record.clone(),
            input,
            deviation,
            past_due,
        }
    }

    /// Rebuilds the view and restarts the ticker for it.
    fn render(&mut self) -> Result<Vec<Effect>> {
        self.stop_ticker();

        self.view = filter::apply(&self.records, &self.filter)
            .into_iter()
            .map(|record| record.id)
            .collect();

        // Rows restored with an observed time are classified once, so invalid
        // leftovers get corrected like fresh edits.
        let mut notices = Vec::new();
        for &id in &self.view {
            let (Some(record), Some(input)) =
                (find_record(&self.records, id), self.inputs.get_mut(&id))
            else {
                continue;
            };
            if input.has_observed_time() && evaluate(record, input) == Deviation::Invalid {
                notices.push(Effect::Notify(
                    ValidationError::InvalidVehicle {
                        id,
                        vehicle: input.vehicle_id.clone(),
                    }
                    .to_string(),
                ));
            }
        }
        if !notices.is_empty() {
            self.store.save_user_inputs(&self.inputs)?;
        }

        let rows = self.view_rows();
        if !rows.is_empty() {
            self.ticker = Some(self.scheduler.start(REFRESH_INTERVAL));
            debug!(rows = rows.len(), "started past-due ticker");
        }

        let mut effects = vec![Effect::Render(rows)];
        effects.extend(notices);
        Ok(effects)
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn forget_dataset(&mut self) {
        self.stop_ticker();
        self.records.clear();
        self.options = FilterOptions::default();
        self.filter = FilterState::default();
        self.inputs.clear();
        self.view.clear();
    }
}

/// Ids are positions, so the direct index is tried first.
fn find_record(records: &[ScheduleRecord], id: RecordId) -> Option<&ScheduleRecord> {
    records
        .get(id as usize)
        .filter(|record| record.id == id)
        .or_else(|| records.iter().find(|record| record.id == id))
}

fn range_bound(value: String) -> Result<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        Ok(None)
    } else if is_hh_mm(value) {
        Ok(Some(value.to_string()))
    } else {
        Err(ValidationError::MalformedTime(value.to_string()).into())
    }
}

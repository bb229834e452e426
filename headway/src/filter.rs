//! Filter selections and the filtered, time-ordered view of a dataset.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::LookupError;
use crate::types::{Dimension, FilterState, ScheduleRecord};

/// Distinct values present in the loaded dataset, per dimension. Sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    lines: Vec<String>,
    tables: Vec<String>,
    posts: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[ScheduleRecord]) -> Self {
        let distinct = |dimension: Dimension| {
            records
                .iter()
                .map(|record| record.value(dimension).trim().to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect::<Vec<_>>()
        };

        Self {
            lines: distinct(Dimension::Line),
            tables: distinct(Dimension::Table),
            posts: distinct(Dimension::Post),
        }
    }

    pub fn values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Line => &self.lines,
            Dimension::Table => &self.tables,
            Dimension::Post => &self.posts,
        }
    }

    pub fn contains(&self, dimension: Dimension, value: &str) -> bool {
        self.values(dimension)
            .binary_search_by(|probe| probe.as_str().cmp(value))
            .is_ok()
    }

    /// Drops selections that are not values of this dataset. Returns how many were dropped.
    pub fn prune(&self, state: &mut FilterState) -> usize {
        let mut dropped = 0;
        for dimension in Dimension::ALL {
            let selection = state.selection_mut(dimension);
            let before = selection.len();
            selection.retain(|value| self.contains(dimension, value));
            dropped += before - selection.len();
        }
        if dropped > 0 {
            debug!(dropped, "pruned stale filter selections");
        }
        dropped
    }
}

/// Initial-passage records matching every selection and the time range, ordered by
/// scheduled time. Records sharing a time keep their ingestion order.
pub fn apply<'a>(records: &'a [ScheduleRecord], state: &FilterState) -> Vec<&'a ScheduleRecord> {
    let mut view: Vec<&ScheduleRecord> = records
        .iter()
        .filter(|record| record.is_initial_passage())
        .filter(|record| {
            Dimension::ALL
                .iter()
                .all(|&dimension| selects(state.selection(dimension), record.value(dimension)))
        })
        .filter(|record| within_range(&record.scheduled_time, state))
        .collect();

    // `sort_by` is stable
    view.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    view
}

fn selects(selection: &BTreeSet<String>, value: &str) -> bool {
    selection.is_empty() || selection.contains(value.trim())
}

// HH:MM is fixed width, so string order is time order.
fn within_range(scheduled_time: &str, state: &FilterState) -> bool {
    let after_start = state
        .start_time
        .as_deref()
        .map_or(true, |start| scheduled_time >= start);
    let before_end = state
        .end_time
        .as_deref()
        .map_or(true, |end| scheduled_time <= end);
    after_start && before_end
}

/// All-or-nothing toggle: everything selected becomes nothing, anything else becomes everything.
pub fn toggle_select_all(distinct: &[String], current: &BTreeSet<String>) -> BTreeSet<String> {
    if distinct.iter().all(|value| current.contains(value)) {
        BTreeSet::new()
    } else {
        distinct.iter().cloned().collect()
    }
}

/// Case-insensitive exact match of `token` against the known values of a dimension.
///
/// On a miss the error carries the closest fuzzy match, if any.
pub fn resolve_quick_search(
    dimension: Dimension,
    token: &str,
    distinct: &[String],
) -> Result<String, LookupError> {
    let token = token.trim();
    let wanted = token.to_lowercase();

    if let Some(found) = distinct.iter().find(|value| value.to_lowercase() == wanted) {
        return Ok(found.clone());
    }

    let matcher = SkimMatcherV2::default();
    let suggestion = distinct
        .iter()
        .filter_map(|value| matcher.fuzzy_match(value, token).map(|score| (value, score)))
        .max_by_key(|(_, score)| *score)
        .map(|(value, _)| value.clone());

    Err(LookupError::NotFound {
        dimension,
        token: token.to_string(),
        suggestion,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, line: &str, post: &str, time: &str, code: &str) -> ScheduleRecord {
        ScheduleRecord {
            id,
            line: line.to_string(),
            table: format!("T{}", id % 3),
            operator: "Vega".to_string(),
            control_post: post.to_string(),
            scheduled_time: time.to_string(),
            passage_type_code: code.to_string(),
        }
    }

    fn dataset() -> Vec<ScheduleRecord> {
        vec![
            record(0, "101", "Papicu", "08:30", "4"),
            record(1, "202", "Siqueira", "06:15", "7"),
            record(2, "101", "Papicu", "07:00", "5"),
            record(3, "303", "Messejana", "08:30", "4"),
            record(4, "101", "Siqueira", "05:45", "4"),
            record(5, "202", "Papicu", "08:30", "7"),
        ]
    }

    fn ids(view: &[&ScheduleRecord]) -> Vec<u32> {
        view.iter().map(|r| r.id).collect()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_filter_shows_initial_passages_by_time() {
        let records = dataset();
        let view = apply(&records, &FilterState::default());
        assert_eq!(ids(&view), vec![4, 1, 0, 3, 5]);
    }

    #[test]
    fn equal_times_keep_ingestion_order() {
        let records = dataset();
        let view = apply(&records, &FilterState::default());
        let at_830: Vec<_> = view
            .iter()
            .filter(|r| r.scheduled_time == "08:30")
            .map(|r| r.id)
            .collect();
        assert_eq!(at_830, vec![0, 3, 5]);
    }

    #[test]
    fn selections_combine_across_dimensions() {
        let records = dataset();
        let state = FilterState {
            selected_lines: set(&["101", "202"]),
            selected_posts: set(&["Papicu"]),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&records, &state)), vec![0, 5]);
    }

    #[test]
    fn time_range_is_inclusive() {
        let records = dataset();
        let state = FilterState {
            start_time: Some("06:15".into()),
            end_time: Some("08:30".into()),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&records, &state)), vec![1, 0, 3, 5]);

        let open_end = FilterState {
            start_time: Some("08:00".into()),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&records, &open_end)), vec![0, 3, 5]);
    }

    #[test]
    fn applying_twice_gives_the_same_view() {
        let records = dataset();
        let state = FilterState {
            selected_lines: set(&["101", "303"]),
            end_time: Some("09:00".into()),
            ..FilterState::default()
        };
        assert_eq!(apply(&records, &state), apply(&records, &state));
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        let options = FilterOptions::from_records(&dataset());
        assert_eq!(options.values(Dimension::Line), ["101", "202", "303"]);
        assert_eq!(
            options.values(Dimension::Post),
            ["Messejana", "Papicu", "Siqueira"]
        );
        assert!(options.contains(Dimension::Table, "T0"));
        assert!(!options.contains(Dimension::Line, "404"));
    }

    #[test]
    fn prune_drops_unknown_values() {
        let options = FilterOptions::from_records(&dataset());
        let mut state = FilterState {
            selected_lines: set(&["101", "999"]),
            selected_posts: set(&["Nowhere"]),
            ..FilterState::default()
        };
        assert_eq!(options.prune(&mut state), 2);
        assert_eq!(state.selected_lines, set(&["101"]));
        assert!(state.selected_posts.is_empty());
    }

    #[test]
    fn toggle_all_is_all_or_nothing() {
        let lines = vec!["101".to_string(), "202".to_string(), "303".to_string()];

        let everything = set(&["101", "202", "303"]);
        assert!(toggle_select_all(&lines, &everything).is_empty());

        let partial = set(&["202"]);
        assert_eq!(toggle_select_all(&lines, &partial), everything);

        assert_eq!(toggle_select_all(&lines, &BTreeSet::new()), everything);
    }

    #[test]
    fn quick_search_ignores_case_and_whitespace() {
        let posts = vec!["Messejana".to_string(), "Papicu".to_string()];
        assert_eq!(
            resolve_quick_search(Dimension::Post, "  papicu ", &posts).unwrap(),
            "Papicu"
        );
    }

    #[test]
    fn quick_search_miss_suggests_closest_value() {
        let lines = vec!["101".to_string(), "202".to_string()];
        let err = resolve_quick_search(Dimension::Line, "10", &lines).unwrap_err();
        assert_eq!(
            err,
            LookupError::NotFound {
                dimension: Dimension::Line,
                token: "10".to_string(),
                suggestion: Some("101".to_string()),
            }
        );

        let err = resolve_quick_search(Dimension::Line, "xyz", &lines).unwrap_err();
        assert!(matches!(err, LookupError::NotFound { suggestion: None, .. }));
    }
}

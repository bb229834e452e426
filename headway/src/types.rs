use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::{Display, EnumString};

/// Position of a record among the rows that survived normalization.
pub type RecordId = u32;

/// Passage-type codes marking the initial passage of a trip. Only these rows are shown.
pub const INITIAL_PASSAGE_CODES: [&str; 2] = ["4", "7"];

/// One scheduled departure, as produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub id: RecordId,
    pub line: String,
    pub table: String,
    pub operator: String,
    pub control_post: String,
    /// Always `HH:MM`.
    pub scheduled_time: String,
    pub passage_type_code: String,
}

impl ScheduleRecord {
    pub fn is_initial_passage(&self) -> bool {
        INITIAL_PASSAGE_CODES.contains(&self.passage_type_code.as_str())
    }

    /// The record's value along a filter dimension.
    pub fn value(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Line => &self.line,
            Dimension::Table => &self.table,
            Dimension::Post => &self.control_post,
        }
    }
}

/// What the operator typed for a record. Empty strings mean "not filled".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    #[serde(default)]
    pub vehicle_id: String,
    #[serde(default)]
    pub observed_time: String,
}

impl UserInput {
    pub fn has_observed_time(&self) -> bool {
        !self.observed_time.is_empty()
    }
}

pub type UserInputs = BTreeMap<RecordId, UserInput>;

/// A filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Dimension {
    Line,
    Table,
    Post,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Line, Dimension::Table, Dimension::Post];
}

/// Current filter selections. Empty sets and absent times do not restrict anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub selected_lines: BTreeSet<String>,
    pub selected_tables: BTreeSet<String>,
    pub selected_posts: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl FilterState {
    pub fn selection(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Line => &self.selected_lines,
            Dimension::Table => &self.selected_tables,
            Dimension::Post => &self.selected_posts,
        }
    }

    pub fn selection_mut(&mut self, dimension: Dimension) -> &mut BTreeSet<String> {
        match dimension {
            Dimension::Line => &mut self.selected_lines,
            Dimension::Table => &mut self.selected_tables,
            Dimension::Post => &mut self.selected_posts,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_state_uses_camel_case_keys() {
        let mut state = FilterState::default();
        state.selected_lines.insert("101".to_string());
        state.start_time = Some("06:00".to_string());

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["selectedLines"], serde_json::json!(["101"]));
        assert_eq!(json["selectedPosts"], serde_json::json!([]));
        assert_eq!(json["startTime"], "06:00");
        assert!(json.get("endTime").is_none());
    }

    #[test]
    fn theme_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Theme::Dark).unwrap(), "\"dark\"");
        assert_eq!("light".parse::<Theme>().unwrap(), Theme::Light);
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
    }

    #[test]
    fn dimension_parses_case_insensitively() {
        assert_eq!("LINE".parse::<Dimension>().unwrap(), Dimension::Line);
        assert_eq!("post".parse::<Dimension>().unwrap(), Dimension::Post);
        assert!("operator".parse::<Dimension>().is_err());
    }

    #[test]
    fn only_codes_four_and_seven_are_initial_passages() {
        let mut record = ScheduleRecord {
            id: 0,
            line: "101".into(),
            table: "1".into(),
            operator: "ACME".into(),
            control_post: "T1".into(),
            scheduled_time: "08:00".into(),
            passage_type_code: "4".into(),
        };
        assert!(record.is_initial_passage());
        record.passage_type_code = "7".into();
        assert!(record.is_initial_passage());
        record.passage_type_code = "5".into();
        assert!(!record.is_initial_passage());
    }
}

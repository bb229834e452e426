use clap::{Parser, Subcommand};
use headway::Dimension;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "headway")]
#[command(about = "Check a day's bus departures against what was observed at the control posts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a schedule file (.csv, .tsv or .json), replacing the current one
    Load { file: PathBuf },
    /// Print the filtered schedule
    Show,
    /// Record the observed vehicle and/or time for a row
    Set {
        id: u32,
        #[arg(long)]
        vehicle: Option<String>,
        /// Observed time, HH:MM. Pass an empty string to clear it.
        #[arg(long)]
        time: Option<String>,
    },
    /// Add a line, table or post to the filter (case-insensitive)
    Select { dimension: Dimension, value: String },
    /// Remove a value from the filter
    Deselect { dimension: Dimension, value: String },
    /// Select every value of a dimension, or none if all are selected
    ToggleAll { dimension: Dimension },
    /// Restrict the schedule to a time window (HH:MM, inclusive).
    /// A bound left out keeps its current value; pass `-` to clear it.
    Range {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Drop every filter
    ResetFilters,
    /// Switch between light and dark theme
    Theme,
    /// Remove the loaded schedule and everything entered for it
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Write the filtered schedule with observations to a CSV file
    Export { file: PathBuf },
    /// Interactive session with live past-due markers
    Session,
    /// Print config path and create default file if missing
    ConfigPath,
}

/// A command typed inside an interactive session.
#[derive(Debug, Parser)]
#[command(name = "session", no_binary_name = true)]
pub struct SessionLine {
    #[command(subcommand)]
    pub command: Commands,
}

impl SessionLine {
    pub fn parse_line(line: &str) -> Result<Commands, clap::Error> {
        Self::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_set_with_both_fields() {
        let command = SessionLine::parse_line("set 4 --vehicle 12345 --time 08:10").unwrap();
        let Commands::Set { id, vehicle, time } = command else {
            panic!("expected set, got {:?}", command);
        };
        assert_eq!(id, 4);
        assert_eq!(vehicle.as_deref(), Some("12345"));
        assert_eq!(time.as_deref(), Some("08:10"));
    }

    #[test]
    fn parses_dimension_names() {
        let command = SessionLine::parse_line("select Line 101").unwrap();
        assert!(matches!(
            command,
            Commands::Select { dimension: Dimension::Line, ref value } if value == "101"
        ));
        assert!(SessionLine::parse_line("select operator Vega").is_err());
    }

    #[test]
    fn clear_requires_flag_to_be_explicit() {
        assert!(matches!(
            SessionLine::parse_line("clear").unwrap(),
            Commands::Clear { yes: false }
        ));
    }
}

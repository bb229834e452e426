use std::time::Duration;

use crate::time_of_day::to_minutes;

/// How often past-due markers are recomputed for the displayed rows.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// The scheduled time has gone by and nothing was observed for it yet.
pub fn is_past_due(scheduled_time: &str, current_minutes: u16, observed_time_is_set: bool) -> bool {
    if observed_time_is_set {
        return false;
    }
    to_minutes(scheduled_time).is_some_and(|scheduled| scheduled < current_minutes)
}

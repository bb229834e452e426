use strum::Display;

use crate::time_of_day::to_minutes;
use crate::types::{ScheduleRecord, UserInput};

/// Minutes either side of the scheduled time that still count as on time.
pub const TOLERANCE_MINUTES: i32 = 10;

/// Required length of a vehicle number.
pub const VEHICLE_ID_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Deviation {
    /// No observed time yet.
    Unclassified,
    /// Observed time entered without a valid vehicle number.
    Invalid,
    OnTime,
    Late,
    Early,
}

impl Deviation {
    /// Short marker shown next to the scheduled time. On-time rows carry none.
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Deviation::Late => Some("(Late)"),
            Deviation::Early => Some("(Early)"),
            Deviation::Invalid => Some("(Vehicle?)"),
            Deviation::Unclassified | Deviation::OnTime => None,
        }
    }
}

pub fn is_valid_vehicle(vehicle_id: &str) -> bool {
    vehicle_id.chars().count() == VEHICLE_ID_LEN
}

/// Pure classification of a record against what was typed for it.
pub fn classify(record: &ScheduleRecord, input: &UserInput) -> Deviation {
    if !input.has_observed_time() {
        return Deviation::Unclassified;
    }
    if !is_valid_vehicle(&input.vehicle_id) {
        return Deviation::Invalid;
    }

    let (Some(observed), Some(scheduled)) = (
        to_minutes(&input.observed_time),
        to_minutes(&record.scheduled_time),
    ) else {
        return Deviation::Unclassified;
    };

    let diff = observed as i32 - scheduled as i32;
    if diff > TOLERANCE_MINUTES {
        Deviation::Late
    } else if diff < -TOLERANCE_MINUTES {
        Deviation::Early
    } else {
        Deviation::OnTime
    }
}

/// Classifies and applies the `Invalid` correction: the observed time is cleared so the
/// operator re-enters it after fixing the vehicle number.
///
/// Returns the classification made before clearing.
pub fn evaluate(record: &ScheduleRecord, input: &mut UserInput) -> Deviation {
    let deviation = classify(record, input);
    if deviation == Deviation::Invalid {
        input.observed_time.clear();
    }
    deviation
}

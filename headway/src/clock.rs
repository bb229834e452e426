use chrono::{Timelike, Utc};
use chrono_tz::Tz;

use crate::error::UnknownTimezone;

/// Zone the schedules are published in.
pub const DEFAULT_TIMEZONE: &str = "America/Fortaleza";

/// Wall-clock time of day, in minutes since midnight (`0..1440`).
pub trait Clock: Send + Sync {
    fn now_minutes(&self) -> u16;
}

/// Reads the system clock and converts it into a fixed IANA zone.
#[derive(Debug, Clone, Copy)]
pub struct ZonedClock {
    tz: Tz,
}

impl ZonedClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_name(name: &str) -> Result<Self, UnknownTimezone> {
        let tz: Tz = name
            .parse()
            .map_err(|_| UnknownTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Default for ZonedClock {
    fn default() -> Self {
        Self::new(chrono_tz::America::Fortaleza)
    }
}

impl Clock for ZonedClock {
    fn now_minutes(&self) -> u16 {
        let now = Utc::now().with_timezone(&self.tz);
        (now.hour() * 60 + now.minute()) as u16
    }
}

/// A clock stuck at one time of day. Used for tests and replaying a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u16);

impl Clock for FixedClock {
    fn now_minutes(&self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_of_day::MINUTES_PER_DAY;

    #[test]
    fn parses_iana_names() {
        let clock = ZonedClock::from_name(DEFAULT_TIMEZONE).unwrap();
        assert_eq!(clock.timezone(), chrono_tz::America::Fortaleza);
        assert!(ZonedClock::from_name("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn zoned_clock_stays_within_a_day() {
        let clock = ZonedClock::default();
        assert!(clock.now_minutes() < MINUTES_PER_DAY);
    }

    #[test]
    fn fixed_clock_returns_its_value() {
        assert_eq!(FixedClock(540).now_minutes(), 540);
    }
}

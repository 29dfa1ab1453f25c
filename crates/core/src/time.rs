use chrono::{DateTime, Duration, Utc};

use crate::model::wire::parse_timestamp;

/// Time source for deriving schedule phases.
///
/// Services never read the wall clock directly; they hold a `Clock` so tests
/// and the `--now` CLI flag can pin "now" to a known instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Clock pinned at a timestamp in any layout the schedules API uses.
    #[must_use]
    pub fn fixed_at(raw: &str) -> Option<Self> {
        parse_timestamp(raw).map(Self::Fixed)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Deterministic timestamp for tests (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), fixed_now() + Duration::hours(2));
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::system();
        clock.advance(Duration::days(365));
        assert_eq!(clock, Clock::System);
    }

    #[test]
    fn fixed_at_parses_api_layouts() {
        let clock = Clock::fixed_at("2023-11-14 22:13:20").unwrap();
        assert_eq!(clock.now(), fixed_now());
        assert!(Clock::fixed_at("tomorrow").is_none());
    }
}

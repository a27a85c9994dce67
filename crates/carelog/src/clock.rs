//! Time source for record timestamps and "today".

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Local, NaiveDate};

/// Source of the current local time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current local time.
    fn now(&self) -> DateTime<Local>;

    /// The current local date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock stopped at one instant, moved only by [`FixedClock::set`].
#[derive(Debug)]
pub struct FixedClock {
    at: RwLock<DateTime<Local>>,
}

impl FixedClock {
    /// Stop the clock at `at`.
    #[must_use]
    pub fn new(at: DateTime<Local>) -> Self {
        Self {
            at: RwLock::new(at),
        }
    }

    /// Move the clock to `at`.
    pub fn set(&self, at: DateTime<Local>) {
        *self.at.write().unwrap_or_else(PoisonError::into_inner) = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.at.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_today() {
        let at = Local.with_ymd_and_hms(2025, 7, 11, 9, 30, 0).unwrap();
        let clock = FixedClock::new(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 7, 11).unwrap());
    }

    #[test]
    fn test_fixed_clock_set() {
        let clock = FixedClock::new(Local.with_ymd_and_hms(2025, 7, 11, 23, 59, 0).unwrap());
        clock.set(Local.with_ymd_and_hms(2025, 7, 12, 0, 1, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2025, 7, 12).unwrap());
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock;
        let first = clock.now();
        assert!(clock.now() >= first);
    }
}

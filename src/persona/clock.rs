//! Wall-clock source, injectable so tests can pin time.

use chrono::{DateTime, Duration, Local, Timelike, Utc};
use std::sync::Mutex;

use super::types::TimeOfDay;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Hour used for time-of-day bucketing.
    fn hour(&self) -> u32 {
        self.now().hour()
    }

    fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_hour(self.hour())
    }
}

/// The system clock. Time-of-day uses the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// A clock that only moves when told to. Hours are read in UTC.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

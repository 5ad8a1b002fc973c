use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub fn elapsed_minutes(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - start).num_milliseconds() as f64 / 60_000.0
}

/// Never exceeded when `budget_minutes <= 0`.
pub fn exceeded(elapsed_minutes: f64, budget_minutes: i64) -> bool {
    budget_minutes > 0 && elapsed_minutes >= budget_minutes as f64
}

/// Wall-clock ceiling for one scan, polled at feed and entry boundaries.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: DateTime<Utc>,
    budget_minutes: i64,
}

impl Deadline {
    pub fn new(start: DateTime<Utc>, budget_minutes: i64) -> Self {
        Self { start, budget_minutes }
    }

    pub fn is_exceeded(&self, now: DateTime<Utc>) -> bool {
        exceeded(elapsed_minutes(self.start, now), self.budget_minutes)
    }

    pub fn budget_minutes(&self) -> i64 {
        self.budget_minutes
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_elapsed_minutes() {
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(elapsed_minutes(start, start + Duration::seconds(90)), 1.5);
    }

    #[test]
    fn test_unbounded_budget() {
        assert!(!exceeded(1_000.0, 0));
        assert!(!exceeded(1_000.0, -5));
    }

    #[test]
    fn test_deadline() {
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        let deadline = Deadline::new(start, 1);
        assert!(!deadline.is_exceeded(start + Duration::seconds(59)));
        assert!(deadline.is_exceeded(start + Duration::seconds(60)));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Closed time window `[start, end]` with `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(rename = "period_start")]
    start: DateTime<Utc>,
    #[serde(rename = "period_end")]
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidPeriod);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn overlaps(&self, other: &Period) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 0, 0, 0).unwrap()
    }

    fn end_of(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, month, day, 23, 59, 59).unwrap()
    }

    #[test]
    fn start_must_precede_end() {
        assert_eq!(Period::new(day(3, 1), day(3, 1)), Err(ValidationError::InvalidPeriod));
        assert_eq!(Period::new(day(3, 2), day(3, 1)), Err(ValidationError::InvalidPeriod));
    }

    #[test]
    fn overlap_uses_inclusive_bounds() {
        let q1 = Period::new(day(1, 1), end_of(3, 31)).unwrap();
        let overlapping = Period::new(day(3, 15), end_of(6, 30)).unwrap();
        let adjacent = Period::new(day(4, 1), end_of(6, 30)).unwrap();
        let touching = Period::new(end_of(3, 31), end_of(6, 30)).unwrap();

        assert!(q1.overlaps(&overlapping));
        assert!(overlapping.overlaps(&q1));
        assert!(!q1.overlaps(&adjacent));
        assert!(q1.overlaps(&touching));
    }

    #[test]
    fn contains_includes_both_edges() {
        let period = Period::new(day(1, 1), end_of(1, 31)).unwrap();
        assert!(period.contains(day(1, 1)));
        assert!(period.contains(end_of(1, 31)));
        assert!(!period.contains(day(2, 1)));
    }
}

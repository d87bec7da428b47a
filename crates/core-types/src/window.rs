use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A half-open interval `[start, end)` in UTC. A missing bound is unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Creates a bounded window, rejecting an inverted one before any query can run.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvertedWindow { start, end });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// All history strictly before `end`.
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// `[now - days, now)`.
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: Some(now - Duration::days(i64::from(days))),
            end: Some(now),
        }
    }

    /// The UTC calendar day `[date 00:00, date+1 00:00)`.
    pub fn day(date: NaiveDate) -> Result<Self, CoreError> {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let next = date
            .succ_opt()
            .ok_or_else(|| CoreError::MalformedWindow(format!("no day follows {date}")))?;
        Self::new(start, next.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// The UTC calendar day containing `at`.
    pub fn day_containing(at: DateTime<Utc>) -> Result<Self, CoreError> {
        Self::day(at.date_naive())
    }

    /// `[start_of_yesterday, start_of_today)` relative to `now`, UTC-aligned.
    pub fn yesterday(now: DateTime<Utc>) -> Result<Self, CoreError> {
        let today = now.date_naive();
        let yesterday = today
            .pred_opt()
            .ok_or_else(|| CoreError::MalformedWindow(format!("no day precedes {today}")))?;
        Self::day(yesterday)
    }

    /// Parses a `YYYY-MM-DD` date into its calendar-day window.
    pub fn parse_day(input: &str) -> Result<Self, CoreError> {
        let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|e| {
            CoreError::MalformedWindow(format!("'{input}' is not a YYYY-MM-DD date: {e}"))
        })?;
        Self::day(date)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at < end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "[{}, {})", s.to_rfc3339(), e.to_rfc3339()),
            (Some(s), None) => write!(f, "[{}, ..)", s.to_rfc3339()),
            (None, Some(e)) => write!(f, "(.., {})", e.to_rfc3339()),
            (None, None) => f.write_str("(.., ..)"),
        }
    }
}

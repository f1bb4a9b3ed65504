use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("range start {start} is after end {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("both start and end must be provided")]
    HalfOpen,
}

/// Inclusive calendar-date window applied to record creation dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds an optional range from two optional bounds. Giving only one
    /// bound is an error; giving neither means "unbounded".
    pub fn from_bounds(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<Self>, DateRangeError> {
        match (start, end) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => {
                Self::new(parse_date(start)?, parse_date(end)?).map(Some)
            }
            _ => Err(DateRangeError::HalfOpen),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| DateRangeError::InvalidDate(input.to_string()))
}

//! Calendar date parsing and month arithmetic.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Serialize, Serializer};

use crate::error::{CalNotesError, CalNotesResult};

/// Wire and storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parse a strict `YYYY-MM-DD` date.
///
/// Impossible days (April 31, February 29 outside leap years) are rejected,
/// as are short forms like `2025-1-1`.
pub fn parse_date(s: &str) -> CalNotesResult<NaiveDate> {
    let well_formed = s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !well_formed {
        return Err(invalid_date(s));
    }

    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| invalid_date(s))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn invalid_date(s: &str) -> CalNotesError {
    CalNotesError::Validation(format!("Invalid date '{}'. Expected YYYY-MM-DD", s))
}

/// A calendar month, e.g. 2025-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(year: i32, month: u32) -> CalNotesResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CalNotesError::Validation(format!(
                "Invalid month {}. Expected 1-12",
                month
            )));
        }
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(CalNotesError::Validation(format!(
                "Invalid year {}. Expected {}-{}",
                year,
                Self::MIN_YEAR,
                Self::MAX_YEAR
            )));
        }
        Ok(YearMonth { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// Previous month, wrapping January back to December of the prior year.
    pub fn prev(&self) -> Self {
        if self.month == 1 {
            YearMonth {
                year: self.year - 1,
                month: 12,
            }
        } else {
            YearMonth {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Next month, wrapping December forward to January of the next year.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            YearMonth {
                year: self.year + 1,
                month: 1,
            }
        } else {
            YearMonth {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if NaiveDate::from_ymd_opt(self.year, 2, 29).is_some() => 29,
            2 => 28,
            _ => 31,
        }
    }

    /// The date for `day` in this month, if it exists.
    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.date(1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.date(self.days_in_month())
    }

    /// Weekday of the 1st; Monday when the date is out of chrono's range.
    pub fn first_weekday(&self) -> Weekday {
        self.first_day().map_or(Weekday::Mon, |d| d.weekday())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Serialized as a `[year, month]` pair.
impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.year, self.month).serialize(serializer)
    }
}

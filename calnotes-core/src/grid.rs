//! Month grid construction.
//!
//! Weeks start on Monday. Days before the 1st and after the last day of the
//! month are blank cells, so every week has exactly seven cells and a month
//! spans four to six weeks.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::date::YearMonth;
use crate::defaults::DefaultEvents;
use crate::model::Note;

const DAYS_PER_WEEK: usize = 7;

/// One square of the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    /// Day of month; `None` for padding cells
    pub day: Option<u32>,
    pub date: Option<NaiveDate>,
    /// Default event first, then the user's event
    pub events: Vec<String>,
    pub notes: Vec<String>,
    pub is_today: bool,
}

impl DayCell {
    fn blank() -> Self {
        DayCell {
            day: None,
            date: None,
            events: Vec::new(),
            notes: Vec::new(),
            is_today: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthInfo {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub prev_month: YearMonth,
    pub next_month: YearMonth,
}

impl MonthInfo {
    pub fn new(month: YearMonth) -> Self {
        MonthInfo {
            year: month.year(),
            month: month.month(),
            month_name: month.month_name(),
            prev_month: month.prev(),
            next_month: month.next(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    /// Weeks of exactly seven cells
    pub calendar: Vec<Vec<DayCell>>,
    pub month_info: MonthInfo,
}

/// Build the grid for `month`.
///
/// `user_events` and `user_notes` may contain entries outside the month;
/// they are ignored. `today` is compared by exact date, so the caller picks
/// the timezone.
pub fn build_month_grid(
    month: YearMonth,
    today: NaiveDate,
    defaults: &DefaultEvents,
    user_events: &BTreeMap<NaiveDate, String>,
    user_notes: &[Note],
) -> MonthGrid {
    let mut notes_by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for note in user_notes {
        notes_by_date
            .entry(note.date)
            .or_default()
            .push(note.content.clone());
    }

    let leading = month.first_weekday().num_days_from_monday() as usize;
    let mut cells: Vec<DayCell> = (0..leading).map(|_| DayCell::blank()).collect();

    for day in 1..=month.days_in_month() {
        let Some(date) = month.date(day) else {
            continue;
        };

        cells.push(DayCell {
            day: Some(day),
            date: Some(date),
            events: merged_events(date, defaults, user_events),
            notes: notes_by_date.remove(&date).unwrap_or_default(),
            is_today: date == today,
        });
    }

    while cells.len() % DAYS_PER_WEEK != 0 {
        cells.push(DayCell::blank());
    }

    let mut calendar = Vec::with_capacity(cells.len() / DAYS_PER_WEEK);
    let mut week = Vec::with_capacity(DAYS_PER_WEEK);
    for cell in cells {
        week.push(cell);
        if week.len() == DAYS_PER_WEEK {
            calendar.push(std::mem::replace(
                &mut week,
                Vec::with_capacity(DAYS_PER_WEEK),
            ));
        }
    }

    MonthGrid {
        calendar,
        month_info: MonthInfo::new(month),
    }
}

/// Union of the default event and the user's event for `date`.
/// A user event never replaces a default one; identical text is listed once.
fn merged_events(
    date: NaiveDate,
    defaults: &DefaultEvents,
    user_events: &BTreeMap<NaiveDate, String>,
) -> Vec<String> {
    let mut events = Vec::new();
    if let Some(name) = defaults.get(date) {
        events.push(name.to_string());
    }
    if let Some(description) = user_events.get(&date) {
        if !events.iter().any(|e| e == description) {
            events.push(description.clone());
        }
    }
    events
}

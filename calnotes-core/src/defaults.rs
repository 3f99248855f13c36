//! Default events: fixed, read-only annotations shown to every user.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::date::parse_date;
use crate::error::{CalNotesError, CalNotesResult};

/// Built-in public holidays and observances.
const BUILTIN: &[(i32, u32, u32, &str)] = &[
    (2025, 1, 1, "元旦"),
    (2025, 1, 29, "春节"),
    (2025, 2, 14, "情人节"),
    (2025, 4, 5, "清明节"),
    (2025, 5, 1, "劳动节"),
    (2025, 6, 22, "端午节"),
    (2025, 9, 29, "中秋节"),
    (2025, 10, 1, "国庆节"),
    (2025, 12, 25, "圣诞节"),
];

/// Date-keyed table of default events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultEvents {
    entries: BTreeMap<NaiveDate, String>,
}

impl DefaultEvents {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .filter_map(|&(y, m, d, name)| {
                NaiveDate::from_ymd_opt(y, m, d).map(|date| (date, name.to_string()))
            })
            .collect();
        DefaultEvents { entries }
    }

    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        DefaultEvents {
            entries: BTreeMap::new(),
        }
    }

    /// Built-in table extended with `"YYYY-MM-DD" = "name"` entries from
    /// configuration. A configured entry replaces a built-in one on the same date.
    pub fn from_config(extra: &BTreeMap<String, String>) -> CalNotesResult<Self> {
        let mut defaults = Self::builtin();
        for (date, name) in extra {
            let date = parse_date(date)?;
            let name = name.trim();
            if name.is_empty() {
                return Err(CalNotesError::Validation(format!(
                    "Default event on {} has an empty name",
                    date
                )));
            }
            defaults.entries.insert(date, name.to_string());
        }
        Ok(defaults)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.entries.get(&date).map(String::as_str)
    }
}

impl Default for DefaultEvents {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_builtin_contains_new_year() {
        let defaults = DefaultEvents::builtin();
        assert_eq!(defaults.get(date(2025, 1, 1)), Some("元旦"));
        assert_eq!(defaults.get(date(2025, 1, 29)), Some("春节"));
        assert_eq!(defaults.get(date(2025, 12, 25)), Some("圣诞节"));
        assert_eq!(defaults.get(date(2025, 1, 2)), None);
        assert_eq!(DefaultEvents::empty().get(date(2025, 1, 1)), None);
    }

    #[test]
    fn test_from_config_extends_and_overrides() {
        let mut extra = BTreeMap::new();
        extra.insert("2026-01-01".to_string(), "New Year".to_string());
        extra.insert("2025-12-25".to_string(), "Christmas".to_string());

        let defaults = DefaultEvents::from_config(&extra).unwrap();
        assert_eq!(defaults.get(date(2025, 1, 1)), Some("元旦"));
        assert_eq!(defaults.get(date(2026, 1, 1)), Some("New Year"));
        assert_eq!(defaults.get(date(2025, 12, 25)), Some("Christmas"));
    }

    #[test]
    fn test_from_config_rejects_bad_dates() {
        let mut extra = BTreeMap::new();
        extra.insert("2025-04-31".to_string(), "Nope".to_string());
        assert!(DefaultEvents::from_config(&extra).is_err());
    }
}

//! Holiday calendar lookups.
//!
//! The calendar data source and its refresh cadence are external; this module
//! defines the lookup contract and an in-memory calendar that satisfies it
//! with O(log n) lookups after a one-time load.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ValidationError};

/// Answers "is this date a holiday?" and "what is it called?".
///
/// Lookups are by exact date. A failing lookup is a collaborator failure and
/// is propagated to the caller unchanged.
pub trait HolidayOracle {
    fn is_holiday(&self, date: NaiveDate) -> Result<bool, ScheduleError>;

    fn name_of(&self, date: NaiveDate) -> Result<Option<String>, ScheduleError>;
}

impl<T: HolidayOracle + ?Sized> HolidayOracle for &T {
    fn is_holiday(&self, date: NaiveDate) -> Result<bool, ScheduleError> {
        (**self).is_holiday(date)
    }

    fn name_of(&self, date: NaiveDate) -> Result<Option<String>, ScheduleError> {
        (**self).name_of(date)
    }
}

/// A single holiday entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub date: NaiveDate,
    pub name: String,
}

/// In-memory holiday calendar keyed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolidayCalendar {
    days: BTreeMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `"YYYY-MM-DD": "Name"` pairs.
    ///
    /// # Errors
    /// Returns an error if the document is not such an object or a key is
    /// not a valid date.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidValue {
                field: "holidays".into(),
                message: e.to_string(),
            })?;

        let mut calendar = Self::new();
        for (date, name) in raw {
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
                ValidationError::InvalidValue {
                    field: "holidays".into(),
                    message: format!("'{date}' is not a YYYY-MM-DD date"),
                }
            })?;
            calendar.insert(date, name);
        }
        Ok(calendar)
    }

    pub fn insert(&mut self, date: NaiveDate, name: impl Into<String>) {
        self.days.insert(date, name.into());
    }

    pub fn remove(&mut self, date: NaiveDate) -> Option<String> {
        self.days.remove(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Holidays in `[from, to]`, in date order.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> Vec<HolidayRecord> {
        if from > to {
            return Vec::new();
        }
        self.days
            .range(from..=to)
            .map(|(date, name)| HolidayRecord {
                date: *date,
                name: name.clone(),
            })
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = HolidayRecord> + '_ {
        self.days.iter().map(|(date, name)| HolidayRecord {
            date: *date,
            name: name.clone(),
        })
    }
}

impl FromIterator<HolidayRecord> for HolidayCalendar {
    fn from_iter<I: IntoIterator<Item = HolidayRecord>>(iter: I) -> Self {
        let mut calendar = Self::new();
        for record in iter {
            calendar.insert(record.date, record.name);
        }
        calendar
    }
}

impl HolidayOracle for HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> Result<bool, ScheduleError> {
        Ok(self.days.contains_key(&date))
    }

    fn name_of(&self, date: NaiveDate) -> Result<Option<String>, ScheduleError> {
        Ok(self.days.get(&date).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn lookups_are_exact_date_matches() {
        let mut cal = HolidayCalendar::new();
        cal.insert(date(2026, 1, 1), "New Year's Day");
        assert!(cal.is_holiday(date(2026, 1, 1)).unwrap());
        assert!(!cal.is_holiday(date(2026, 1, 2)).unwrap());
        assert_eq!(
            cal.name_of(date(2026, 1, 1)).unwrap().as_deref(),
            Some("New Year's Day")
        );
        assert_eq!(cal.name_of(date(2025, 1, 1)).unwrap(), None);
    }

    #[test]
    fn from_json_parses_date_map() {
        let cal = HolidayCalendar::from_json(
            r#"{"2026-05-05": "Children's Day", "2026-05-03": "Constitution Day"}"#,
        )
        .unwrap();
        assert_eq!(cal.len(), 2);
        let records = cal.between(date(2026, 5, 1), date(2026, 5, 31));
        assert_eq!(records[0].name, "Constitution Day");
        assert_eq!(records[1].date, date(2026, 5, 5));
    }

    #[test]
    fn from_json_rejects_bad_dates() {
        let err = HolidayCalendar::from_json(r#"{"05/05/2026": "Children's Day"}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
        assert!(HolidayCalendar::from_json("[1, 2]").is_err());
    }

    #[test]
    fn between_handles_inverted_range() {
        let mut cal = HolidayCalendar::new();
        cal.insert(date(2026, 1, 1), "New Year's Day");
        assert!(cal.between(date(2026, 2, 1), date(2026, 1, 1)).is_empty());
    }
}

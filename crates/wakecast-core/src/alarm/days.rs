//! Weekday set used by recurring alarms.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const ALL_BITS: u8 = 0b0111_1111;
const WEEKDAY_BITS: u8 = 0b0001_1111;
const WEEKEND_BITS: u8 = 0b0110_0000;

const ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Set of weekdays an alarm recurs on.
///
/// Stored as a Monday-first bitset. An empty set is legal in storage and
/// means "every day"; [`DaySet::effective`] performs that normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DaySet(u8);

impl DaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn every_day() -> Self {
        Self(ALL_BITS)
    }

    pub const fn weekdays() -> Self {
        Self(WEEKDAY_BITS)
    }

    pub const fn weekends() -> Self {
        Self(WEEKEND_BITS)
    }

    pub fn only(day: Weekday) -> Self {
        Self(bit(day))
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !bit(day);
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 & ALL_BITS == 0
    }

    pub fn len(&self) -> usize {
        (self.0 & ALL_BITS).count_ones() as usize
    }

    /// The set the scheduler actually consults: empty means every day.
    pub fn effective(&self) -> Self {
        if self.is_empty() {
            Self::every_day()
        } else {
            Self(self.0 & ALL_BITS)
        }
    }

    /// Days in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ORDER.iter().copied().filter(move |d| self.contains(*d))
    }
}

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

impl FromIterator<Weekday> for DaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for DaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 & ALL_BITS {
            0 => Ok(()),
            ALL_BITS => f.write_str("every"),
            WEEKDAY_BITS => f.write_str("weekdays"),
            WEEKEND_BITS => f.write_str("weekends"),
            _ => {
                let names: Vec<String> = self
                    .iter()
                    .map(|d| d.to_string().to_lowercase())
                    .collect();
                f.write_str(&names.join(","))
            }
        }
    }
}

impl FromStr for DaySet {
    type Err = ValidationError;

    /// Accepts `every`, `weekdays`, `weekends`, or a comma list such as
    /// `mon,wed,fri`. Blank input yields the empty set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "every" | "daily" | "all" => set.0 |= ALL_BITS,
                "weekdays" => set.0 |= WEEKDAY_BITS,
                "weekends" => set.0 |= WEEKEND_BITS,
                other => {
                    let day = other
                        .parse::<Weekday>()
                        .map_err(|_| ValidationError::UnknownWeekday(part.to_string()))?;
                    set.insert(day);
                }
            }
        }
        Ok(set)
    }
}

impl TryFrom<String> for DaySet {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DaySet> for String {
    fn from(value: DaySet) -> Self {
        value.to_string()
    }
}

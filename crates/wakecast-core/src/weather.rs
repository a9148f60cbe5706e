//! Weather categories and the last-known weather snapshot.
//!
//! The forecast source and its area resolution live outside this crate; the
//! core only sees a coarse category that is either present or absent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Coarse weather classification used to pick an alert sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCategory {
    Clear,
    Cloudy,
    Rain,
    Snow,
}

impl WeatherCategory {
    pub const ALL: [WeatherCategory; 4] = [
        WeatherCategory::Clear,
        WeatherCategory::Cloudy,
        WeatherCategory::Rain,
        WeatherCategory::Snow,
    ];

    /// Map a WMO weather interpretation code to a category.
    ///
    /// Drizzle, freezing rain and thunderstorms count as rain; fog counts as
    /// cloudy. Unknown codes yield `None`.
    pub fn from_wmo_code(code: u16) -> Option<Self> {
        match code {
            0 | 1 => Some(Self::Clear),
            2 | 3 | 45 | 48 => Some(Self::Cloudy),
            51..=67 | 80..=82 | 95..=99 => Some(Self::Rain),
            71..=77 | 85 | 86 => Some(Self::Snow),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Rain => "rain",
            Self::Snow => "snow",
        }
    }
}

impl fmt::Display for WeatherCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" | "sunny" => Ok(Self::Clear),
            "cloudy" | "clouds" => Ok(Self::Cloudy),
            "rain" | "rainy" => Ok(Self::Rain),
            "snow" | "snowy" => Ok(Self::Snow),
            _ => Err(ValidationError::UnknownWeatherCategory(s.to_string())),
        }
    }
}

/// Source of the most recently cached weather category.
///
/// Consulted only at fire time by the caller, never by the scheduler.
pub trait WeatherSnapshot {
    fn current(&self) -> Option<WeatherCategory>;
}

impl<T: WeatherSnapshot + ?Sized> WeatherSnapshot for &T {
    fn current(&self) -> Option<WeatherCategory> {
        (**self).current()
    }
}

impl WeatherSnapshot for Option<WeatherCategory> {
    fn current(&self) -> Option<WeatherCategory> {
        *self
    }
}

/// A cached category plus the time it was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedWeather {
    pub category: WeatherCategory,
    pub fetched_at: DateTime<Utc>,
}

impl CachedWeather {
    pub fn new(category: WeatherCategory, fetched_at: DateTime<Utc>) -> Self {
        Self {
            category,
            fetched_at,
        }
    }

    /// Category if the cache is no older than `max_age` at `now`.
    pub fn fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> Option<WeatherCategory> {
        if now - self.fetched_at <= max_age {
            Some(self.category)
        } else {
            None
        }
    }

    /// View of this cache that reports nothing once it is older than `max_age`.
    pub fn snapshot(&self, max_age: Duration) -> FreshWeather {
        FreshWeather {
            cached: Some(*self),
            max_age,
        }
    }
}

/// Staleness-aware [`WeatherSnapshot`] over an optional cache entry.
#[derive(Debug, Clone, Copy)]
pub struct FreshWeather {
    cached: Option<CachedWeather>,
    max_age: Duration,
}

impl FreshWeather {
    pub fn new(cached: Option<CachedWeather>, max_age: Duration) -> Self {
        Self { cached, max_age }
    }
}

impl WeatherSnapshot for FreshWeather {
    fn current(&self) -> Option<WeatherCategory> {
        self.cached
            .and_then(|c| c.fresh_at(Utc::now(), self.max_age))
    }
}

//! # Wakecast Core Library
//!
//! Scheduling core for a holiday- and weather-aware alarm clock. Alarms recur
//! on weekdays, react to public holidays (skip, delay, or ring as usual),
//! pick their sound from the latest weather category, and can be deferred
//! once without disturbing later occurrences.
//!
//! ## Architecture
//!
//! - **Recurrence**: a pure next-occurrence calculator over an alarm, a single
//!   "now", and a holiday calendar
//! - **Skip overrides**: one shared resolver applied identically by the arm
//!   path and the read-only next-alarm query
//! - **Engine**: arms delivery and the forecast prefetch through collaborator
//!   traits, with per-alarm mutual exclusion
//! - **Storage**: SQLite persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`RecurrenceCalculator`]: next occurrence ignoring overrides
//! - [`ScheduleEngine`]: `arm_next` / `cancel` / `on_fired`
//! - [`NextAlarmQuery`]: side-effect-free "what fires next"
//! - [`select_sound`] / [`should_ring`]: fire-time decisions

pub mod alarm;
pub mod clock;
pub mod engine;
pub mod error;
pub mod holiday;
pub mod query;
pub mod recurrence;
pub mod skip;
pub mod sound;
pub mod storage;
pub mod weather;

pub use alarm::{
    parse_time_of_day, AlarmDefinition, AlarmId, DaySet, HolidayPolicy, RepeatType,
    ScheduledOccurrence, SoundRef, VolumeMode,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{prefetch_instant, AlarmDelivery, AlarmState, ForecastRefresh, ScheduleEngine};
pub use error::{ConfigError, CoreError, DatabaseError, ScheduleError, ValidationError};
pub use holiday::{HolidayCalendar, HolidayOracle, HolidayRecord};
pub use query::{NextAlarm, NextAlarmQuery};
pub use recurrence::{RecurrenceCalculator, ScheduleSettings};
pub use skip::{InMemorySkipStore, SkipOutcome, SkipOverrideStore, SkipResolution, SkipState};
pub use sound::{decide_playback, select_sound, should_ring, Playback};
pub use storage::{Config, Database};
pub use weather::{CachedWeather, FreshWeather, WeatherCategory, WeatherSnapshot};

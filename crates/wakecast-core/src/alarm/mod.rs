//! Alarm definitions and the occurrences derived from them.
//!
//! An [`AlarmDefinition`] is the user-authored recurring alarm. The scheduler
//! never mutates it; it only derives [`ScheduledOccurrence`] values from it.

mod days;

pub use days::DaySet;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::weather::WeatherCategory;

/// Stable alarm identifier, assigned at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(pub i64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do when the computed occurrence lands on a holiday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayPolicy {
    /// Never fire on a holiday; move to the next qualifying non-holiday.
    Skip,
    /// Fire later on a holiday by the configured delay.
    Delay,
    /// Fire as normal.
    #[default]
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    #[default]
    Weekly,
    /// Disables itself after firing once.
    OneShot,
}

/// Playback volume behavior. Opaque to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeMode {
    /// Follow the device alarm stream volume.
    #[default]
    System,
    /// Use `volume_percent` as-is.
    Fixed,
    /// Ramp up to `volume_percent`.
    Gradual,
}

/// Reference to a playable sound (URI or builtin name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundRef(pub String);

impl SoundRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SoundRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_volume() -> u8 {
    80
}

fn default_prefetch_lead() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

/// A user-authored recurring alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDefinition {
    pub id: AlarmId,
    #[serde(default)]
    pub name: String,
    /// Local wall-clock time of day, no timezone.
    pub fire_time: NaiveTime,
    /// Empty means every day.
    #[serde(default)]
    pub days: DaySet,
    #[serde(default)]
    pub holiday_policy: HolidayPolicy,
    /// Fire only on holidays; `days` is ignored.
    #[serde(default)]
    pub holiday_only: bool,
    #[serde(default)]
    pub repeat_type: RepeatType,
    #[serde(default)]
    pub sound_mapping: BTreeMap<WeatherCategory, SoundRef>,
    #[serde(default)]
    pub default_sound: Option<SoundRef>,
    #[serde(default)]
    pub volume_mode: VolumeMode,
    #[serde(default = "default_volume")]
    pub volume_percent: u8,
    #[serde(default = "default_true")]
    pub vibrate: bool,
    #[serde(default = "default_true")]
    pub respect_silent_mode: bool,
    #[serde(default = "default_prefetch_lead")]
    pub prefetch_lead_minutes: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl AlarmDefinition {
    /// A weekly, every-day, enabled alarm with default playback policy.
    pub fn new(id: AlarmId, name: impl Into<String>, fire_time: NaiveTime) -> Self {
        Self {
            id,
            name: name.into(),
            fire_time,
            days: DaySet::empty(),
            holiday_policy: HolidayPolicy::default(),
            holiday_only: false,
            repeat_type: RepeatType::default(),
            sound_mapping: BTreeMap::new(),
            default_sound: None,
            volume_mode: VolumeMode::default(),
            volume_percent: default_volume(),
            vibrate: true,
            respect_silent_mode: true,
            prefetch_lead_minutes: default_prefetch_lead(),
            enabled: true,
        }
    }

    pub fn with_days(mut self, days: DaySet) -> Self {
        self.days = days;
        self
    }

    pub fn with_policy(mut self, policy: HolidayPolicy) -> Self {
        self.holiday_policy = policy;
        self
    }

    pub fn holiday_only(mut self, holiday_only: bool) -> Self {
        self.holiday_only = holiday_only;
        self
    }

    pub fn with_repeat(mut self, repeat: RepeatType) -> Self {
        self.repeat_type = repeat;
        self
    }

    pub fn with_sound(mut self, category: WeatherCategory, sound: SoundRef) -> Self {
        self.sound_mapping.insert(category, sound);
        self
    }

    pub fn with_default_sound(mut self, sound: SoundRef) -> Self {
        self.default_sound = Some(sound);
        self
    }

    pub fn with_prefetch_lead(mut self, minutes: u32) -> Self {
        self.prefetch_lead_minutes = minutes;
        self
    }

    /// Day set the scheduler consults (empty normalized to every day).
    pub fn effective_days(&self) -> DaySet {
        self.days.effective()
    }

    /// Volume clamped into 0..=100.
    pub fn effective_volume(&self) -> u8 {
        self.volume_percent.min(100)
    }
}

/// One concrete firing instant derived from an [`AlarmDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledOccurrence {
    pub alarm_id: AlarmId,
    /// Local wall-clock instant at which the alarm fires.
    pub fire_at: NaiveDateTime,
    pub is_holiday: bool,
    /// Nominal displayed time; differs from `fire_time` when delayed.
    pub effective_fire_time: NaiveTime,
}

impl ScheduledOccurrence {
    pub(crate) fn at(alarm_id: AlarmId, fire_at: NaiveDateTime, is_holiday: bool) -> Self {
        Self {
            alarm_id,
            fire_at,
            is_holiday,
            effective_fire_time: fire_at.time(),
        }
    }
}

/// Parse `HH:MM` (or `HH:MM:SS`) into a time of day.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = text.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTimeOfDay(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_time_of_day_accepts_hh_mm() {
        let t = parse_time_of_day("07:05").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(7, 5, 0).unwrap());
        assert!(parse_time_of_day(" 23:59:30 ").is_ok());
    }

    #[test]
    fn parse_time_of_day_rejects_garbage() {
        assert!(matches!(
            parse_time_of_day("25:00"),
            Err(ValidationError::InvalidTimeOfDay(_))
        ));
        assert!(parse_time_of_day("seven").is_err());
    }

    #[test]
    fn new_definition_defaults_to_every_day() {
        let def = AlarmDefinition::new(
            AlarmId(1),
            "Wake",
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        );
        assert!(def.days.is_empty());
        assert_eq!(def.effective_days(), DaySet::every_day());
        assert_eq!(def.holiday_policy, HolidayPolicy::Same);
        assert!(def.enabled);
    }

    #[test]
    fn effective_volume_is_clamped() {
        let mut def = AlarmDefinition::new(
            AlarmId(1),
            "",
            NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
        );
        def.volume_percent = 250;
        assert_eq!(def.effective_volume(), 100);
    }

    #[test]
    fn definition_deserializes_with_defaults() {
        let json = r#"{"id": 3, "fire_time": "06:45:00", "holiday_policy": "delay"}"#;
        let def: AlarmDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.id, AlarmId(3));
        assert_eq!(def.holiday_policy, HolidayPolicy::Delay);
        assert_eq!(def.volume_percent, 80);
        assert_eq!(def.prefetch_lead_minutes, 30);
        assert!(def.enabled);
        assert!(def.sound_mapping.is_empty());
    }
}

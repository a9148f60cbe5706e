//! Fire-time sound selection.
//!
//! Priority is strictly weather-specific sound, then the alarm's configured
//! default, then the platform fallback supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmDefinition, HolidayPolicy, SoundRef, VolumeMode};
use crate::weather::{WeatherCategory, WeatherSnapshot};

/// Whether an occurrence should ring at all.
///
/// False only for a holiday occurrence under the SKIP policy. The calculator
/// already routes SKIP away from holidays, so this is a second check at fire
/// time.
pub fn should_ring(def: &AlarmDefinition, is_holiday: bool) -> bool {
    !(is_holiday && def.holiday_policy == HolidayPolicy::Skip)
}

pub fn select_sound(
    def: &AlarmDefinition,
    weather: Option<WeatherCategory>,
    platform_default: &SoundRef,
) -> SoundRef {
    weather
        .and_then(|category| def.sound_mapping.get(&category))
        .or(def.default_sound.as_ref())
        .unwrap_or(platform_default)
        .clone()
}

/// Everything the playback layer needs once an alarm fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playback {
    pub sound: SoundRef,
    pub weather: Option<WeatherCategory>,
    pub volume_mode: VolumeMode,
    /// Always within 0..=100.
    pub volume_percent: u8,
    pub vibrate: bool,
    pub respect_silent_mode: bool,
}

/// Decide what to play when `def` fires, or `None` if it should stay silent.
pub fn decide_playback(
    def: &AlarmDefinition,
    is_holiday: bool,
    weather: &dyn WeatherSnapshot,
    platform_default: &SoundRef,
) -> Option<Playback> {
    if !should_ring(def, is_holiday) {
        return None;
    }
    let category = weather.current();
    Some(Playback {
        sound: select_sound(def, category, platform_default),
        weather: category,
        volume_mode: def.volume_mode,
        volume_percent: def.effective_volume(),
        vibrate: def.vibrate,
        respect_silent_mode: def.respect_silent_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmId;
    use chrono::NaiveTime;

    fn def() -> AlarmDefinition {
        AlarmDefinition::new(AlarmId(1), "", NaiveTime::from_hms_opt(7, 0, 0).unwrap())
    }

    fn platform() -> SoundRef {
        SoundRef::new("builtin:alarm")
    }

    #[test]
    fn only_skip_on_holiday_is_silent() {
        let skip = def().with_policy(HolidayPolicy::Skip);
        assert!(!should_ring(&skip, true));
        assert!(should_ring(&skip, false));
        assert!(should_ring(&def().with_policy(HolidayPolicy::Delay), true));
        assert!(should_ring(&def().with_policy(HolidayPolicy::Same), true));
    }

    #[test]
    fn weather_entry_beats_default() {
        let d = def()
            .with_sound(WeatherCategory::Rain, SoundRef::new("rain.ogg"))
            .with_default_sound(SoundRef::new("default.ogg"));
        assert_eq!(select_sound(&d, Some(WeatherCategory::Rain), &platform()).as_str(), "rain.ogg");
        assert_eq!(select_sound(&d, Some(WeatherCategory::Snow), &platform()).as_str(), "default.ogg");
        assert_eq!(select_sound(&d, None, &platform()).as_str(), "default.ogg");
    }

    #[test]
    fn platform_fallback_when_nothing_configured() {
        let d = def().with_sound(WeatherCategory::Clear, SoundRef::new("birds.ogg"));
        assert_eq!(select_sound(&d, Some(WeatherCategory::Cloudy), &platform()), platform());
        assert_eq!(select_sound(&d, None, &platform()), platform());
    }

    #[test]
    fn playback_carries_policy_and_clamps_volume() {
        let mut d = def().with_sound(WeatherCategory::Snow, SoundRef::new("snow.ogg"));
        d.volume_percent = 130;
        d.vibrate = false;
        let playback = decide_playback(&d, false, &Some(WeatherCategory::Snow), &platform()).unwrap();
        assert_eq!(playback.sound.as_str(), "snow.ogg");
        assert_eq!(playback.weather, Some(WeatherCategory::Snow));
        assert_eq!(playback.volume_percent, 100);
        assert!(!playback.vibrate);
    }

    #[test]
    fn playback_is_silent_for_skipped_holiday() {
        let d = def().with_policy(HolidayPolicy::Skip);
        assert_eq!(decide_playback(&d, true, &None::<WeatherCategory>, &platform()), None);
    }
}

//! Next-occurrence computation for recurring alarms.
//!
//! [`RecurrenceCalculator::next_occurrence`] is a pure function of the alarm
//! definition, a single reference instant, the holiday calendar and the
//! explicit [`ScheduleSettings`]. It ignores skip overrides; see
//! [`crate::skip`] for those.
//!
//! ## Search horizons
//!
//! Every forward scan is bounded so corrupt day sets or calendars cannot loop
//! forever. Running out of horizon is not an error: the alarm degrades to
//! tomorrow at its nominal time.
//!
//! | scan                         | horizon |
//! |------------------------------|---------|
//! | base weekday match           | 8 days  |
//! | SKIP policy, next non-holiday| 31 days |
//! | holiday-only alarms          | 370 days|

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::alarm::{AlarmDefinition, HolidayPolicy, ScheduledOccurrence};
use crate::error::ScheduleError;
use crate::holiday::HolidayOracle;

/// Today plus one full week.
pub const WEEK_SCAN_DAYS: u64 = 8;
/// Horizon for finding a non-holiday date under the SKIP policy.
pub const SKIP_SCAN_DAYS: u64 = 31;
/// Horizon for holiday-only alarms.
pub const HOLIDAY_SCAN_DAYS: u64 = 370;

/// Global scheduling inputs owned by configuration, not by the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Minutes added to an occurrence under the DELAY policy.
    pub holiday_delay_minutes: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            holiday_delay_minutes: 60,
        }
    }
}

/// Computes the next concrete occurrence of an alarm definition.
pub struct RecurrenceCalculator<'a> {
    holidays: &'a dyn HolidayOracle,
    settings: ScheduleSettings,
}

impl<'a> RecurrenceCalculator<'a> {
    pub fn new(holidays: &'a dyn HolidayOracle, settings: ScheduleSettings) -> Self {
        Self { holidays, settings }
    }

    pub fn settings(&self) -> ScheduleSettings {
        self.settings
    }

    /// Next occurrence strictly after `now`, ignoring skip overrides.
    ///
    /// # Errors
    /// Only holiday lookup failures are returned; horizon exhaustion falls
    /// back to tomorrow at `fire_time`.
    pub fn next_occurrence(
        &self,
        def: &AlarmDefinition,
        now: NaiveDateTime,
    ) -> Result<ScheduledOccurrence, ScheduleError> {
        if def.holiday_only {
            self.next_holiday_only(def, now)
        } else {
            self.next_recurring(def, now)
        }
    }

    /// Whether the occurrence firing at `fire_at` falls on a holiday.
    ///
    /// A DELAY shift is undone first, so an occurrence pushed past midnight
    /// is judged by its nominal date.
    pub fn is_holiday_at(
        &self,
        def: &AlarmDefinition,
        fire_at: NaiveDateTime,
    ) -> Result<bool, ScheduleError> {
        let nominal = if def.holiday_policy == HolidayPolicy::Delay && fire_at.time() != def.fire_time
        {
            let delay = Duration::minutes(i64::from(self.settings.holiday_delay_minutes));
            fire_at.checked_sub_signed(delay).unwrap_or(fire_at)
        } else {
            fire_at
        };
        self.holidays.is_holiday(nominal.date())
    }

    fn next_holiday_only(
        &self,
        def: &AlarmDefinition,
        now: NaiveDateTime,
    ) -> Result<ScheduledOccurrence, ScheduleError> {
        for offset in 0..HOLIDAY_SCAN_DAYS {
            let Some(date) = now.date().checked_add_days(Days::new(offset)) else {
                break;
            };
            let candidate = date.and_time(def.fire_time);
            if candidate <= now || !self.holidays.is_holiday(date)? {
                continue;
            }
            debug!(alarm_id = %def.id, %date, "holiday-only alarm matched holiday");
            let fire_at = match def.holiday_policy {
                HolidayPolicy::Delay => self.delayed(candidate),
                HolidayPolicy::Skip | HolidayPolicy::Same => candidate,
            };
            return Ok(ScheduledOccurrence::at(def.id, fire_at, true));
        }

        warn!(
            alarm_id = %def.id,
            horizon_days = HOLIDAY_SCAN_DAYS,
            "no holiday within horizon, falling back to tomorrow"
        );
        Ok(self.fallback(def, now))
    }

    fn next_recurring(
        &self,
        def: &AlarmDefinition,
        now: NaiveDateTime,
    ) -> Result<ScheduledOccurrence, ScheduleError> {
        let Some(base) = self.scan(def, now, WEEK_SCAN_DAYS, |_| Ok(true))? else {
            warn!(alarm_id = %def.id, "no weekday match within a week, falling back to tomorrow");
            return Ok(self.fallback(def, now));
        };

        let base_is_holiday = self.holidays.is_holiday(base.date())?;
        if !base_is_holiday {
            return Ok(ScheduledOccurrence::at(def.id, base, false));
        }

        match def.holiday_policy {
            HolidayPolicy::Skip => {
                debug!(alarm_id = %def.id, date = %base.date(), "skipping holiday");
                let next = self.scan(def, now, SKIP_SCAN_DAYS, |date| {
                    Ok(!self.holidays.is_holiday(date)?)
                })?;
                match next {
                    Some(fire_at) => Ok(ScheduledOccurrence::at(def.id, fire_at, false)),
                    None => {
                        warn!(
                            alarm_id = %def.id,
                            horizon_days = SKIP_SCAN_DAYS,
                            "no non-holiday within horizon, falling back to tomorrow"
                        );
                        Ok(self.fallback(def, now))
                    }
                }
            }
            HolidayPolicy::Delay => {
                debug!(
                    alarm_id = %def.id,
                    date = %base.date(),
                    delay_minutes = self.settings.holiday_delay_minutes,
                    "delaying holiday occurrence"
                );
                Ok(ScheduledOccurrence::at(def.id, self.delayed(base), true))
            }
            HolidayPolicy::Same => Ok(ScheduledOccurrence::at(def.id, base, true)),
        }
    }

    /// Earliest `date + fire_time` within `horizon` days of `now` that is
    /// strictly after `now`, falls on one of the alarm's days and satisfies
    /// `accept`.
    fn scan<F>(
        &self,
        def: &AlarmDefinition,
        now: NaiveDateTime,
        horizon: u64,
        mut accept: F,
    ) -> Result<Option<NaiveDateTime>, ScheduleError>
    where
        F: FnMut(NaiveDate) -> Result<bool, ScheduleError>,
    {
        let days = def.effective_days();
        for offset in 0..horizon {
            let Some(date) = now.date().checked_add_days(Days::new(offset)) else {
                break;
            };
            if !days.contains(date.weekday()) {
                continue;
            }
            let candidate = date.and_time(def.fire_time);
            if candidate <= now {
                continue;
            }
            if accept(date)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    fn delayed(&self, at: NaiveDateTime) -> NaiveDateTime {
        let delay = Duration::minutes(i64::from(self.settings.holiday_delay_minutes));
        at.checked_add_signed(delay).unwrap_or(at)
    }

    /// Tomorrow at the nominal time.
    ///
    /// This can land on a holiday; the outcome under calendar-data failure
    /// is intentionally left as-is.
    fn fallback(&self, def: &AlarmDefinition, now: NaiveDateTime) -> ScheduledOccurrence {
        let date = now
            .date()
            .checked_add_days(Days::new(1))
            .unwrap_or(now.date());
        ScheduledOccurrence::at(def.id, date.and_time(def.fire_time), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmId, DaySet};
    use crate::holiday::HolidayCalendar;
    use chrono::{NaiveTime, Weekday};

    // 2026-03-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_hms_opt(h, m, 0).unwrap()
    }

    fn seven() -> NaiveTime {
        NaiveTime::from_hms_opt(7, 0, 0).unwrap()
    }

    fn monday_alarm(policy: HolidayPolicy) -> AlarmDefinition {
        AlarmDefinition::new(AlarmId(1), "Work", seven())
            .with_days(DaySet::only(Weekday::Mon))
            .with_policy(policy)
    }

    struct FailingOracle;

    impl HolidayOracle for FailingOracle {
        fn is_holiday(&self, date: NaiveDate) -> Result<bool, ScheduleError> {
            Err(ScheduleError::Holiday {
                date,
                message: "calendar unavailable".into(),
            })
        }

        fn name_of(&self, _date: NaiveDate) -> Result<Option<String>, ScheduleError> {
            Ok(None)
        }
    }

    #[test]
    fn today_is_used_when_time_not_passed() {
        let cal = HolidayCalendar::new();
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = AlarmDefinition::new(AlarmId(1), "", seven());
        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday(), 7, 0));
        assert!(!occ.is_holiday);
        assert_eq!(occ.effective_fire_time, seven());
    }

    #[test]
    fn exact_fire_time_counts_as_passed() {
        let cal = HolidayCalendar::new();
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = AlarmDefinition::new(AlarmId(1), "", seven());
        let occ = calc.next_occurrence(&def, at(monday(), 7, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(1), 7, 0));
    }

    #[test]
    fn passed_weekday_rolls_to_next_week() {
        let cal = HolidayCalendar::new();
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = monday_alarm(HolidayPolicy::Same);
        let occ = calc.next_occurrence(&def, at(monday(), 8, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(7), 7, 0));
    }

    #[test]
    fn skip_moves_past_holiday_chain() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        cal.insert(monday() + Days::new(7), "B");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = monday_alarm(HolidayPolicy::Skip);
        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(14), 7, 0));
        assert!(!occ.is_holiday);
    }

    #[test]
    fn skip_with_everyday_alarm_takes_next_day() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = AlarmDefinition::new(AlarmId(1), "", seven()).with_policy(HolidayPolicy::Skip);
        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(1), 7, 0));
    }

    #[test]
    fn skip_horizon_exhaustion_falls_back_to_tomorrow() {
        let mut cal = HolidayCalendar::new();
        for offset in 0..40 {
            cal.insert(monday() + Days::new(offset), "Long festival");
        }
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = monday_alarm(HolidayPolicy::Skip);
        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(1), 7, 0));
        assert!(!occ.is_holiday);
    }

    #[test]
    fn delay_uses_configured_minutes() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        let calc = RecurrenceCalculator::new(
            &cal,
            ScheduleSettings {
                holiday_delay_minutes: 90,
            },
        );
        let occ = calc
            .next_occurrence(&monday_alarm(HolidayPolicy::Delay), at(monday(), 6, 0))
            .unwrap();
        assert_eq!(occ.fire_at, at(monday(), 8, 30));
        assert_eq!(occ.effective_fire_time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert!(occ.is_holiday);
    }

    #[test]
    fn delay_is_computed_from_the_nominal_time_even_if_now_is_between() {
        // Nominal 07:00 has passed, so today's delayed 08:00 is not eligible.
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let occ = calc
            .next_occurrence(&monday_alarm(HolidayPolicy::Delay), at(monday(), 7, 30))
            .unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(7), 7, 0));
        assert!(!occ.is_holiday);
    }

    #[test]
    fn delayed_past_midnight_is_judged_by_nominal_date() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = AlarmDefinition::new(AlarmId(1), "", NaiveTime::from_hms_opt(23, 30, 0).unwrap())
            .with_days(DaySet::only(Weekday::Mon))
            .with_policy(HolidayPolicy::Delay);

        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(1), 0, 30));
        assert!(calc.is_holiday_at(&def, occ.fire_at).unwrap());
        assert!(!cal.is_holiday(occ.fire_at.date()).unwrap());
    }

    #[test]
    fn undelayed_occurrence_is_judged_by_its_own_date() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = monday_alarm(HolidayPolicy::Same);
        assert!(calc.is_holiday_at(&def, at(monday(), 7, 0)).unwrap());
        assert!(!calc
            .is_holiday_at(&def, at(monday() + Days::new(7), 7, 0))
            .unwrap());
    }

    #[test]
    fn same_policy_flags_holiday_without_shift() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "A");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let occ = calc
            .next_occurrence(&monday_alarm(HolidayPolicy::Same), at(monday(), 6, 0))
            .unwrap();
        assert_eq!(occ.fire_at, at(monday(), 7, 0));
        assert!(occ.is_holiday);
    }

    #[test]
    fn holiday_only_ignores_weekdays() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday() + Days::new(3), "Thursday holiday");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = monday_alarm(HolidayPolicy::Same).holiday_only(true);
        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(3), 7, 0));
        assert!(occ.is_holiday);
    }

    #[test]
    fn holiday_only_skips_todays_passed_holiday() {
        let mut cal = HolidayCalendar::new();
        cal.insert(monday(), "Today");
        cal.insert(monday() + Days::new(20), "Later");
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = AlarmDefinition::new(AlarmId(4), "", seven()).holiday_only(true);
        let occ = calc.next_occurrence(&def, at(monday(), 9, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(20), 7, 0));
    }

    #[test]
    fn holiday_only_without_holidays_falls_back_to_tomorrow() {
        let cal = HolidayCalendar::new();
        let calc = RecurrenceCalculator::new(&cal, ScheduleSettings::default());
        let def = AlarmDefinition::new(AlarmId(4), "", seven()).holiday_only(true);
        let occ = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap();
        assert_eq!(occ.fire_at, at(monday() + Days::new(1), 7, 0));
        assert!(!occ.is_holiday);
    }

    #[test]
    fn oracle_failure_propagates() {
        let calc = RecurrenceCalculator::new(&FailingOracle, ScheduleSettings::default());
        let def = monday_alarm(HolidayPolicy::Skip);
        let err = calc.next_occurrence(&def, at(monday(), 6, 0)).unwrap_err();
        assert!(matches!(err, ScheduleError::Holiday { .. }));
    }
}

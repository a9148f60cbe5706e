//! Read-only "what fires next" query for display surfaces.
//!
//! Runs the exact recurrence + skip resolution the arm path runs, but never
//! writes: pending overrides are read, not cleared, even when they trigger a
//! recomputation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmDefinition, ScheduledOccurrence};
use crate::error::ScheduleError;
use crate::holiday::HolidayOracle;
use crate::recurrence::{RecurrenceCalculator, ScheduleSettings};
use crate::skip::{self, SkipOverrideStore};

/// The earliest upcoming alarm across a set of definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAlarm {
    pub occurrence: ScheduledOccurrence,
    pub alarm_name: String,
    /// Holiday name for the occurrence date when it falls on one.
    pub holiday_name: Option<String>,
}

pub struct NextAlarmQuery<'a> {
    holidays: &'a dyn HolidayOracle,
    skips: &'a dyn SkipOverrideStore,
    settings: ScheduleSettings,
}

impl<'a> NextAlarmQuery<'a> {
    pub fn new(
        holidays: &'a dyn HolidayOracle,
        skips: &'a dyn SkipOverrideStore,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            holidays,
            skips,
            settings,
        }
    }

    /// Next occurrence of a single definition, skip override applied.
    pub fn occurrence_of(
        &self,
        def: &AlarmDefinition,
        now: NaiveDateTime,
    ) -> Result<ScheduledOccurrence, ScheduleError> {
        let calc = RecurrenceCalculator::new(self.holidays, self.settings);
        let state = self.skips.get(def.id)?;
        Ok(skip::resolve(&calc, def, now, state)?.occurrence)
    }

    /// Upcoming occurrences of every enabled definition, earliest first.
    ///
    /// Equal instants are ordered by alarm id.
    pub fn upcoming(
        &self,
        defs: &[AlarmDefinition],
        now: NaiveDateTime,
    ) -> Result<Vec<ScheduledOccurrence>, ScheduleError> {
        let mut occurrences = defs
            .iter()
            .filter(|def| def.enabled)
            .map(|def| self.occurrence_of(def, now))
            .collect::<Result<Vec<_>, _>>()?;
        occurrences.sort_by_key(|occ| (occ.fire_at, occ.alarm_id));
        Ok(occurrences)
    }

    /// The globally earliest enabled alarm, or `None` if there is none.
    pub fn find_next(
        &self,
        defs: &[AlarmDefinition],
        now: NaiveDateTime,
    ) -> Result<Option<NextAlarm>, ScheduleError> {
        let Some(occurrence) = self.upcoming(defs, now)?.into_iter().next() else {
            return Ok(None);
        };

        let alarm_name = defs
            .iter()
            .find(|def| def.id == occurrence.alarm_id)
            .map(|def| def.name.clone())
            .unwrap_or_default();
        let holiday_name = if occurrence.is_holiday {
            self.holidays.name_of(occurrence.fire_at.date())?
        } else {
            None
        };

        Ok(Some(NextAlarm {
            occurrence,
            alarm_name,
            holiday_name,
        }))
    }
}

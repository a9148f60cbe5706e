//! Authoritative arm/cancel orchestration.
//!
//! [`ScheduleEngine`] is invoked after an alarm fires and whenever a
//! definition is created, edited or enabled. It resolves the next occurrence
//! through the shared recurrence + skip path, registers the delivery and the
//! forecast prefetch with the external collaborators, and tracks a small
//! per-alarm state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Unarmed -> Armed -> Fired -> Armed      (weekly)
//!                          -> Unarmed    (one-shot)
//! Armed -> Unarmed                        (cancel / disable)
//! ```
//!
//! Operations on the same alarm id are serialized by a per-id lock; distinct
//! ids proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::alarm::{AlarmDefinition, AlarmId, RepeatType, ScheduledOccurrence};
use crate::clock::{Clock, SystemClock};
use crate::error::ScheduleError;
use crate::holiday::HolidayOracle;
use crate::query::NextAlarmQuery;
use crate::recurrence::{RecurrenceCalculator, ScheduleSettings};
use crate::skip::{self, SkipOutcome, SkipOverrideStore};

/// Exact-time alarm delivery.
pub trait AlarmDelivery: Send + Sync {
    /// Register (or replace) the delivery for `id`.
    fn arm(
        &self,
        id: AlarmId,
        fire_at: NaiveDateTime,
        display_time: NaiveTime,
    ) -> Result<(), ScheduleError>;

    /// Remove the delivery for `id`; a no-op when nothing is armed.
    fn cancel(&self, id: AlarmId) -> Result<(), ScheduleError>;
}

/// Forecast refresh jobs, unique per alarm id.
pub trait ForecastRefresh: Send + Sync {
    /// Schedule the refresh for `id`, replacing any pending one.
    fn schedule_at(&self, id: AlarmId, at: NaiveDateTime) -> Result<(), ScheduleError>;

    fn cancel(&self, id: AlarmId) -> Result<(), ScheduleError>;
}

/// Per-alarm arm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AlarmState {
    #[default]
    Unarmed,
    Armed { fire_at: NaiveDateTime },
    Fired,
}

/// When the forecast refresh for `occurrence` should run.
///
/// `lead_minutes` before the fire instant, but never before `now`.
pub fn prefetch_instant(
    occurrence: &ScheduledOccurrence,
    lead_minutes: u32,
    now: NaiveDateTime,
) -> NaiveDateTime {
    let lead = Duration::minutes(i64::from(lead_minutes));
    occurrence
        .fire_at
        .checked_sub_signed(lead)
        .unwrap_or(now)
        .max(now)
}

pub struct ScheduleEngine {
    holidays: Arc<dyn HolidayOracle + Send + Sync>,
    skips: Arc<dyn SkipOverrideStore>,
    delivery: Arc<dyn AlarmDelivery>,
    forecast: Arc<dyn ForecastRefresh>,
    clock: Arc<dyn Clock>,
    settings: ScheduleSettings,
    states: Mutex<HashMap<AlarmId, AlarmState>>,
    locks: Mutex<HashMap<AlarmId, Arc<Mutex<()>>>>,
}

impl ScheduleEngine {
    /// Create an engine on the system clock.
    pub fn new(
        holidays: Arc<dyn HolidayOracle + Send + Sync>,
        skips: Arc<dyn SkipOverrideStore>,
        delivery: Arc<dyn AlarmDelivery>,
        forecast: Arc<dyn ForecastRefresh>,
        settings: ScheduleSettings,
    ) -> Self {
        Self {
            holidays,
            skips,
            delivery,
            forecast,
            clock: Arc::new(SystemClock),
            settings,
            states: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> ScheduleSettings {
        self.settings
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Read-only query over the same collaborators.
    pub fn query(&self) -> NextAlarmQuery<'_> {
        NextAlarmQuery::new(self.holidays.as_ref(), self.skips.as_ref(), self.settings)
    }

    /// Whether an occurrence of `def` firing at `fire_at` is a holiday one.
    pub fn holiday_status(
        &self,
        def: &AlarmDefinition,
        fire_at: NaiveDateTime,
    ) -> Result<bool, ScheduleError> {
        RecurrenceCalculator::new(self.holidays.as_ref(), self.settings).is_holiday_at(def, fire_at)
    }

    pub fn state_of(&self, id: AlarmId) -> AlarmState {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .copied()
            .unwrap_or_default()
    }

    /// Compute and arm the next occurrence of `def`.
    ///
    /// A disabled definition is cancelled instead and yields `None`.
    ///
    /// # Errors
    /// Holiday lookup, skip store and delivery failures are returned as-is.
    /// A prefetch failure after the delivery was armed leaves the alarm
    /// armed with no pending prefetch and returns [`ScheduleError::Forecast`]
    /// naming the armed instant.
    pub fn arm_next(
        &self,
        def: &AlarmDefinition,
    ) -> Result<Option<ScheduledOccurrence>, ScheduleError> {
        self.with_lock(def.id, || {
            if !def.enabled {
                self.cancel_locked(def.id)?;
                return Ok(None);
            }
            self.arm_locked(def).map(Some)
        })
    }

    /// Cancel the armed delivery and pending prefetch for `id`.
    ///
    /// Idempotent. Both cancellations have completed when this returns.
    pub fn cancel(&self, id: AlarmId) -> Result<(), ScheduleError> {
        self.with_lock(id, || self.cancel_locked(id))
    }

    /// Record that `def` fired and advance its state machine.
    ///
    /// Weekly alarms are re-armed; one-shot alarms return to `Unarmed` and
    /// yield `None`. Persisting the one-shot's disabled flag is the caller's
    /// job.
    pub fn on_fired(
        &self,
        def: &AlarmDefinition,
    ) -> Result<Option<ScheduledOccurrence>, ScheduleError> {
        self.with_lock(def.id, || {
            self.set_state(def.id, AlarmState::Fired);
            info!(alarm_id = %def.id, "alarm fired");

            if def.repeat_type == RepeatType::OneShot || !def.enabled {
                self.cancel_locked(def.id)?;
                return Ok(None);
            }
            self.arm_locked(def).map(Some)
        })
    }

    fn arm_locked(&self, def: &AlarmDefinition) -> Result<ScheduledOccurrence, ScheduleError> {
        let now = self.clock.now();
        let calc = RecurrenceCalculator::new(self.holidays.as_ref(), self.settings);
        let state = self.skips.get(def.id)?;
        let resolution = skip::resolve(&calc, def, now, state)?;

        // A stale override can never block again; drop it. An applied one is
        // kept until the skipped window has passed so the read-only query
        // keeps agreeing with what is armed.
        if let SkipOutcome::Stale { until } = resolution.outcome {
            info!(alarm_id = %def.id, %until, "clearing expired skip override");
            self.skips.clear(def.id)?;
        }

        let occurrence = resolution.occurrence;
        if let Err(e) =
            self.delivery
                .arm(def.id, occurrence.fire_at, occurrence.effective_fire_time)
        {
            warn!(alarm_id = %def.id, error = %e, "failed to arm alarm delivery");
            return Err(e);
        }
        self.set_state(
            def.id,
            AlarmState::Armed {
                fire_at: occurrence.fire_at,
            },
        );

        let prefetch_at = prefetch_instant(&occurrence, def.prefetch_lead_minutes, now);
        if let Err(e) = self.forecast.schedule_at(def.id, prefetch_at) {
            warn!(alarm_id = %def.id, error = %e, "failed to schedule forecast prefetch");
            // The pending job still points at the previous occurrence.
            if let Err(cancel_err) = self.forecast.cancel(def.id) {
                warn!(alarm_id = %def.id, error = %cancel_err, "failed to drop outdated prefetch");
            }
            return Err(ScheduleError::Forecast {
                alarm_id: def.id,
                message: format!(
                    "alarm is armed for {} without a weather refresh: {e}",
                    occurrence.fire_at.format("%Y-%m-%d %H:%M")
                ),
            });
        }

        info!(
            alarm_id = %def.id,
            fire_at = %occurrence.fire_at,
            display_time = %occurrence.effective_fire_time,
            is_holiday = occurrence.is_holiday,
            prefetch_at = %prefetch_at,
            "alarm armed"
        );
        Ok(occurrence)
    }

    fn cancel_locked(&self, id: AlarmId) -> Result<(), ScheduleError> {
        self.delivery.cancel(id)?;
        self.forecast.cancel(id)?;
        self.set_state(id, AlarmState::Unarmed);
        info!(alarm_id = %id, "alarm cancelled");
        Ok(())
    }

    fn set_state(&self, id: AlarmId, state: AlarmState) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        match state {
            AlarmState::Unarmed => {
                states.remove(&id);
            }
            other => {
                states.insert(id, other);
            }
        }
    }

    /// Run `f` holding the lock for `id`.
    ///
    /// Entries are handed out only under the map lock, so an entry whose
    /// sole owner is the map has no waiter and can be dropped.
    fn with_lock<T>(&self, id: AlarmId, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(id).or_default())
        };
        let result = {
            let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };
        drop(lock);

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks.get(&id).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            locks.remove(&id);
        }
        result
    }
}

//! Skip-once overrides.
//!
//! A user can defer the next occurrence of an alarm without touching the
//! recurrence itself. The override is a per-alarm tagged state
//! ([`SkipState`]); [`resolve`] is the single place that decides whether it
//! still blocks a candidate occurrence. Both the arm path and the read-only
//! next-alarm query go through it.
//!
//! ## Lifecycle
//!
//! ```text
//! None --set--> PendingUntil(t) --candidate after t (arm path)--> None
//!                     |
//!                     +--user clear--> None
//! ```
//!
//! While a pending override still blocks, the candidate is recomputed from
//! `t + 1s`, so one override can never push the alarm past more than the
//! occurrences that fall at or before `t`.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alarm::{AlarmDefinition, AlarmId, ScheduledOccurrence};
use crate::error::ScheduleError;
use crate::recurrence::RecurrenceCalculator;

/// Skip-once state for one alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "until", rename_all = "snake_case")]
pub enum SkipState {
    #[default]
    None,
    /// Occurrences at or before this instant are skipped.
    PendingUntil(NaiveDateTime),
}

impl SkipState {
    pub fn until(&self) -> Option<NaiveDateTime> {
        match self {
            SkipState::None => None,
            SkipState::PendingUntil(t) => Some(*t),
        }
    }
}

impl From<Option<NaiveDateTime>> for SkipState {
    fn from(value: Option<NaiveDateTime>) -> Self {
        value.map_or(SkipState::None, SkipState::PendingUntil)
    }
}

/// Keyed storage for skip overrides, at most one per alarm.
///
/// Implementations must give readers a consistent snapshot: a `get` never
/// observes a half-written override.
pub trait SkipOverrideStore: Send + Sync {
    fn get(&self, id: AlarmId) -> Result<SkipState, ScheduleError>;

    fn set(&self, id: AlarmId, until: NaiveDateTime) -> Result<(), ScheduleError>;

    /// Remove the override. Clearing an absent override is a no-op.
    fn clear(&self, id: AlarmId) -> Result<(), ScheduleError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct InMemorySkipStore {
    entries: RwLock<HashMap<AlarmId, NaiveDateTime>>,
}

impl InMemorySkipStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SkipOverrideStore for InMemorySkipStore {
    fn get(&self, id: AlarmId) -> Result<SkipState, ScheduleError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| ScheduleError::SkipStore(e.to_string()))?;
        Ok(entries.get(&id).copied().into())
    }

    fn set(&self, id: AlarmId, until: NaiveDateTime) -> Result<(), ScheduleError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ScheduleError::SkipStore(e.to_string()))?;
        entries.insert(id, until);
        Ok(())
    }

    fn clear(&self, id: AlarmId) -> Result<(), ScheduleError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| ScheduleError::SkipStore(e.to_string()))?;
        entries.remove(&id);
        Ok(())
    }
}

/// How an override affected a candidate occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// No override was pending.
    NoOverride,
    /// The candidate is already after the override; it no longer applies.
    Stale { until: NaiveDateTime },
    /// The override blocked the candidate and the occurrence was recomputed.
    Applied {
        until: NaiveDateTime,
        skipped: ScheduledOccurrence,
    },
}

/// Final occurrence after skip-override resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipResolution {
    pub occurrence: ScheduledOccurrence,
    pub outcome: SkipOutcome,
}

/// Apply `state` to `candidate`, recomputing from `until + 1s` while the
/// override still blocks.
///
/// Pure: never touches a store. Callers decide what to persist based on
/// [`SkipResolution::outcome`].
pub fn resolve_skip(
    calc: &RecurrenceCalculator<'_>,
    def: &AlarmDefinition,
    candidate: ScheduledOccurrence,
    state: SkipState,
) -> Result<SkipResolution, ScheduleError> {
    let SkipState::PendingUntil(until) = state else {
        return Ok(SkipResolution {
            occurrence: candidate,
            outcome: SkipOutcome::NoOverride,
        });
    };

    if candidate.fire_at > until {
        return Ok(SkipResolution {
            occurrence: candidate,
            outcome: SkipOutcome::Stale { until },
        });
    }

    let restart = until + Duration::seconds(1);
    let occurrence = calc.next_occurrence(def, restart)?;
    debug!(
        alarm_id = %def.id,
        skipped = %candidate.fire_at,
        next = %occurrence.fire_at,
        "skip override applied"
    );
    Ok(SkipResolution {
        occurrence,
        outcome: SkipOutcome::Applied {
            until,
            skipped: candidate,
        },
    })
}

/// Next occurrence at `now` with the override applied.
///
/// The one computation shared by the arm path and the next-alarm query.
pub fn resolve(
    calc: &RecurrenceCalculator<'_>,
    def: &AlarmDefinition,
    now: NaiveDateTime,
    state: SkipState,
) -> Result<SkipResolution, ScheduleError> {
    let candidate = calc.next_occurrence(def, now)?;
    resolve_skip(calc, def, candidate, state)
}

//! SQLite-backed persistence.
//!
//! Provides persistent storage for:
//! - Alarm definitions (JSON documents keyed by id)
//! - Skip-once overrides
//! - The imported holiday calendar
//! - The last-known weather category
//! - The delivery outbox: armed alarms and pending forecast prefetches
//!
//! [`Database`] implements [`SkipOverrideStore`], [`AlarmDelivery`] and
//! [`ForecastRefresh`] so the schedule engine can run directly against it.
//! The outbox tables hold at most one row per alarm id; re-arming replaces.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::alarm::{AlarmDefinition, AlarmId};
use crate::engine::{AlarmDelivery, ForecastRefresh};
use crate::error::{CoreError, DatabaseError, Result, ScheduleError};
use crate::holiday::HolidayCalendar;
use crate::skip::{SkipOverrideStore, SkipState};
use crate::weather::{CachedWeather, WeatherCategory};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// A registered alarm delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmedDelivery {
    pub alarm_id: AlarmId,
    pub fire_at: NaiveDateTime,
    pub display_time: NaiveTime,
}

/// A pending forecast refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchJob {
    pub alarm_id: AlarmId,
    pub run_at: NaiveDateTime,
}

/// SQLite database for alarms and scheduler state.
pub struct Database {
    conn: Mutex<Connection>,
}

fn format_datetime(at: NaiveDateTime) -> String {
    at.format(DATETIME_FORMAT).to_string()
}

fn parse_datetime(table: &'static str, raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| DatabaseError::CorruptRow {
        table,
        message: format!("bad timestamp '{raw}': {e}"),
    })
}

fn store_error(err: impl std::fmt::Display) -> ScheduleError {
    ScheduleError::SkipStore(err.to_string())
}

impl Database {
    /// Open the database at `~/.config/wakecast/wakecast.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("wakecast.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn()
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS alarms (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    definition  TEXT NOT NULL,
                    updated_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS skip_overrides (
                    alarm_id    INTEGER PRIMARY KEY,
                    skip_until  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS holidays (
                    date  TEXT PRIMARY KEY,
                    name  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS weather_cache (
                    id          INTEGER PRIMARY KEY CHECK (id = 1),
                    category    TEXT NOT NULL,
                    fetched_at  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS armed_deliveries (
                    alarm_id      INTEGER PRIMARY KEY,
                    fire_at       TEXT NOT NULL,
                    display_time  TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS prefetch_jobs (
                    alarm_id  INTEGER PRIMARY KEY,
                    run_at    TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_armed_fire_at ON armed_deliveries(fire_at);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// Insert a new alarm; the id in `def` is ignored and a fresh one assigned.
    pub fn insert_alarm(&self, def: &AlarmDefinition) -> Result<AlarmId> {
        let json = serde_json::to_string(def)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO alarms (definition, updated_at) VALUES (?1, ?2)",
            params![json, Utc::now().to_rfc3339()],
        )?;
        Ok(AlarmId(conn.last_insert_rowid()))
    }

    /// Replace a stored alarm.
    ///
    /// # Errors
    /// Returns [`CoreError::AlarmNotFound`] if no alarm has `def.id`.
    pub fn update_alarm(&self, def: &AlarmDefinition) -> Result<()> {
        let json = serde_json::to_string(def)?;
        let changed = self.conn().execute(
            "UPDATE alarms SET definition = ?1, updated_at = ?2 WHERE id = ?3",
            params![json, Utc::now().to_rfc3339(), def.id.0],
        )?;
        if changed == 0 {
            return Err(CoreError::AlarmNotFound(def.id));
        }
        Ok(())
    }

    pub fn get_alarm(&self, id: AlarmId) -> Result<Option<AlarmDefinition>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT definition FROM alarms WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|json| decode_alarm(id, &json)).transpose()
    }

    /// Like [`Database::get_alarm`] but missing alarms are an error.
    pub fn require_alarm(&self, id: AlarmId) -> Result<AlarmDefinition> {
        self.get_alarm(id)?.ok_or(CoreError::AlarmNotFound(id))
    }

    pub fn list_alarms(&self) -> Result<Vec<AlarmDefinition>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, definition FROM alarms ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut alarms = Vec::new();
        for row in rows {
            let (id, json) = row?;
            alarms.push(decode_alarm(AlarmId(id), &json)?);
        }
        Ok(alarms)
    }

    /// Delete an alarm and its skip override. Returns whether it existed.
    pub fn delete_alarm(&self, id: AlarmId) -> Result<bool> {
        let conn = self.conn();
        conn.execute("DELETE FROM skip_overrides WHERE alarm_id = ?1", params![id.0])?;
        let deleted = conn.execute("DELETE FROM alarms WHERE id = ?1", params![id.0])?;
        Ok(deleted > 0)
    }

    pub fn set_alarm_enabled(&self, id: AlarmId, enabled: bool) -> Result<AlarmDefinition> {
        let mut def = self.require_alarm(id)?;
        def.enabled = enabled;
        self.update_alarm(&def)?;
        Ok(def)
    }

    // ── Holidays ─────────────────────────────────────────────────────

    /// Merge `calendar` into the stored holidays. Returns rows written.
    pub fn import_holidays(&self, calendar: &HolidayCalendar) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO holidays (date, name) VALUES (?1, ?2)")?;
            for record in calendar.records() {
                written += stmt.execute(params![
                    record.date.format(DATE_FORMAT).to_string(),
                    record.name
                ])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn clear_holidays(&self) -> Result<()> {
        self.conn().execute("DELETE FROM holidays", [])?;
        Ok(())
    }

    /// Load the stored holidays into an in-memory calendar.
    pub fn load_holidays(&self) -> Result<HolidayCalendar> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT date, name FROM holidays ORDER BY date")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut calendar = HolidayCalendar::new();
        for row in rows {
            let (date, name) = row?;
            let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
                DatabaseError::CorruptRow {
                    table: "holidays",
                    message: format!("bad date '{date}': {e}"),
                }
            })?;
            calendar.insert(date, name);
        }
        Ok(calendar)
    }

    // ── Weather ──────────────────────────────────────────────────────

    pub fn store_weather(&self, weather: &CachedWeather) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO weather_cache (id, category, fetched_at) VALUES (1, ?1, ?2)",
            params![weather.category.as_str(), weather.fetched_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn latest_weather(&self) -> Result<Option<CachedWeather>> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT category, fetched_at FROM weather_cache WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((category, fetched_at)) = row else {
            return Ok(None);
        };
        let category: WeatherCategory = category.parse()?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map_err(|e| DatabaseError::CorruptRow {
                table: "weather_cache",
                message: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(Some(CachedWeather::new(category, fetched_at)))
    }

    // ── Outbox ───────────────────────────────────────────────────────

    pub fn armed_deliveries(&self) -> Result<Vec<ArmedDelivery>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT alarm_id, fire_at, display_time FROM armed_deliveries ORDER BY fire_at, alarm_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut armed = Vec::new();
        for row in rows {
            let (id, fire_at, display_time) = row?;
            let display_time = NaiveTime::parse_from_str(&display_time, TIME_FORMAT).map_err(
                |e| DatabaseError::CorruptRow {
                    table: "armed_deliveries",
                    message: format!("bad time '{display_time}': {e}"),
                },
            )?;
            armed.push(ArmedDelivery {
                alarm_id: AlarmId(id),
                fire_at: parse_datetime("armed_deliveries", &fire_at)?,
                display_time,
            });
        }
        Ok(armed)
    }

    pub fn prefetch_jobs(&self) -> Result<Vec<PrefetchJob>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT alarm_id, run_at FROM prefetch_jobs ORDER BY run_at, alarm_id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (id, run_at) = row?;
            jobs.push(PrefetchJob {
                alarm_id: AlarmId(id),
                run_at: parse_datetime("prefetch_jobs", &run_at)?,
            });
        }
        Ok(jobs)
    }
}

fn decode_alarm(id: AlarmId, json: &str) -> Result<AlarmDefinition> {
    let mut def: AlarmDefinition =
        serde_json::from_str(json).map_err(|e| DatabaseError::CorruptRow {
            table: "alarms",
            message: e.to_string(),
        })?;
    def.id = id;
    Ok(def)
}

impl SkipOverrideStore for Database {
    fn get(&self, id: AlarmId) -> Result<SkipState, ScheduleError> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT skip_until FROM skip_overrides WHERE alarm_id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_error)?;
        raw.map(|until| parse_datetime("skip_overrides", &until))
            .transpose()
            .map(SkipState::from)
            .map_err(store_error)
    }

    fn set(&self, id: AlarmId, until: NaiveDateTime) -> Result<(), ScheduleError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO skip_overrides (alarm_id, skip_until) VALUES (?1, ?2)",
                params![id.0, format_datetime(until)],
            )
            .map_err(store_error)?;
        Ok(())
    }

    fn clear(&self, id: AlarmId) -> Result<(), ScheduleError> {
        self.conn()
            .execute("DELETE FROM skip_overrides WHERE alarm_id = ?1", params![id.0])
            .map_err(store_error)?;
        Ok(())
    }
}

impl AlarmDelivery for Database {
    fn arm(
        &self,
        id: AlarmId,
        fire_at: NaiveDateTime,
        display_time: NaiveTime,
    ) -> Result<(), ScheduleError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO armed_deliveries (alarm_id, fire_at, display_time)
                 VALUES (?1, ?2, ?3)",
                params![
                    id.0,
                    format_datetime(fire_at),
                    display_time.format(TIME_FORMAT).to_string()
                ],
            )
            .map_err(|e| ScheduleError::Delivery {
                alarm_id: id,
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn cancel(&self, id: AlarmId) -> Result<(), ScheduleError> {
        self.conn()
            .execute("DELETE FROM armed_deliveries WHERE alarm_id = ?1", params![id.0])
            .map_err(|e| ScheduleError::Delivery {
                alarm_id: id,
                message: e.to_string(),
            })?;
        Ok(())
    }
}

impl ForecastRefresh for Database {
    fn schedule_at(&self, id: AlarmId, at: NaiveDateTime) -> Result<(), ScheduleError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO prefetch_jobs (alarm_id, run_at) VALUES (?1, ?2)",
                params![id.0, format_datetime(at)],
            )
            .map_err(|e| ScheduleError::Forecast {
                alarm_id: id,
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn cancel(&self, id: AlarmId) -> Result<(), ScheduleError> {
        self.conn()
            .execute("DELETE FROM prefetch_jobs WHERE alarm_id = ?1", params![id.0])
            .map_err(|e| ScheduleError::Forecast {
                alarm_id: id,
                message: e.to_string(),
            })?;
        Ok(())
    }
}

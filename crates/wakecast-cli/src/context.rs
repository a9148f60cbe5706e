//! Wiring shared by every command: config, database, engine.

use std::sync::Arc;

use tracing::debug;
use wakecast_core::{AlarmId, Config, CoreError, Database, ScheduleEngine};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub struct Context {
    pub config: Config,
    pub db: Arc<Database>,
}

impl Context {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);
        debug!(path = %Config::path()?.display(), "loaded config");
        Ok(Self { config, db })
    }

    /// Engine over the stored holidays, skip overrides and delivery outbox.
    pub fn engine(&self) -> Result<ScheduleEngine, CoreError> {
        let holidays = self.db.load_holidays()?;
        debug!(holidays = holidays.len(), "building schedule engine");
        Ok(ScheduleEngine::new(
            Arc::new(holidays),
            self.db.clone(),
            self.db.clone(),
            self.db.clone(),
            self.config.schedule_settings(),
        ))
    }
}

pub fn alarm_id(raw: i64) -> AlarmId {
    AlarmId(raw)
}

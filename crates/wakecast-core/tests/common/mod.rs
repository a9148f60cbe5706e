//! Shared fixtures for wakecast-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use wakecast_core::{
    Database, FixedClock, HolidayCalendar, InMemorySkipStore, ScheduleEngine, ScheduleSettings,
};

/// 2026-03-02, a Monday.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub struct Harness {
    pub engine: ScheduleEngine,
    pub db: Arc<Database>,
    pub skips: Arc<InMemorySkipStore>,
    pub clock: Arc<FixedClock>,
}

/// Engine with in-memory skip store and an in-memory SQLite outbox.
pub fn harness(calendar: HolidayCalendar, now: NaiveDateTime) -> Harness {
    let db = Arc::new(Database::open_memory().unwrap());
    let skips = Arc::new(InMemorySkipStore::new());
    let clock = Arc::new(FixedClock::new(now));
    let engine = ScheduleEngine::new(
        Arc::new(calendar),
        skips.clone(),
        db.clone(),
        db.clone(),
        ScheduleSettings::default(),
    )
    .with_clock(clock.clone());
    Harness {
        engine,
        db,
        skips,
        clock,
    }
}

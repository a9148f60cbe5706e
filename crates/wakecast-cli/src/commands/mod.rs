pub mod alarm;
pub mod config;
pub mod holiday;
pub mod schedule;
pub mod skip;
pub mod sound;
pub mod weather;

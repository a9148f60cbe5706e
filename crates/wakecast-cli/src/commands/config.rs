use clap::Subcommand;
use wakecast_core::Config;

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value, e.g. "schedule.holiday_delay_minutes"
    Get { key: String },
    /// Change one value; schedule changes re-arm every enabled alarm
    Set { key: String, value: String },
    /// Print the whole config as JSON
    List,
    /// Print the config file location
    Path,
    /// Restore defaults and re-arm every enabled alarm
    Reset,
}

/// Keys whose value changes where armed alarms land.
fn affects_schedule(key: &str) -> bool {
    key == "schedule" || key.starts_with("schedule.")
}

/// Re-arm enabled alarms under the freshly saved config.
fn rearm_enabled() -> CliResult<usize> {
    let ctx = Context::open()?;
    let engine = ctx.engine()?;
    let mut rearmed = 0;
    for def in ctx.db.list_alarms()?.iter().filter(|def| def.enabled) {
        engine.arm_next(def)?;
        rearmed += 1;
    }
    Ok(rearmed)
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown config key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            let before = config.schedule_settings();
            config.set(&key, &value)?;
            config.save()?;
            println!("{key} = {}", config.get(&key).unwrap_or(value));

            if affects_schedule(&key) && config.schedule_settings() != before {
                let rearmed = rearm_enabled()?;
                println!("re-armed {rearmed} alarm(s)");
            }
        }
        ConfigAction::List => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults");
            let rearmed = rearm_enabled()?;
            println!("re-armed {rearmed} alarm(s)");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_schedule_keys_trigger_rearm() {
        assert!(affects_schedule("schedule.holiday_delay_minutes"));
        assert!(affects_schedule("schedule"));
        assert!(!affects_schedule("weather.max_age_minutes"));
        assert!(!affects_schedule("schedules_extra"));
    }
}

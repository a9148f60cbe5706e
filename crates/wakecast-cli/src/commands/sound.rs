use wakecast_core::{decide_playback, FreshWeather, WeatherCategory, WeatherSnapshot};

use crate::context::{alarm_id, CliResult, Context};

pub fn run(id: i64, weather: Option<&str>, holiday: bool) -> CliResult {
    let ctx = Context::open()?;
    let def = ctx.db.require_alarm(alarm_id(id))?;

    let category = match weather {
        Some(raw) => Some(raw.parse::<WeatherCategory>()?),
        None => FreshWeather::new(ctx.db.latest_weather()?, ctx.config.weather_max_age()).current(),
    };

    match decide_playback(&def, holiday, &category, &ctx.config.platform_sound()) {
        Some(playback) => println!("{}", serde_json::to_string_pretty(&playback)?),
        None => println!("silent: holiday skip"),
    }
    Ok(())
}

use chrono::Utc;
use clap::Subcommand;
use wakecast_core::{CachedWeather, WeatherCategory};

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum WeatherAction {
    /// Record the latest category (clear, cloudy, rain, snow)
    Set { category: WeatherCategory },
    /// Record the latest category from a WMO weather code
    SetCode { code: u16 },
    /// Show the cached category
    Show,
}

pub fn run(action: WeatherAction) -> CliResult {
    let ctx = Context::open()?;
    match action {
        WeatherAction::Set { category } => {
            ctx.db.store_weather(&CachedWeather::new(category, Utc::now()))?;
            println!("weather: {category}");
        }
        WeatherAction::SetCode { code } => {
            let category = WeatherCategory::from_wmo_code(code)
                .ok_or_else(|| format!("unknown WMO weather code {code}"))?;
            ctx.db.store_weather(&CachedWeather::new(category, Utc::now()))?;
            println!("weather: {category}");
        }
        WeatherAction::Show => match ctx.db.latest_weather()? {
            Some(cached) => {
                let fresh = cached.fresh_at(Utc::now(), ctx.config.weather_max_age());
                println!(
                    "{} (fetched {}{})",
                    cached.category,
                    cached.fetched_at.format("%Y-%m-%d %H:%M UTC"),
                    if fresh.is_some() { "" } else { ", stale" }
                );
            }
            None => println!("no weather cached"),
        },
    }
    Ok(())
}

use wakecast_core::{decide_playback, FreshWeather, RepeatType, ScheduledOccurrence};

use crate::context::{alarm_id, CliResult, Context};

fn print_armed(occ: &ScheduledOccurrence) {
    println!(
        "armed {} for {} (shows {}{})",
        occ.alarm_id,
        occ.fire_at.format("%Y-%m-%d %H:%M"),
        occ.effective_fire_time.format("%H:%M"),
        if occ.is_holiday { ", holiday" } else { "" }
    );
}

pub fn arm(id: i64) -> CliResult {
    let ctx = Context::open()?;
    let def = ctx.db.require_alarm(alarm_id(id))?;
    match ctx.engine()?.arm_next(&def)? {
        Some(occ) => print_armed(&occ),
        None => println!("alarm {} is disabled; cancelled", def.id),
    }
    Ok(())
}

/// Ring decision for the alarm that just fired, then re-arm or retire it.
pub fn fired(id: i64) -> CliResult {
    let ctx = Context::open()?;
    let def = ctx.db.require_alarm(alarm_id(id))?;
    let engine = ctx.engine()?;
    let fired_at = ctx
        .db
        .armed_deliveries()?
        .into_iter()
        .find(|armed| armed.alarm_id == def.id)
        .map_or_else(|| engine.now(), |armed| armed.fire_at);
    let is_holiday = engine.holiday_status(&def, fired_at)?;
    let weather = FreshWeather::new(ctx.db.latest_weather()?, ctx.config.weather_max_age());

    match decide_playback(&def, is_holiday, &weather, &ctx.config.platform_sound()) {
        Some(playback) => println!("{}", serde_json::to_string_pretty(&playback)?),
        None => println!("silent: holiday skip"),
    }

    match engine.on_fired(&def)? {
        Some(occ) => print_armed(&occ),
        None => {
            if def.repeat_type == RepeatType::OneShot {
                ctx.db.set_alarm_enabled(def.id, false)?;
                println!("one-shot alarm {} retired", def.id);
            }
        }
    }
    Ok(())
}

pub fn cancel(id: i64) -> CliResult {
    let ctx = Context::open()?;
    let id = alarm_id(id);
    ctx.engine()?.cancel(id)?;
    println!("alarm {id} cancelled");
    Ok(())
}

pub fn next(json: bool, all: bool) -> CliResult {
    let ctx = Context::open()?;
    let engine = ctx.engine()?;
    let alarms = ctx.db.list_alarms()?;
    let now = engine.now();
    let query = engine.query();

    if all {
        let upcoming = query.upcoming(&alarms, now)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&upcoming)?);
        } else {
            for occ in &upcoming {
                println!(
                    "{:>4}  {}{}",
                    occ.alarm_id.0,
                    occ.fire_at.format("%a %Y-%m-%d %H:%M"),
                    if occ.is_holiday { "  (holiday)" } else { "" }
                );
            }
        }
        return Ok(());
    }

    match query.find_next(&alarms, now)? {
        Some(next) if json => println!("{}", serde_json::to_string_pretty(&next)?),
        Some(next) => {
            let label = if next.alarm_name.is_empty() {
                format!("alarm {}", next.occurrence.alarm_id)
            } else {
                next.alarm_name.clone()
            };
            print!(
                "{label}: {}",
                next.occurrence.fire_at.format("%a %Y-%m-%d %H:%M")
            );
            match next.holiday_name {
                Some(holiday) => println!(" ({holiday})"),
                None => println!(),
            }
        }
        None if json => println!("null"),
        None => println!("no alarms scheduled"),
    }
    Ok(())
}

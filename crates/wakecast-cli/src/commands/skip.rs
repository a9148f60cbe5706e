use chrono::NaiveDateTime;
use clap::Subcommand;
use wakecast_core::{SkipOverrideStore, SkipState};

use crate::context::{alarm_id, CliResult, Context};

fn parse_instant(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| format!("expected 'YYYY-MM-DD HH:MM', got '{raw}'"))
}

#[derive(Subcommand)]
pub enum SkipAction {
    /// Skip the next occurrence (or everything up to --until)
    Set {
        id: i64,
        /// Skip occurrences at or before this local time
        #[arg(long, value_parser = parse_instant)]
        until: Option<NaiveDateTime>,
    },
    /// Remove a pending skip
    Clear { id: i64 },
    /// Show the skip state
    Show { id: i64 },
}

pub fn run(action: SkipAction) -> CliResult {
    let ctx = Context::open()?;
    match action {
        SkipAction::Set { id, until } => {
            let def = ctx.db.require_alarm(alarm_id(id))?;
            let engine = ctx.engine()?;
            let until = match until {
                Some(until) => until,
                None => engine.query().occurrence_of(&def, engine.now())?.fire_at,
            };
            ctx.db.set(def.id, until)?;
            println!("skipping alarm {} through {}", def.id, until.format("%Y-%m-%d %H:%M"));
            if let Some(occ) = engine.arm_next(&def)? {
                println!("next: {}", occ.fire_at.format("%Y-%m-%d %H:%M"));
            }
        }
        SkipAction::Clear { id } => {
            let def = ctx.db.require_alarm(alarm_id(id))?;
            ctx.db.clear(def.id)?;
            println!("skip cleared for alarm {}", def.id);
            if let Some(occ) = ctx.engine()?.arm_next(&def)? {
                println!("next: {}", occ.fire_at.format("%Y-%m-%d %H:%M"));
            }
        }
        SkipAction::Show { id } => match ctx.db.get(alarm_id(id))? {
            SkipState::None => println!("no skip pending"),
            SkipState::PendingUntil(until) => {
                println!("skipping through {}", until.format("%Y-%m-%d %H:%M"))
            }
        },
    }
    Ok(())
}

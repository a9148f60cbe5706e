use chrono::NaiveTime;
use clap::{Args, Subcommand, ValueEnum};
use wakecast_core::{
    parse_time_of_day, AlarmDefinition, AlarmId, DaySet, HolidayPolicy, RepeatType, SoundRef,
    WeatherCategory,
};

use crate::context::{alarm_id, CliResult, Context};

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Never ring on a holiday
    Skip,
    /// Ring later on a holiday
    Delay,
    /// Ring as usual
    Same,
}

impl From<PolicyArg> for HolidayPolicy {
    fn from(value: PolicyArg) -> Self {
        match value {
            PolicyArg::Skip => HolidayPolicy::Skip,
            PolicyArg::Delay => HolidayPolicy::Delay,
            PolicyArg::Same => HolidayPolicy::Same,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RepeatArg {
    /// Re-arm after every ring
    Weekly,
    /// Disable after ringing once
    OneShot,
}

impl From<RepeatArg> for RepeatType {
    fn from(value: RepeatArg) -> Self {
        match value {
            RepeatArg::Weekly => RepeatType::Weekly,
            RepeatArg::OneShot => RepeatType::OneShot,
        }
    }
}

fn parse_sound_entry(raw: &str) -> Result<(WeatherCategory, SoundRef), String> {
    let (category, sound) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=SOUND, got '{raw}'"))?;
    let category: WeatherCategory = category.parse().map_err(|e| format!("{e}"))?;
    if sound.trim().is_empty() {
        return Err(format!("empty sound for '{category}'"));
    }
    Ok((category, SoundRef::new(sound.trim())))
}

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create an alarm and arm it
    Add {
        /// Label
        #[arg(default_value = "")]
        name: String,
        /// Fire time (HH:MM)
        #[arg(long, value_parser = parse_time_of_day)]
        time: NaiveTime,
        /// Days: every, weekdays, weekends, or a list like mon,wed,fri
        #[arg(long, default_value = "every")]
        days: DaySet,
        /// Holiday behavior
        #[arg(long, value_enum, default_value = "same")]
        policy: PolicyArg,
        /// Ring only on holidays
        #[arg(long)]
        holiday_only: bool,
        /// Disable after ringing once
        #[arg(long)]
        one_shot: bool,
        /// Weather sound, e.g. rain=file:///sounds/rain.ogg (repeatable)
        #[arg(long = "sound", value_parser = parse_sound_entry)]
        sounds: Vec<(WeatherCategory, SoundRef)>,
        /// Sound used when no weather sound applies
        #[arg(long)]
        default_sound: Option<String>,
        /// Minutes before firing to refresh the forecast
        #[arg(long)]
        prefetch_lead: Option<u32>,
        /// Volume percent (clamped to 100)
        #[arg(long)]
        volume: Option<u8>,
        /// Create disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Change an alarm and re-arm it
    Edit {
        id: i64,
        #[command(flatten)]
        changes: AlarmChanges,
    },
    /// List alarms
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one alarm as JSON
    Show { id: i64 },
    /// Delete an alarm
    Remove { id: i64 },
    /// Enable and arm an alarm
    Enable { id: i64 },
    /// Disable and cancel an alarm
    Disable { id: i64 },
}

/// Fields `alarm edit` may change; anything left unset is kept.
#[derive(Args, Default)]
pub struct AlarmChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_time_of_day)]
    time: Option<NaiveTime>,
    #[arg(long)]
    days: Option<DaySet>,
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
    #[arg(long)]
    holiday_only: Option<bool>,
    #[arg(long, value_enum)]
    repeat: Option<RepeatArg>,
    /// Drop every weather sound before applying --sound
    #[arg(long)]
    clear_sounds: bool,
    /// Weather sound to add or replace (repeatable)
    #[arg(long = "sound", value_parser = parse_sound_entry)]
    sounds: Vec<(WeatherCategory, SoundRef)>,
    /// Default sound; an empty value removes it
    #[arg(long)]
    default_sound: Option<String>,
    #[arg(long)]
    prefetch_lead: Option<u32>,
    /// Volume percent (clamped to 100)
    #[arg(long)]
    volume: Option<u8>,
}

impl AlarmChanges {
    fn apply(self, def: &mut AlarmDefinition) {
        if let Some(name) = self.name {
            def.name = name;
        }
        if let Some(time) = self.time {
            def.fire_time = time;
        }
        if let Some(days) = self.days {
            def.days = days;
        }
        if let Some(policy) = self.policy {
            def.holiday_policy = policy.into();
        }
        if let Some(holiday_only) = self.holiday_only {
            def.holiday_only = holiday_only;
        }
        if let Some(repeat) = self.repeat {
            def.repeat_type = repeat.into();
        }
        if self.clear_sounds {
            def.sound_mapping.clear();
        }
        def.sound_mapping.extend(self.sounds);
        match self.default_sound.as_deref().map(str::trim) {
            Some("") => def.default_sound = None,
            Some(sound) => def.default_sound = Some(SoundRef::new(sound)),
            None => {}
        }
        if let Some(lead) = self.prefetch_lead {
            def.prefetch_lead_minutes = lead;
        }
        if let Some(volume) = self.volume {
            def.volume_percent = volume.min(100);
        }
    }
}

fn describe(def: &AlarmDefinition) -> String {
    let days = if def.holiday_only {
        "holidays".to_string()
    } else {
        def.effective_days().to_string()
    };
    format!(
        "{:>4}  {}  {:<14}  {:<6}  {:<8}  {}",
        def.id.0,
        def.fire_time.format("%H:%M"),
        days,
        format!("{:?}", def.holiday_policy).to_lowercase(),
        if def.enabled { "enabled" } else { "disabled" },
        def.name,
    )
}

fn rearm(ctx: &Context, def: &AlarmDefinition) -> CliResult {
    match ctx.engine()?.arm_next(def)? {
        Some(occ) => println!(
            "armed {} for {} (shows {})",
            def.id,
            occ.fire_at.format("%Y-%m-%d %H:%M"),
            occ.effective_fire_time.format("%H:%M")
        ),
        None => println!("alarm {} is disabled", def.id),
    }
    Ok(())
}

pub fn run(action: AlarmAction) -> CliResult {
    let ctx = Context::open()?;
    match action {
        AlarmAction::Add {
            name,
            time,
            days,
            policy,
            holiday_only,
            one_shot,
            sounds,
            default_sound,
            prefetch_lead,
            volume,
            disabled,
        } => {
            let mut def = AlarmDefinition::new(AlarmId(0), name, time)
                .with_days(days)
                .with_policy(policy.into())
                .holiday_only(holiday_only)
                .with_prefetch_lead(
                    prefetch_lead.unwrap_or(ctx.config.schedule.default_prefetch_lead_minutes),
                );
            if one_shot {
                def = def.with_repeat(RepeatType::OneShot);
            }
            for (category, sound) in sounds {
                def = def.with_sound(category, sound);
            }
            if let Some(sound) = default_sound {
                def = def.with_default_sound(SoundRef::new(sound));
            }
            if let Some(volume) = volume {
                def.volume_percent = volume.min(100);
            }
            def.enabled = !disabled;

            def.id = ctx.db.insert_alarm(&def)?;
            println!("alarm created: {}", def.id);
            if def.enabled {
                rearm(&ctx, &def)?;
            }
        }
        AlarmAction::Edit { id, changes } => {
            let mut def = ctx.db.require_alarm(alarm_id(id))?;
            changes.apply(&mut def);
            ctx.db.update_alarm(&def)?;
            rearm(&ctx, &def)?;
        }
        AlarmAction::List { json } => {
            let alarms = ctx.db.list_alarms()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("no alarms");
            } else {
                for def in &alarms {
                    println!("{}", describe(def));
                }
            }
        }
        AlarmAction::Show { id } => {
            let def = ctx.db.require_alarm(alarm_id(id))?;
            println!("{}", serde_json::to_string_pretty(&def)?);
        }
        AlarmAction::Remove { id } => {
            let id = alarm_id(id);
            ctx.engine()?.cancel(id)?;
            if ctx.db.delete_alarm(id)? {
                println!("alarm {id} removed");
            } else {
                println!("alarm {id} not found");
            }
        }
        AlarmAction::Enable { id } => {
            let def = ctx.db.set_alarm_enabled(alarm_id(id), true)?;
            rearm(&ctx, &def)?;
        }
        AlarmAction::Disable { id } => {
            let def = ctx.db.set_alarm_enabled(alarm_id(id), false)?;
            ctx.engine()?.cancel(def.id)?;
            println!("alarm {} disabled", def.id);
        }
    }
    Ok(())
}

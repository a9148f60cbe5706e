use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use clap::Subcommand;
use wakecast_core::HolidayCalendar;

use crate::context::{CliResult, Context};

#[derive(Subcommand)]
pub enum HolidayAction {
    /// Import holidays from a JSON file of {"YYYY-MM-DD": "Name"}
    Import {
        file: PathBuf,
        /// Drop existing holidays first
        #[arg(long)]
        replace: bool,
    },
    /// List holidays
    List {
        /// First date (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Number of days to show
        #[arg(long, default_value = "365")]
        days: u64,
    },
}

pub fn run(action: HolidayAction) -> CliResult {
    let ctx = Context::open()?;
    match action {
        HolidayAction::Import { file, replace } => {
            let content = std::fs::read_to_string(&file)?;
            let calendar = HolidayCalendar::from_json(&content)?;
            if replace {
                ctx.db.clear_holidays()?;
            }
            let written = ctx.db.import_holidays(&calendar)?;
            println!("imported {written} holidays");
        }
        HolidayAction::List { from, days } => {
            let from = from.unwrap_or_else(|| Local::now().date_naive());
            let to = from.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
            let calendar = ctx.db.load_holidays()?;
            let records = calendar.between(from, to);
            if records.is_empty() {
                println!("no holidays");
            }
            for record in records {
                println!("{}  {}", record.date, record.name);
            }
        }
    }
    Ok(())
}

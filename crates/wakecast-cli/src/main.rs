use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "wakecast", version, about = "Holiday- and weather-aware alarm clock")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm definitions
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Skip-once overrides
    Skip {
        #[command(subcommand)]
        action: commands::skip::SkipAction,
    },
    /// Holiday calendar
    Holiday {
        #[command(subcommand)]
        action: commands::holiday::HolidayAction,
    },
    /// Cached weather category
    Weather {
        #[command(subcommand)]
        action: commands::weather::WeatherAction,
    },
    /// Compute and arm the next occurrence of an alarm
    Arm {
        /// Alarm id
        id: i64,
    },
    /// Record that an alarm fired and re-arm it
    Fired {
        /// Alarm id
        id: i64,
    },
    /// Cancel an armed alarm and its prefetch
    Cancel {
        /// Alarm id
        id: i64,
    },
    /// Show the next alarm to fire
    Next {
        /// Print as JSON
        #[arg(long)]
        json: bool,
        /// List every enabled alarm instead of only the earliest
        #[arg(long)]
        all: bool,
    },
    /// Show the sound an alarm would play right now
    Sound {
        /// Alarm id
        id: i64,
        /// Override the cached weather category
        #[arg(long)]
        weather: Option<String>,
        /// Treat the occurrence as a holiday
        #[arg(long)]
        holiday: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("WAKECAST_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Alarm { action } => commands::alarm::run(action),
        Commands::Skip { action } => commands::skip::run(action),
        Commands::Holiday { action } => commands::holiday::run(action),
        Commands::Weather { action } => commands::weather::run(action),
        Commands::Arm { id } => commands::schedule::arm(id),
        Commands::Fired { id } => commands::schedule::fired(id),
        Commands::Cancel { id } => commands::schedule::cancel(id),
        Commands::Next { json, all } => commands::schedule::next(json, all),
        Commands::Sound {
            id,
            weather,
            holiday,
        } => commands::sound::run(id, weather.as_deref(), holiday),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

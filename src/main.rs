mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use commands::{AppState, SettingsUpdate};
use femcycle::config::Settings;
use femcycle::models::{FlowLevel, Symptom, SymptomEntry, SymptomKind};

#[derive(Parser)]
#[command(name = "femcycle", version, about = "Private cycle tracking and prediction")]
struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Passphrase protecting the data file.
    #[arg(long, env = "FEMCYCLE_PASSPHRASE", hide_env_values = true)]
    passphrase: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user and print its id.
    Init,
    /// Record the first day of a period.
    LogCycle {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Remove a recorded cycle.
    DeleteCycle {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        cycle: Uuid,
    },
    /// List cycles, optionally those starting within a date range.
    Cycles {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Replace a cycle's notes.
    Notes {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        cycle: Uuid,
        text: String,
    },
    /// Log mood, energy, flow and symptoms for one day of a cycle.
    LogSymptom {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        cycle: Uuid,
        #[command(flatten)]
        day: DayLogArgs,
    },
    /// Day logs of a cycle, optionally within a date range.
    Symptoms {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        cycle: Uuid,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Replace a day log.
    UpdateSymptom {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        id: Uuid,
        #[command(flatten)]
        day: DayLogArgs,
    },
    /// Remove a day log.
    DeleteSymptom {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        id: Uuid,
    },
    /// Recompute and store the next-cycle prediction.
    Predict {
        #[arg(long)]
        user: Uuid,
    },
    /// Cycle length statistics.
    Stats {
        #[arg(long)]
        user: Uuid,
    },
    /// Where today falls in the current cycle.
    Status {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// The recent cycles a prediction is based on.
    History {
        #[arg(long)]
        user: Uuid,
    },
    /// Change per-user settings.
    Settings {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        cycle_length: Option<i64>,
        #[arg(long)]
        period_length: Option<i64>,
        #[arg(long)]
        luteal_phase: Option<i64>,
        #[arg(long)]
        fertility: Option<bool>,
    },
    /// Snapshot a user's cycles and settings.
    Backup {
        #[arg(long)]
        user: Uuid,
    },
    /// Remove a backup.
    DeleteBackup {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        backup: Uuid,
    },
    /// Delete one user's data, or the whole data file with --all.
    Wipe {
        #[arg(long, required_unless_present = "all")]
        user: Option<Uuid>,
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args)]
struct DayLogArgs {
    #[arg(long)]
    date: NaiveDate,
    /// 1-10
    #[arg(long)]
    mood: u8,
    /// 1-10
    #[arg(long)]
    energy: u8,
    /// spotting, light, medium or heavy
    #[arg(long, value_parser = parse_name::<FlowLevel>)]
    flow: Option<FlowLevel>,
    /// kind:severity, e.g. cramps:3; repeatable
    #[arg(long = "symptom", value_parser = parse_symptom)]
    symptoms: Vec<Symptom>,
    #[arg(long, default_value = "")]
    notes: String,
}

impl From<DayLogArgs> for SymptomEntry {
    fn from(args: DayLogArgs) -> Self {
        SymptomEntry {
            date: args.date,
            mood: args.mood,
            energy: args.energy,
            flow: args.flow,
            symptoms: args.symptoms,
            notes: args.notes,
        }
    }
}

/// Parse a unit enum by its serialized name.
fn parse_name<T: DeserializeOwned>(name: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(name.to_owned()))
        .map_err(|_| format!("unknown value `{name}`"))
}

fn parse_symptom(arg: &str) -> Result<Symptom, String> {
    let (kind, severity) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected kind:severity, got `{arg}`"))?;
    Ok(Symptom {
        kind: parse_name::<SymptomKind>(kind)?,
        severity: severity.parse().map_err(|_| format!("bad severity `{severity}`"))?,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Settings::default_path);
    let settings = match config_path.as_deref().map(Settings::load).transpose() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            eprintln!("config error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .init();

    match run(cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, settings: &Settings) -> Result<(), String> {
    let state = AppState::open(settings, &cli.passphrase)?;

    match cli.command {
        Command::Init => print(&commands::init(&state)?),
        Command::LogCycle { user, start, end } => {
            print(&commands::log_cycle(&state, user, start, end)?)
        }
        Command::DeleteCycle { user, cycle } => commands::delete_cycle(&state, user, cycle),
        Command::Cycles { user, from, to } => {
            print(&commands::list_cycles(&state, user, from, to)?)
        }
        Command::Notes { user, cycle, text } => {
            print(&commands::cycle_notes(&state, user, cycle, text)?)
        }
        Command::LogSymptom { user, cycle, day } => {
            print(&commands::log_symptom(&state, user, cycle, day.into())?)
        }
        Command::Symptoms {
            user,
            cycle,
            from,
            to,
        } => print(&commands::symptoms(&state, user, cycle, from, to)?),
        Command::UpdateSymptom { user, id, day } => {
            print(&commands::update_symptom(&state, user, id, day.into())?)
        }
        Command::DeleteSymptom { user, id } => commands::delete_symptom(&state, user, id),
        Command::Predict { user } => print(&commands::predict(&state, user)?),
        Command::Stats { user } => print(&commands::stats(&state, user)?),
        Command::Status { user, today } => {
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            print(&commands::status(&state, user, today)?)
        }
        Command::History { user } => print(&commands::history(&state, user)?),
        Command::Settings {
            user,
            cycle_length,
            period_length,
            luteal_phase,
            fertility,
        } => {
            let update = SettingsUpdate {
                cycle_length_days: cycle_length,
                period_length_days: period_length,
                luteal_phase_length_days: luteal_phase,
                show_fertility: fertility,
            };
            print(&commands::update_settings(&state, user, update)?)
        }
        Command::Backup { user } => print(&commands::backup(&state, user)?),
        Command::DeleteBackup { user, backup } => commands::delete_backup(&state, user, backup),
        Command::Wipe { all: true, .. } => commands::wipe_all_data(state),
        Command::Wipe { user: Some(user), .. } => commands::wipe_user(&state, user),
        Command::Wipe { user: None, .. } => Err("wipe needs --user or --all".into()),
    }
}

fn print<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

mod commands;
mod config;
mod planner;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_delete, cmd_history, cmd_import_legacy, cmd_lock_add, cmd_lock_list, cmd_lock_remove,
    cmd_lock_set_enabled, cmd_log, cmd_plan_generate, cmd_plan_show, cmd_plan_toggle,
    cmd_settings_set, cmd_settings_show,
};
use crate::config::Config;
use crate::planner::{OfflineProvider, PlannerClient};
use sprout_core::service::SproutService;

#[derive(Parser)]
#[command(
    name = "sprout",
    version,
    about = "A simple baby-feeding tracker CLI",
    long_about = "\n\n  ███████╗██████╗ ██████╗  ██████╗ ██╗   ██╗████████╗
  ██╔════╝██╔══██╗██╔══██╗██╔═══██╗██║   ██║╚══██╔══╝
  ███████╗██████╔╝██████╔╝██║   ██║██║   ██║   ██║
  ╚════██║██╔═══╝ ██╔══██╗██║   ██║██║   ██║   ██║
  ███████║██║     ██║  ██║╚██████╔╝╚██████╔╝   ██║
  ╚══════╝╚═╝     ╚═╝  ╚═╝ ╚═════╝  ╚═════╝    ╚═╝
        know when the next bottle is due.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the upcoming feeding plan
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Log a feeding
    Log {
        /// Amount fed (e.g. "3.5", "3.5oz", "120ml")
        amount: String,
        /// Clock time of the feeding (HH:MM, default: now)
        #[arg(short, long)]
        time: Option<String>,
        /// Date of the feeding (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Optional notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show feeding history
    History {
        /// Number of days to show (default: all)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a logged feeding by ID
    Delete {
        /// Feeding ID to delete
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change feeding settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Manage locked feeding times
    Lock {
        #[command(subcommand)]
        command: LockCommands,
    },
    /// Import data from older exports
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Generate a fresh ten-feeding plan (replaces the current one)
    Generate {
        /// Skip the natural-language planner and use the deterministic schedule
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current plan
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a plan entry between done and not done
    Toggle {
        /// Plan entry ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change settings (only the provided flags are updated)
    Set {
        /// Minimum hours between feedings
        #[arg(long)]
        window_min: Option<f64>,
        /// Maximum hours between feedings
        #[arg(long)]
        window_max: Option<f64>,
        /// Ideal hours between feedings (drives generated spacing)
        #[arg(long)]
        window_ideal: Option<f64>,
        /// Minimum amount per feeding
        #[arg(long)]
        amount_min: Option<f64>,
        /// Maximum amount per feeding
        #[arg(long)]
        amount_max: Option<f64>,
        /// Usual amount per feeding (used for generated slots)
        #[arg(long)]
        amount_target: Option<f64>,
        /// Display amounts in ml
        #[arg(long)]
        metric: bool,
        /// Display amounts in oz
        #[arg(long)]
        imperial: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum LockCommands {
    /// Add a locked feeding time
    Add {
        /// Clock time (HH:MM)
        time: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a locked feeding time
    Remove {
        /// Clock time (HH:MM)
        time: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply locked times to generated plans
    Enable {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop applying locked times
    Disable {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List locked feeding times
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import feedings from a legacy JSON export
    Legacy {
        /// Path to the JSON file
        file: std::path::PathBuf,
        /// Preview import without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let svc = SproutService::new(&config.db_path.to_string_lossy())?;

    match cli.command {
        Commands::Plan { command } => match command {
            PlanCommands::Generate { offline, json } => {
                if offline {
                    cmd_plan_generate(&svc, &OfflineProvider, json)
                } else {
                    let client = PlannerClient::new(config.planner.clone());
                    cmd_plan_generate(&svc, &client, json)
                }
            }
            PlanCommands::Show { json } => cmd_plan_show(&svc, json),
            PlanCommands::Toggle { id, json } => cmd_plan_toggle(&svc, &id, json),
        },
        Commands::Log {
            amount,
            time,
            date,
            notes,
            json,
        } => cmd_log(&svc, &amount, time, date, notes, json),
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Delete { id, json } => cmd_delete(&svc, id, json),
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&svc, json),
            SettingsCommands::Set {
                window_min,
                window_max,
                window_ideal,
                amount_min,
                amount_max,
                amount_target,
                metric,
                imperial,
                json,
            } => cmd_settings_set(
                &svc,
                window_min,
                window_max,
                window_ideal,
                amount_min,
                amount_max,
                amount_target,
                metric,
                imperial,
                json,
            ),
        },
        Commands::Lock { command } => match command {
            LockCommands::Add { time, json } => cmd_lock_add(&svc, &time, json),
            LockCommands::Remove { time, json } => cmd_lock_remove(&svc, &time, json),
            LockCommands::Enable { json } => cmd_lock_set_enabled(&svc, true, json),
            LockCommands::Disable { json } => cmd_lock_set_enabled(&svc, false, json),
            LockCommands::List { json } => cmd_lock_list(&svc, json),
        },
        Commands::Import { command } => match command {
            ImportCommands::Legacy {
                file,
                dry_run,
                json,
            } => cmd_import_legacy(&svc, &file, dry_run, json),
        },
    }
}

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ProfileUpdate, cmd_delete, cmd_entries, cmd_goal_set, cmd_goal_show, cmd_history, cmd_init,
    cmd_log, cmd_profile_create, cmd_profile_list, cmd_profile_move, cmd_profile_rename,
    cmd_profile_show, cmd_profile_update, cmd_setting_get, cmd_setting_set, cmd_totals,
    cmd_weight_delete, cmd_weight_history, cmd_weight_log, cmd_weight_progress,
};
use crate::config::Config;
use kcal_core::error::is_validation_error;
use kcal_core::models::resolve_profile_id;
use kcal_core::service::KcalService;

/// Environment variable holding the tracing filter (e.g. `debug`, `kcal_core=debug`).
const LOG_ENV: &str = "KCAL_LOG";

#[derive(Parser)]
#[command(
    name = "kcal",
    version,
    about = "A household calorie tracker with per-profile food and weight logs"
)]
struct Cli {
    /// Active profile ID (falls back to profile 1 when missing or not a positive integer)
    #[arg(long, global = true, env = "KCAL_PROFILE")]
    profile: Option<String>,
    /// Path to the SQLite database (overrides KCAL_DATABASE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database and seed the default profile
    Init {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a food entry
    Log {
        /// Food name
        name: String,
        /// Calories (whole number, 0 or more)
        calories: String,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: now)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List entries for one day (defaults to today)
    Entries {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food entry by ID
    Delete {
        /// Entry ID to delete
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show every logged day with its total against the goal
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily calorie totals for the last N days
    Totals {
        /// Window size in days (7 = week, 30 = month)
        #[arg(short, long, default_value = "7")]
        days: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change the daily calorie goal
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Manage household profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Track body weight
    Weight {
        #[command(subcommand)]
        command: WeightCommands,
    },
    /// Read or write legacy key/value settings
    Setting {
        #[command(subcommand)]
        command: SettingCommands,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Show the active profile's daily goal
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the active profile's daily goal (0 resets to the default)
    Set {
        /// Daily calorie goal
        calories: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List profiles in display order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a profile's details (default: the active profile)
    Show {
        /// Profile ID
        id: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a profile
    Create {
        /// Profile name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a profile
    Rename {
        /// Profile ID
        id: i64,
        /// New name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a profile up or down in the list
    Move {
        /// Profile ID
        id: i64,
        /// Direction: up or down
        direction: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update the active profile's details (unset flags keep their value, "" clears)
    Update {
        #[arg(long)]
        name: Option<String>,
        /// Daily calorie goal
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        age: Option<String>,
        /// Sedentary, Lightly Active, Moderately Active, Very Active, Extra Active
        #[arg(long)]
        lifestyle: Option<String>,
        /// Current weight in kg
        #[arg(long)]
        current_weight: Option<String>,
        /// Target weight in kg
        #[arg(long)]
        target_weight: Option<String>,
        /// Male or Female
        #[arg(long)]
        gender: Option<String>,
        /// Height in cm
        #[arg(long)]
        height: Option<String>,
        /// Weekly weight change in kg (e.g. -0.5)
        #[arg(long, allow_hyphen_values = true)]
        weekly_goal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WeightCommands {
    /// Log a weight entry in kg
    Log {
        /// Weight in kg
        weight: String,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show weight history, newest first
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a weight entry by ID
    Delete {
        /// Weight entry ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current, starting and target weight
    Progress {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingCommands {
    /// Read a setting
    Get {
        key: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a setting
    Set {
        key: String,
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        let code = if is_validation_error(&e) { 2 } else { 1 };
        process::exit(code);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.database)?;
    let profile_id = resolve_profile_id(cli.profile.as_deref());
    debug!(db = %config.db_path.display(), profile_id, "starting");
    let svc = KcalService::open(&config.db_path)?;

    match cli.command {
        Commands::Init { json } => cmd_init(&svc, &config.db_path, json),
        Commands::Log {
            name,
            calories,
            date,
            json,
        } => cmd_log(&svc, profile_id, &name, &calories, date, json),
        Commands::Entries { date, json } => cmd_entries(&svc, profile_id, date, json),
        Commands::Delete { entry_id, json } => cmd_delete(&svc, profile_id, entry_id, json),
        Commands::History { json } => cmd_history(&svc, profile_id, json),
        Commands::Totals { days, json } => cmd_totals(&svc, profile_id, days, json),
        Commands::Goal { command } => match command {
            GoalCommands::Show { json } => cmd_goal_show(&svc, profile_id, json),
            GoalCommands::Set { calories, json } => cmd_goal_set(&svc, profile_id, &calories, json),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::List { json } => cmd_profile_list(&svc, profile_id, json),
            ProfileCommands::Show { id, json } => {
                cmd_profile_show(&svc, id.unwrap_or(profile_id), json)
            }
            ProfileCommands::Create { name, json } => cmd_profile_create(&svc, &name, json),
            ProfileCommands::Rename { id, name, json } => {
                cmd_profile_rename(&svc, id, &name, json)
            }
            ProfileCommands::Move {
                id,
                direction,
                json,
            } => cmd_profile_move(&svc, id, &direction, json),
            ProfileCommands::Update {
                name,
                goal,
                age,
                lifestyle,
                current_weight,
                target_weight,
                gender,
                height,
                weekly_goal,
                json,
            } => {
                let update = ProfileUpdate {
                    name,
                    goal,
                    age,
                    lifestyle,
                    current_weight,
                    target_weight,
                    gender,
                    height,
                    weekly_goal,
                };
                cmd_profile_update(&svc, profile_id, &update, json)
            }
        },
        Commands::Weight { command } => match command {
            WeightCommands::Log { weight, date, json } => {
                cmd_weight_log(&svc, profile_id, &weight, date, json)
            }
            WeightCommands::History { json } => cmd_weight_history(&svc, profile_id, json),
            WeightCommands::Delete { id, json } => cmd_weight_delete(&svc, profile_id, id, json),
            WeightCommands::Progress { json } => cmd_weight_progress(&svc, profile_id, json),
        },
        Commands::Setting { command } => match command {
            SettingCommands::Get { key, json } => cmd_setting_get(&svc, &key, json),
            SettingCommands::Set { key, value, json } => cmd_setting_set(&svc, &key, &value, json),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kcal",
            "log",
            "Toast",
            "300",
            "--profile",
            "2",
            "--database",
            "/tmp/kcal.db",
        ])
        .unwrap();
        assert_eq!(cli.profile.as_deref(), Some("2"));
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/kcal.db")));
        assert!(matches!(cli.command, Commands::Log { ref name, .. } if name == "Toast"));
    }

    #[test]
    fn test_parse_negative_weekly_goal() {
        let cli = Cli::try_parse_from(["kcal", "profile", "update", "--weekly-goal", "-0.5"]).unwrap();
        match cli.command {
            Commands::Profile {
                command: ProfileCommands::Update { weekly_goal, .. },
            } => assert_eq!(weekly_goal.as_deref(), Some("-0.5")),
            _ => panic!("expected profile update"),
        }
    }
}

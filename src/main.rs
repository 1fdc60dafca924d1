mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rota::availability::RecurrencePattern;
use rota::config::Config;
use rota::error::{Error as RotaError, RotaErrorTrait};
use rota::lifecycle::Actor;
use rota::models::{AssignmentRef, EventKind, Role};
use rota::scheduler::YearMonth;

use commands::actions::ActionName;
use commands::{ActionArgs, UnavailableArgs};

#[derive(Parser)]
#[command(
    name = "rota",
    version,
    about = "Volunteer roster generation and shift hand-off",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./config.toml, then environment)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the roster for a month (YYYY-MM)
    Generate {
        month: YearMonth,
    },

    /// Print the roster for a month
    Show {
        month: YearMonth,
    },

    /// Create an event by hand; all slots start open
    AddEvent {
        date: NaiveDate,

        /// primary, secondary or custom
        #[arg(short, long, default_value = "custom")]
        kind: EventKind,

        #[arg(short, long)]
        title: Option<String>,

        /// Role slots for custom events (repeatable)
        #[arg(short, long = "role")]
        roles: Vec<Role>,
    },

    /// Change an event's title or notes; an empty value clears it
    EditEvent {
        date: NaiveDate,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete the event on a date
    DeleteEvent {
        date: NaiveDate,
    },

    /// Delete every event in a month (manager only)
    WipeMonth {
        month: YearMonth,

        #[arg(long)]
        actor: String,

        /// Confirm the deletion
        #[arg(long, default_value = "false")]
        yes: bool,
    },

    /// Confirm every pending assignment in a month (manager only)
    BulkConfirm {
        month: YearMonth,

        #[arg(long)]
        actor: String,
    },

    /// Apply a lifecycle action to one slot (YYYY-MM-DD#N)
    Action {
        slot: AssignmentRef,

        #[arg(value_enum)]
        name: ActionName,

        /// Who is acting
        #[arg(long)]
        actor: String,

        /// Act with manager rights
        #[arg(long, default_value = "false")]
        manager: bool,

        /// Slot offered in exchange (swap)
        #[arg(long)]
        offer: Option<AssignmentRef>,

        /// New occupant: a name, TBD or Open (reassign)
        #[arg(long)]
        person: Option<String>,
    },

    /// Issue a hand-off token for a slot that needs coverage
    IssueToken {
        slot: AssignmentRef,
    },

    /// Pick up a shift with a hand-off token
    Redeem {
        token: String,

        #[arg(long)]
        actor: String,
    },

    /// Manage unavailability periods
    Unavailable {
        #[command(subcommand)]
        command: UnavailableCommands,
    },

    /// Validate the configuration and print a summary
    CheckConfig,
}

#[derive(Subcommand)]
enum UnavailableCommands {
    /// Record a period during which someone cannot work
    Add {
        person: String,

        start: NaiveDate,

        /// Last day (defaults to start)
        end: Option<NaiveDate>,

        #[arg(short, long)]
        reason: Option<String>,

        /// Recurring restriction such as every_friday or 2nd_sunday
        #[arg(short, long)]
        pattern: Option<RecurrencePattern>,
    },

    /// List recorded periods
    List {
        #[arg(short, long)]
        person: Option<String>,
    },

    /// Remove a period by id
    Remove {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = rota::metrics::init_metrics() {
        tracing::warn!(error = %e, "Failed to initialize metrics");
    }

    match run(cli.command, config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            let err = RotaError::from_anyhow(err)?;
            tracing::error!(
                category = err.category().as_str(),
                recoverable = err.is_recoverable(),
                error = %err,
                "Command failed"
            );
            eprintln!("Error: {err}");
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    if let Commands::CheckConfig = command {
        return commands::check_config(&config);
    }

    config.validate()?;
    let service = commands::open_service(Arc::new(config))?;

    match command {
        Commands::Generate { month } => {
            tracing::info!(%month, "Starting generate command");
            commands::generate(&service, month)?;
        }

        Commands::Show { month } => {
            commands::show(&service, month)?;
        }

        Commands::AddEvent {
            date,
            kind,
            title,
            roles,
        } => {
            tracing::info!(%date, %kind, "Starting add-event command");
            commands::add_event(&service, date, kind, title, roles)?;
        }

        Commands::EditEvent { date, title, notes } => {
            commands::edit_event(&service, date, title, notes)?;
        }

        Commands::DeleteEvent { date } => {
            tracing::info!(%date, "Starting delete-event command");
            commands::delete_event(&service, date)?;
        }

        Commands::WipeMonth { month, actor, yes } => {
            commands::wipe_month(&service, month, &Actor::manager(actor), yes)?;
        }

        Commands::BulkConfirm { month, actor } => {
            commands::bulk_confirm(&service, month, &Actor::manager(actor))?;
        }

        Commands::Action {
            slot,
            name,
            actor,
            manager,
            offer,
            person,
        } => {
            tracing::info!(%slot, action = ?name, actor = %actor, "Starting action command");
            let args = ActionArgs {
                slot,
                name,
                actor,
                manager,
                offer,
                person,
            };
            commands::action(&service, args).await?;
        }

        Commands::IssueToken { slot } => {
            commands::issue_token(&service, slot)?;
        }

        Commands::Redeem { token, actor } => {
            commands::redeem(&service, &token, &actor).await?;
        }

        Commands::Unavailable { command } => match command {
            UnavailableCommands::Add {
                person,
                start,
                end,
                reason,
                pattern,
            } => {
                let args = UnavailableArgs {
                    person,
                    start,
                    end,
                    reason,
                    pattern,
                };
                commands::unavailable_add(&service, args)?;
            }
            UnavailableCommands::List { person } => {
                commands::unavailable_list(&service, person.as_deref())?;
            }
            UnavailableCommands::Remove { id } => {
                commands::unavailable_remove(&service, id)?;
            }
        },

        Commands::CheckConfig => {}
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("rota=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("rota={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

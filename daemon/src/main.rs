//! Traffic sign ledger daemon: runs the deadline sweeper and exposes the
//! resolution engine's operations as operator commands.

mod config;
mod error;
mod shutdown;
mod sweeper;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use tsl_resolution::{retry_once, AdminDecision, ResolutionEngine, SignDraft, SubmissionDraft};
use tsl_store_lmdb::{check_integrity, LmdbEnvironment};
use tsl_types::{
    SignId, SignKind, SubmissionAction, SubmissionId, SystemClock, UserId, UserRole,
    VoteDirection,
};
use tsl_utils::{format_duration, format_until, init_logging, LogFormat, StatsCounter};

use config::DaemonConfig;
use shutdown::ShutdownController;
use sweeper::{run_sweeper, sweep_once, SWEEP_COUNTERS};

/// Named LMDB databases plus headroom.
const MAX_DBS: u32 = 16;

type Engine = ResolutionEngine<LmdbEnvironment, SystemClock>;

#[derive(Parser)]
#[command(name = "tsl", about = "Traffic sign ledger submission resolution daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "TSL_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "TSL_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// LMDB map size in megabytes.
    #[arg(long, env = "TSL_MAP_SIZE_MB")]
    map_size_mb: Option<usize>,

    /// Seconds between deadline sweeps.
    #[arg(long, env = "TSL_SWEEP_INTERVAL_SECS")]
    sweep_interval_secs: Option<u64>,

    /// Log output: "human" or "json".
    #[arg(long, env = "TSL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TSL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the deadline sweeper until SIGINT/SIGTERM.
    Run,
    /// Run a single deadline sweep and exit.
    Sweep,
    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Propose a change to the sign dataset.
    Propose {
        #[arg(long)]
        proposer: UserId,
        #[arg(long, value_enum)]
        action: ActionArg,
        /// Existing sign, for update and remove.
        #[arg(long)]
        target: Option<SignId>,
        /// Category of the new sign, for add.
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        longitude: Option<f64>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Cast a vote on a pending submission.
    Vote {
        #[arg(long)]
        submission: SubmissionId,
        #[arg(long)]
        voter: UserId,
        #[arg(long, value_enum)]
        direction: DirectionArg,
    },
    /// Show the current voting result of a submission.
    #[command(name = "result")]
    Tally {
        #[arg(long)]
        submission: SubmissionId,
    },
    /// Resolve a pending submission by hand.
    AdminResolve {
        #[arg(long)]
        submission: SubmissionId,
        #[arg(long)]
        admin: UserId,
        #[arg(long, value_enum)]
        decision: DecisionArg,
    },
    /// Check storage consistency.
    Check,
    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user with the starting balance.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
    },
    /// Show a user with their coin ledger and notifications.
    Show {
        #[arg(long)]
        id: UserId,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    User,
    Staff,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => UserRole::User,
            RoleArg::Staff => UserRole::Staff,
            RoleArg::Admin => UserRole::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Add,
    Update,
    Remove,
}

impl From<ActionArg> for SubmissionAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Add => SubmissionAction::Add,
            ActionArg::Update => SubmissionAction::Update,
            ActionArg::Remove => SubmissionAction::Remove,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Regulatory,
    Warning,
    Informational,
}

impl From<KindArg> for SignKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Regulatory => SignKind::Regulatory,
            KindArg::Warning => SignKind::Warning,
            KindArg::Informational => SignKind::Informational,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    Approve,
    Reject,
}

impl From<DirectionArg> for VoteDirection {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Approve => VoteDirection::Approve,
            DirectionArg::Reject => VoteDirection::Reject,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for AdminDecision {
    fn from(decision: DecisionArg) -> Self {
        match decision {
            DecisionArg::Approve => AdminDecision::Approve,
            DecisionArg::Reject => AdminDecision::Reject,
        }
    }
}

/// Merge the config file (or defaults) with CLI and env overrides.
fn load_config(cli: &Cli) -> anyhow::Result<DaemonConfig> {
    let mut config = match &cli.config {
        Some(path) => DaemonConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DaemonConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(mb) = cli.map_size_mb {
        config.map_size_mb = mb;
    }
    if let Some(secs) = cli.sweep_interval_secs {
        config.sweep_interval_secs = secs;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn open_engine(config: &DaemonConfig) -> anyhow::Result<Engine> {
    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    Ok(ResolutionEngine::new(env, SystemClock, config.params.clone()))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;
    if let Some(path) = &cli.config {
        tracing::info!("loaded config from {}", path.display());
    }

    match cli.command {
        Command::Run => {
            let engine = Arc::new(open_engine(&config)?);
            let stats = Arc::new(StatsCounter::new(SWEEP_COUNTERS));
            let controller = Arc::new(ShutdownController::new());
            let interval = Duration::from_secs(config.sweep_interval_secs);

            tracing::info!(
                data_dir = %config.data_dir.display(),
                review_window = %format_duration(config.params.review_window_secs),
                "starting traffic sign ledger daemon"
            );

            let sweeper = tokio::spawn(run_sweeper(
                engine,
                interval,
                Arc::clone(&stats),
                controller.subscribe(),
            ));

            let signals = Arc::clone(&controller);
            tokio::spawn(async move { signals.wait_for_signal().await });

            sweeper.await?;
            tracing::info!("daemon exited cleanly");
        }
        Command::Sweep => {
            let engine = Arc::new(open_engine(&config)?);
            let stats = StatsCounter::new(SWEEP_COUNTERS);
            let report = sweep_once(&engine, &stats).await?;
            print_json(&serde_json::json!({
                "examined": report.examined,
                "approved": report.approved,
                "rejected": report.rejected,
                "escalated": report.escalated,
                "failed": report.failed,
            }))?;
        }
        Command::User { action } => {
            let engine = open_engine(&config)?;
            match action {
                UserAction::Add { name, role } => {
                    let user = engine.register_user(&name, role.into())?;
                    print_json(&user)?;
                }
                UserAction::Show { id } => {
                    print_json(&serde_json::json!({
                        "user": engine.user(&id)?,
                        "transactions": engine.transactions(&id)?,
                        "notifications": engine.notifications(&id)?,
                    }))?;
                }
            }
        }
        Command::Propose {
            proposer,
            action,
            target,
            kind,
            label,
            latitude,
            longitude,
            description,
        } => {
            let engine = open_engine(&config)?;
            let sign = match (kind, label, latitude, longitude) {
                (Some(kind), Some(label), Some(latitude), Some(longitude)) => Some(SignDraft {
                    kind: kind.into(),
                    label,
                    latitude,
                    longitude,
                }),
                (None, None, None, None) => None,
                _ => anyhow::bail!("a new sign needs --kind, --label, --latitude and --longitude"),
            };
            let submission = engine.propose(
                &proposer,
                SubmissionDraft {
                    action: action.into(),
                    sign,
                    target,
                    description,
                },
            )?;
            tracing::info!(
                submission = %submission.id,
                "voting closes {}",
                format_until(submission.deadline.as_secs(), submission.created_at.as_secs())
            );
            print_json(&submission)?;
        }
        Command::Vote {
            submission,
            voter,
            direction,
        } => {
            let engine = open_engine(&config)?;
            let result = retry_once(|| engine.cast_vote(&submission, &voter, direction.into()))?;
            print_json(&result)?;
        }
        Command::Tally { submission } => {
            let engine = open_engine(&config)?;
            print_json(&engine.get_voting_result(&submission)?)?;
        }
        Command::AdminResolve {
            submission,
            admin,
            decision,
        } => {
            let engine = open_engine(&config)?;
            let result = engine.admin_resolve(&submission, &admin, decision.into())?;
            print_json(&result)?;
        }
        Command::Check => {
            let engine = open_engine(&config)?;
            let report = check_integrity(engine.store())?;
            for line in &report.errors {
                tracing::error!("{line}");
            }
            print_json(&serde_json::json!({
                "databases_checked": report.databases_checked,
                "total_entries": report.total_entries,
                "errors": &report.errors,
            }))?;
            if !report.is_healthy() {
                anyhow::bail!("integrity check found {} problem(s)", report.errors.len());
            }
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use master_schedule::catalog::{Mode, Rule};
use master_schedule::config::{ServerConfig, SolveConfig, TunerConfig};
use master_schedule::data::SchedulingInput;
use master_schedule::domain::Domain;
use master_schedule::error::{RecordError, ScheduleError, ServerError};
use master_schedule::records::{load_input, read_json, write_json, write_tables};
use master_schedule::server::run_server;
use master_schedule::tuner::{DirectorySink, PenaltyTuner};
use master_schedule::{HighsEngine, SolveStatus, solve_input};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

impl From<RecordError> for CliError {
    fn from(value: RecordError) -> Self {
        Self::Schedule(value.into())
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "master_schedule",
    about = "Build school master schedules and tune their penalty weights",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Solve one schedule and write the output tables
    Solve(SolveArgs),
    /// Search penalty weights and persist the best configuration
    Tune(TuneArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Directory holding the input CSV files
    #[arg(long, default_value = "data", conflicts_with = "input_json")]
    input_dir: PathBuf,
    /// A JSON scheduling input instead of the CSV directory
    #[arg(long)]
    input_json: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SolveArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Directory the output tables are written to
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
    /// JSON solve configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Wall-clock budget in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Solver worker threads
    #[arg(long)]
    workers: Option<u32>,
    /// Enforce a rule as a hard constraint (repeatable)
    #[arg(long = "hard", value_parser = parse_rule)]
    hard: Vec<Rule>,
    /// Relax a rule into a weighted penalty (repeatable)
    #[arg(long = "soft", value_parser = parse_rule)]
    soft: Vec<Rule>,
}

#[derive(Args, Debug)]
struct TuneArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Directory receiving best_configuration/ and tuning_summary.json
    #[arg(long, default_value = "tuning_results")]
    output_dir: PathBuf,
    /// JSON tuner configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Candidates evaluated at the same time
    #[arg(long)]
    parallelism: Option<usize>,
    /// Wall-clock budget per candidate in seconds
    #[arg(long)]
    time_limit: Option<f64>,
}

fn parse_rule(value: &str) -> Result<Rule, String> {
    Rule::from_key(value).ok_or_else(|| {
        let known: Vec<&str> = Rule::ALL.iter().map(|r| r.key()).collect();
        format!("unknown rule '{}', expected one of {}", value, known.join(", "))
    })
}

fn load(args: &InputArgs) -> Result<SchedulingInput, CliError> {
    match &args.input_json {
        Some(path) => Ok(read_json(path)?),
        None => Ok(load_input(&args.input_dir)?),
    }
}

fn load_config<T: Default + for<'de> serde::Deserialize<'de>>(
    path: Option<&Path>,
) -> Result<T, CliError> {
    match path {
        Some(path) => Ok(read_json(path)?),
        None => Ok(T::default()),
    }
}

async fn serve(args: ServeArgs) -> Result<(), CliError> {
    let mut config = ServerConfig::from_env().map_err(ServerError::from)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    run_server(config, HighsEngine).await?;
    Ok(())
}

fn solve(args: SolveArgs) -> Result<(), CliError> {
    let input = load(&args.input)?;
    let mut config: SolveConfig = load_config(args.config.as_deref())?;
    if let Some(limit) = args.time_limit {
        config.time_limit_secs = limit;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    for rule in args.hard {
        config.modes.insert(rule, Mode::Hard);
    }
    for rule in args.soft {
        config.modes.insert(rule, Mode::Soft);
    }

    let report = solve_input(&input, &config, &HighsEngine)?;
    write_tables(&args.output_dir, &report.tables)?;
    write_json(&args.output_dir.join("conflicts.json"), &report.conflicts)?;

    match report.status {
        SolveStatus::Optimal | SolveStatus::FeasibleNotOptimal => info!(
            "Schedule {:?}: objective {:?}, {} conflicts",
            report.status,
            report.objective,
            report.conflicts.conflicts.len()
        ),
        SolveStatus::Infeasible | SolveStatus::TimedOut => {
            warn!("No schedule found: {:?}", report.status)
        }
    }
    for conflict in &report.conflicts.conflicts {
        info!("{}: {}", conflict, conflict.remediation());
    }
    info!("Results written to {}", args.output_dir.display());
    Ok(())
}

fn tune(args: TuneArgs) -> Result<(), CliError> {
    let input = load(&args.input)?;
    let mut config: TunerConfig = load_config(args.config.as_deref())?;
    if let Some(parallelism) = args.parallelism {
        config.parallelism = parallelism;
    }
    if let Some(limit) = args.time_limit {
        config.solve.time_limit_secs = limit;
    }

    let domain = Domain::from_input(&input).map_err(ScheduleError::from)?;
    let mut sink = DirectorySink::new(&args.output_dir);
    let outcome = PenaltyTuner::new(&HighsEngine, config).tune(&domain, &mut sink)?;

    match outcome.best {
        Some(best) => info!(
            "Best candidate {} scored {}; saved to {}",
            best.index,
            best.score,
            sink.best_dir().display()
        ),
        None => warn!("No candidate was evaluated"),
    }
    Ok(())
}

pub(crate) async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => serve(args).await,
        Command::Solve(args) => tokio::task::block_in_place(|| solve(args)),
        Command::Tune(args) => tokio::task::block_in_place(|| tune(args)),
    }
}

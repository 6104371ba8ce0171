//! factorybot - Telegram front-end for the software factory
//!
//! CLI entry point for the bot, the notifier and operator commands.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use factorybot::bot::{BotHandler, BotRunner};
use factorybot::cli::{Cli, Command, OutputFormat, get_log_path};
use factorybot::config::Config;
use factorybot::dashboard::DashboardClient;
use factorybot::domain::{Phase, ProjectWorkspace, is_valid_project_id, new_project_id};
use factorybot::progress::{ProgressEstimator, ProgressReport};
use factorybot::state::{RegistryStore, WatchRegistry};
use factorybot::telegram::TelegramClient;
use factorybot::watcher::Notifier;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Load the optional dotenv file before anything reads the environment
fn load_env_file(config: &Config) {
    let Some(path) = &config.env_file else {
        debug!("load_env_file: no env-file configured");
        return;
    };
    match dotenv::from_path(path) {
        Ok(()) => info!(path = %path.display(), "Loaded env file"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to load env file"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first; its log-level feeds the logger
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    load_env_file(&config);

    info!(
        projects_root = %config.paths.projects_root().display(),
        state_file = %config.paths.state_file().display(),
        "factorybot loaded config"
    );

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Bot => {
            debug!("main: matched Bot command");
            cmd_bot(&config).await
        }
        Command::Notify { once } => {
            debug!(once, "main: matched Notify command");
            cmd_notify(&config, once).await
        }
        Command::Status { project_id, format } => {
            debug!(%project_id, ?format, "main: matched Status command");
            cmd_status(&config, &project_id, format)
        }
        Command::Projects { limit } => {
            debug!(limit, "main: matched Projects command");
            cmd_projects(&config, limit)
        }
        Command::Create { spec } => {
            debug!(?spec, "main: matched Create command");
            cmd_create(&config, spec.as_ref())
        }
        Command::Watch { project_id, chat_id } => {
            debug!(%project_id, %chat_id, "main: matched Watch command");
            cmd_watch(&config, &project_id, &chat_id).await
        }
        Command::Watchers { format } => {
            debug!(?format, "main: matched Watchers command");
            cmd_watchers(&config, format).await
        }
    }
}

fn spawn_registry(config: &Config) -> WatchRegistry {
    WatchRegistry::spawn(RegistryStore::file(config.paths.state_file()))
}

fn build_notifier(config: &Config, registry: WatchRegistry) -> Result<Notifier> {
    let sender = TelegramClient::from_config(&config.telegram).context("Failed to create Telegram client")?;
    Ok(Notifier::new(
        config.notifier.clone(),
        registry,
        ProgressEstimator::new(config.paths.projects_root()),
        Arc::new(sender),
    ))
}

/// Run the bot and the notifier until interrupted
async fn cmd_bot(config: &Config) -> Result<()> {
    debug!("cmd_bot: called");
    config.validate_bot()?;

    let registry = spawn_registry(config);
    let projects_root = config.paths.projects_root();

    let notifier = build_notifier(config, registry.clone())?;
    let notifier_handle = tokio::spawn(notifier.run());

    let runner = DashboardClient::from_config(&config.dashboard).context("Failed to create dashboard client")?;
    let handler = BotHandler::new(
        registry.clone(),
        ProjectWorkspace::new(&projects_root),
        ProgressEstimator::new(&projects_root),
        Arc::new(runner),
    );
    let client = TelegramClient::from_config(&config.telegram).context("Failed to create Telegram client")?;
    let bot = BotRunner::new(Arc::new(client), handler, config.telegram.long_poll_secs);

    println!("{} polling Telegram (logs: {})", "factorybot".green(), get_log_path().display());

    let result = tokio::select! {
        result = bot.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            Ok(())
        }
    };

    notifier_handle.abort();
    if let Err(e) = registry.shutdown().await {
        debug!(error = %e, "cmd_bot: registry already stopped");
    }
    result
}

/// Run the notifier loop, or one pass of it
async fn cmd_notify(config: &Config, once: bool) -> Result<()> {
    debug!(once, "cmd_notify: called");
    config.validate_bot()?;

    let registry = spawn_registry(config);
    let notifier = build_notifier(config, registry.clone())?;

    if once {
        let notified = notifier.check_once().await?;
        println!("Notified {} project(s)", notified);
        registry.shutdown().await?;
        return Ok(());
    }

    tokio::select! {
        result = notifier.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, shutting down");
            Ok(())
        }
    }
}

fn colored_phase(phase: Phase) -> colored::ColoredString {
    match phase {
        Phase::Passed => phase.as_str().green(),
        Phase::Failed => phase.as_str().red(),
        Phase::Running => phase.as_str().yellow(),
        Phase::NotStarted => phase.as_str().dimmed(),
    }
}

fn print_report(report: &ProgressReport) {
    println!("{}", report.project_id.bold());
    println!("  Phase:   {}", colored_phase(report.phase));
    println!("  Percent: {}%", report.percent);
    println!("  ETA:     {}", report.eta);
    if let Some(updated_at) = &report.updated_at {
        println!("  Updated: {}", updated_at);
    }
    println!();
    for milestone in &report.milestones {
        let mark = if milestone.done { "[x]".green() } else { "[ ]".dimmed() };
        println!("  {} {} ({}%)", mark, milestone.label, milestone.weight);
    }
}

/// Print the progress report of one project
fn cmd_status(config: &Config, project_id: &str, format: OutputFormat) -> Result<()> {
    debug!(%project_id, ?format, "cmd_status: called");
    let report = ProgressEstimator::new(config.paths.projects_root()).estimate(project_id);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn cmd_projects(config: &Config, limit: usize) -> Result<()> {
    debug!(limit, "cmd_projects: called");
    let ids = ProjectWorkspace::new(config.paths.projects_root()).list(limit);

    if ids.is_empty() {
        println!("No projects found");
        return Ok(());
    }
    for id in ids {
        println!("{}", id);
    }
    Ok(())
}

/// Create a project skeleton, optionally seeded with a spec file
fn cmd_create(config: &Config, spec: Option<&PathBuf>) -> Result<()> {
    debug!(?spec, "cmd_create: called");
    let spec = match spec {
        Some(path) => fs::read_to_string(path).context(format!("Failed to read spec from {}", path.display()))?,
        None => String::new(),
    };

    let project_id = new_project_id();
    let paths = ProjectWorkspace::new(config.paths.projects_root())
        .create(&project_id, &spec)
        .context("Failed to create project")?;

    println!("{} {}", "Created".green(), project_id);
    println!("  {}", paths.dir().display());
    Ok(())
}

/// Subscribe a chat from the command line
async fn cmd_watch(config: &Config, project_id: &str, chat_id: &str) -> Result<()> {
    debug!(%project_id, %chat_id, "cmd_watch: called");
    if !is_valid_project_id(project_id) {
        return Err(eyre::eyre!("Invalid project id: {}", project_id));
    }

    let registry = spawn_registry(config);
    let added = registry.subscribe(project_id, chat_id).await?;
    registry.shutdown().await?;

    if added {
        println!("{} chat {} to {}", "Subscribed".green(), chat_id, project_id);
    } else {
        println!("Chat {} already watches {}", chat_id, project_id);
    }
    Ok(())
}

/// Print the watch table
async fn cmd_watchers(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_watchers: called");
    let registry = spawn_registry(config);
    let entries = registry.list_watched().await?;
    registry.shutdown().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No watched projects");
                return Ok(());
            }
            for entry in entries {
                let last = entry
                    .last_notified
                    .map(colored_phase)
                    .unwrap_or_else(|| "-".dimmed());
                println!("{}  last: {}  chats: {}", entry.project_id.bold(), last, entry.subscribers.join(", "));
            }
        }
    }
    Ok(())
}

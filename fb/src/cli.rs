//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// factorybot - Telegram front-end for the software factory
#[derive(Parser)]
#[command(
    name = "fb",
    about = "Telegram bot, progress estimator and build notifier for the software factory",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the Telegram bot together with the notifier
    Bot,

    /// Run the notifier without the bot
    Notify {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,
    },

    /// Show the progress report of a project
    Status {
        /// Project ID
        project_id: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the most recent projects
    Projects {
        /// Maximum number of projects to show
        #[arg(short = 'n', long, default_value = "12")]
        limit: usize,
    },

    /// Create a new project
    Create {
        /// File holding the project spec
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },

    /// Subscribe a chat to a project's notifications
    Watch {
        /// Project ID
        project_id: String,

        /// Telegram chat ID (negative for groups)
        #[arg(allow_negative_numbers = true)]
        chat_id: String,
    },

    /// Show the watch table
    Watchers {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("factorybot")
        .join("logs")
        .join("factorybot.log")
}

/// Output format for status/watchers commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["fb"]).is_err());
    }

    #[test]
    fn test_cli_parse_bot() {
        let cli = Cli::parse_from(["fb", "bot"]);
        assert!(matches!(cli.command, Command::Bot));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_notify() {
        let cli = Cli::parse_from(["fb", "notify"]);
        assert!(matches!(cli.command, Command::Notify { once: false }));

        let cli = Cli::parse_from(["fb", "notify", "--once"]);
        assert!(matches!(cli.command, Command::Notify { once: true }));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["fb", "status", "prj_1", "--format", "json"]);
        if let Command::Status { project_id, format } = cli.command {
            assert_eq!(project_id, "prj_1");
            assert_eq!(format, OutputFormat::Json);
        } else {
            panic!("Expected Status command");
        }
    }

    #[test]
    fn test_cli_parse_projects_default_limit() {
        let cli = Cli::parse_from(["fb", "projects"]);
        assert!(matches!(cli.command, Command::Projects { limit: 12 }));

        let cli = Cli::parse_from(["fb", "projects", "-n", "3"]);
        assert!(matches!(cli.command, Command::Projects { limit: 3 }));
    }

    #[test]
    fn test_cli_parse_create() {
        let cli = Cli::parse_from(["fb", "create", "--spec", "spec.md"]);
        if let Command::Create { spec } = cli.command {
            assert_eq!(spec, Some(PathBuf::from("spec.md")));
        } else {
            panic!("Expected Create command");
        }
    }

    #[test]
    fn test_cli_parse_watch() {
        let cli = Cli::parse_from(["fb", "watch", "prj_1", "-100200"]);
        if let Command::Watch { project_id, chat_id } = cli.command {
            assert_eq!(project_id, "prj_1");
            assert_eq!(chat_id, "-100200");
        } else {
            panic!("Expected Watch command");
        }
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::parse_from(["fb", "watchers", "-c", "/tmp/fb.yml", "--log-level", "debug"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/fb.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(
            cli.command,
            Command::Watchers {
                format: OutputFormat::Text
            }
        ));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("factorybot/logs/factorybot.log"));
    }
}

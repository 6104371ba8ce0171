//! factorybot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::watcher::NotifierConfig;

/// Main factorybot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when no --log-level flag is given
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Optional dotenv file loaded at startup
    #[serde(rename = "env-file")]
    pub env_file: Option<PathBuf>,

    /// Filesystem locations
    pub paths: PathsConfig,

    /// Telegram Bot API access
    pub telegram: TelegramConfig,

    /// Dashboard run trigger
    pub dashboard: DashboardConfig,

    /// Background notifier
    pub notifier: NotifierConfig,
}

impl Config {
    /// Validate configuration before starting the bot
    ///
    /// Checks that the bot token variable is set, so a misconfigured deploy
    /// fails at startup instead of on the first poll.
    pub fn validate_bot(&self) -> Result<()> {
        let token = std::env::var(&self.telegram.token_env).unwrap_or_default();
        if token.trim().is_empty() {
            return Err(eyre::eyre!(
                "Telegram bot token not found. Set the {} environment variable.",
                self.telegram.token_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .factorybot.yml
        let local_config = PathBuf::from(".factorybot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/factorybot/factorybot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("factorybot").join("factorybot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir().map(|home| home.join(rest)).unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("factorybot"))
        .unwrap_or_else(|| PathBuf::from(".factorybot"))
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one subdirectory per project
    #[serde(rename = "projects-root")]
    pub projects_root: PathBuf,

    /// Registry document (chats, watch table, notification marks)
    #[serde(rename = "state-file")]
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            projects_root: data.join("projects"),
            state_file: data.join("state.json"),
        }
    }
}

impl PathsConfig {
    pub fn projects_root(&self) -> PathBuf {
        expand_home(&self.projects_root)
    }

    pub fn state_file(&self) -> PathBuf {
        expand_home(&self.state_file)
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// API base URL
    #[serde(rename = "api-base")]
    pub api_base: String,

    /// Server-side wait of one getUpdates call, in seconds
    #[serde(rename = "long-poll-secs")]
    pub long_poll_secs: u64,

    /// Request timeout in milliseconds; must exceed the long poll
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            long_poll_secs: 30,
            timeout_ms: 45_000,
        }
    }
}

impl TelegramConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the basic-auth user
    #[serde(rename = "user-env")]
    pub user_env: String,

    /// Environment variable containing the basic-auth password
    #[serde(rename = "pass-env")]
    pub pass_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5680".to_string(),
            user_env: "DASHBOARD_USER".to_string(),
            pass_env: "DASHBOARD_PASS".to_string(),
            timeout_ms: 25_000,
        }
    }
}

impl DashboardConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.log_level.is_none());
        assert!(config.env_file.is_none());
        assert_eq!(config.telegram.token_env, "TELEGRAM_BOT_TOKEN");
        assert_eq!(config.telegram.long_poll_secs, 30);
        assert_eq!(config.dashboard.base_url, "http://127.0.0.1:5680");
        assert_eq!(config.dashboard.timeout(), Duration::from_secs(25));
        assert_eq!(config.notifier.poll_interval_secs, 60);
        assert!(config.paths.state_file.ends_with("state.json"));
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: DEBUG
env-file: /srv/ai-software-factory/.env

paths:
  projects-root: /srv/ai-software-factory/projects
  state-file: /srv/ai-software-factory/telegram_bot/state.json

telegram:
  token-env: MY_BOT_TOKEN
  api-base: http://localhost:8081
  long-poll-secs: 10
  timeout-ms: 20000

dashboard:
  base-url: http://dashboard:5680
  user-env: DASH_U
  pass-env: DASH_P
  timeout-ms: 5000

notifier:
  poll-interval-secs: 15
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
        assert_eq!(config.env_file, Some(PathBuf::from("/srv/ai-software-factory/.env")));
        assert_eq!(
            config.paths.projects_root(),
            PathBuf::from("/srv/ai-software-factory/projects")
        );
        assert_eq!(config.telegram.token_env, "MY_BOT_TOKEN");
        assert_eq!(config.telegram.api_base, "http://localhost:8081");
        assert_eq!(config.telegram.timeout(), Duration::from_secs(20));
        assert_eq!(config.dashboard.user_env, "DASH_U");
        assert_eq!(config.dashboard.timeout_ms, 5000);
        assert_eq!(config.notifier.poll_interval_secs, 15);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
telegram:
  long-poll-secs: 5
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        // Specified value
        assert_eq!(config.telegram.long_poll_secs, 5);

        // Defaults for unspecified
        assert_eq!(config.telegram.token_env, "TELEGRAM_BOT_TOKEN");
        assert_eq!(config.telegram.timeout_ms, 45_000);
        assert_eq!(config.dashboard.pass_env, "DASHBOARD_PASS");
        assert_eq!(config.notifier.poll_interval_secs, 60);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fb.yml");
        fs::write(&path, "paths:\n  projects-root: /tmp/projects\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.paths.projects_root, PathBuf::from("/tmp/projects"));
    }

    #[test]
    fn test_load_explicit_path_missing_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nope.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_invalid_yaml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fb.yml");
        fs::write(&path, "telegram: [unclosed").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_expand_home() {
        let plain = PathBuf::from("/var/lib/factorybot/state.json");
        assert_eq!(expand_home(&plain), plain);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/factory/projects")),
                home.join("factory").join("projects")
            );
        }
    }

    #[test]
    fn test_validate_bot_missing_token() {
        let mut config = Config::default();
        config.telegram.token_env = "FACTORYBOT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string();

        let err = config.validate_bot().unwrap_err();
        assert!(err.to_string().contains("FACTORYBOT_TEST_TOKEN_THAT_IS_NEVER_SET"));
    }
}

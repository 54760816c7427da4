//! Bot configuration loaded from a TOML file (default `corral.toml`).

use serde::Deserialize;
use std::path::Path;

/// Top-level bot configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Health monitor cadence (seconds).
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,

    /// Metrics live-view refresh cadence (seconds).
    #[serde(default = "default_metrics_refresh")]
    pub metrics_refresh_secs: u64,

    /// Log live-view refresh cadence (seconds).
    #[serde(default = "default_logs_refresh")]
    pub logs_refresh_secs: u64,

    /// How many log lines to show in the log view.
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,

    /// Docker binary to shell out to.
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,

    /// User IDs allowed to interact with the bot. Empty = allow all users.
    #[serde(default)]
    pub allowed_user_ids: Vec<i64>,

    /// Chat IDs the bot will respond in. Empty = allow all chats.
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,

    /// Telegram bot configuration.
    pub telegram: TelegramConfig,
}

/// Telegram-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather.
    pub bot_token: String,

    /// Chat ID where health alerts are sent.
    pub alert_chat_id: i64,
}

fn default_monitor_interval() -> u64 {
    60
}

fn default_metrics_refresh() -> u64 {
    5
}

fn default_logs_refresh() -> u64 {
    10
}

fn default_log_lines() -> usize {
    20
}

fn default_docker_bin() -> String {
    "docker".into()
}

impl BotConfig {
    /// Load config from the given path. Missing wiring is fatal at startup.
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                color_eyre::eyre::eyre!(
                    "No config found at {}\n\n\
                     To set up the bot:\n\
                     1. Message @BotFather on Telegram → /newbot\n\
                     2. Create {} with:\n\n\
                     [telegram]\n\
                     bot_token = \"your-token-here\"\n\
                     alert_chat_id = 123456789\n",
                    path.display(),
                    path.display()
                )
            } else {
                color_eyre::eyre::eyre!("failed to read {}: {e}", path.display())
            }
        })?;
        let config: BotConfig = toml::from_str(&content)
            .map_err(|e| color_eyre::eyre::eyre!("failed to parse {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Check if a chat ID is allowed.
    pub fn is_chat_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.is_empty() || self.allowed_chat_ids.contains(&chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
monitor_interval_secs = 30
metrics_refresh_secs = 2
logs_refresh_secs = 15
log_lines = 40
docker_bin = "/usr/local/bin/docker"
allowed_user_ids = [111, 222]
allowed_chat_ids = [-100111]

[telegram]
bot_token = "7000000000:AAxxxxxxxxxxxxxxxxx"
alert_chat_id = 123456789
"#;
        let config: BotConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.monitor_interval_secs, 30);
        assert_eq!(config.metrics_refresh_secs, 2);
        assert_eq!(config.logs_refresh_secs, 15);
        assert_eq!(config.log_lines, 40);
        assert_eq!(config.docker_bin, "/usr/local/bin/docker");
        assert_eq!(config.allowed_user_ids, vec![111, 222]);
        assert_eq!(config.telegram.alert_chat_id, 123456789);
    }

    #[test]
    fn parse_minimal_config_uses_defaults() {
        let toml = r#"
[telegram]
bot_token = "tok"
alert_chat_id = 42
"#;
        let config: BotConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.monitor_interval_secs, 60);
        assert_eq!(config.metrics_refresh_secs, 5);
        assert_eq!(config.logs_refresh_secs, 10);
        assert_eq!(config.log_lines, 20);
        assert_eq!(config.docker_bin, "docker");
        assert!(config.allowed_user_ids.is_empty());
        assert!(config.is_chat_allowed(-100123));
    }

    #[test]
    fn chat_allowlist_restricts() {
        let config: BotConfig = toml::from_str(
            r#"
allowed_chat_ids = [-100111]
[telegram]
bot_token = "tok"
alert_chat_id = 42
"#,
        )
        .unwrap();
        assert!(config.is_chat_allowed(-100111));
        assert!(!config.is_chat_allowed(-100222));
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<BotConfig, _> = toml::from_str(
            r#"
bogus_field = true
[telegram]
bot_token = "tok"
alert_chat_id = 42
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_file_and_hints_on_missing_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corral.toml");
        std::fs::write(&path, "[telegram]\nbot_token = \"tok\"\nalert_chat_id = 42\n").unwrap();
        let config = BotConfig::load(&path).unwrap();
        assert_eq!(config.telegram.alert_chat_id, 42);

        let err = BotConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("BotFather"));
    }

    #[test]
    fn missing_telegram_section_is_an_error() {
        let result: Result<BotConfig, _> = toml::from_str("monitor_interval_secs = 60");
        assert!(result.is_err());
    }
}

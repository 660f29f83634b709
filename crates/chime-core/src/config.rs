use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ChimeError, Result};

/// Top-level config (chime.toml + CHIME_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChimeConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    /// IANA timezone applied to all "now" computations and to display
    /// formatting. One fixed zone for the whole process.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// strftime pattern the front-end uses to parse and render reminder
    /// times, e.g. `31.12.2025 09:30`.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Who may talk to the bot. Deny-by-default: empty means nobody,
    /// `"*"` allows everyone. Entries are usernames (with or without `@`)
    /// or numeric Telegram user IDs.
    #[serde(default)]
    pub allow_users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            telegram: TelegramConfig {
                bot_token: String::new(),
                allow_users: Vec::new(),
            },
            database: DatabaseConfig::default(),
            timezone: default_timezone(),
            date_format: default_date_format(),
        }
    }
}

impl ChimeConfig {
    /// Load config from a TOML file with CHIME_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.chime/chime.toml
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: ChimeConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CHIME_").split("_"))
            .extract()
            .map_err(|e| ChimeError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Parse the configured timezone identifier.
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| ChimeError::InvalidTimezone(self.timezone.clone()))
    }
}

fn default_timezone() -> String {
    "Europe/Moscow".to_string()
}

fn default_date_format() -> String {
    "%d.%m.%Y %H:%M".to_string()
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chime/chime.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chime/chime.toml", home)
}

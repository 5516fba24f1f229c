//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for the Matrix account, the reviewer allow-list, dialog limits
//! and the restart budget.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub services: ServicesConfig,
    pub reviewers: Vec<ReviewerConfig>,
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

/// Configuration for various connected services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServicesConfig {
    pub matrix: MatrixConfig,
}

/// Specific configuration for the Matrix service.
#[derive(Debug, Deserialize, Clone)]
pub struct MatrixConfig {
    pub username: String,
    pub password: String,
    pub homeserver: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A reviewer: who may decide, and where their notifications go.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReviewerConfig {
    pub user_id: String,
    pub room_id: String,
}

/// Dialog limits.
#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationConfig {
    #[serde(default = "default_experience_max_chars")]
    pub experience_max_chars: usize,
    #[serde(default = "default_motivation_max_chars")]
    pub motivation_max_chars: usize,
    #[serde(default = "default_max_hours")]
    pub max_hours: f64,
    /// Idle sessions older than this are expired. Disabled when unset.
    #[serde(default)]
    pub session_timeout_minutes: Option<u64>,
    #[serde(default = "default_intake_open")]
    pub intake_open: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            experience_max_chars: default_experience_max_chars(),
            motivation_max_chars: default_motivation_max_chars(),
            max_hours: default_max_hours(),
            session_timeout_minutes: None,
            intake_open: default_intake_open(),
        }
    }
}

impl ApplicationConfig {
    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_minutes
            .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }
}

fn default_experience_max_chars() -> usize {
    200
}
fn default_motivation_max_chars() -> usize {
    500
}
fn default_max_hours() -> f64 {
    24.0
}
fn default_intake_open() -> bool {
    true
}

/// Restart budget and waits for the connection supervisor.
#[derive(Debug, Deserialize, Clone)]
pub struct SupervisorConfig {
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_conflict_cooldown_secs")]
    pub conflict_cooldown_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_restarts: default_max_restarts(),
            backoff_secs: default_backoff_secs(),
            conflict_cooldown_secs: default_conflict_cooldown_secs(),
        }
    }
}

fn default_max_restarts() -> u32 {
    5
}
fn default_backoff_secs() -> u64 {
    5
}
fn default_conflict_cooldown_secs() -> u64 {
    30
}

/// System-level settings for the bot.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl AppConfig {
    /// Reads and validates the YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context(crate::strings::logs::CONFIG_PARSE_ERROR)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reviewers.is_empty() {
            bail!("At least one reviewer must be configured");
        }
        if self.application.experience_max_chars == 0 || self.application.motivation_max_chars == 0
        {
            bail!("Field length caps must be greater than zero");
        }
        if !(self.application.max_hours > 0.0) {
            bail!("max_hours must be greater than zero");
        }
        if self.supervisor.max_restarts == 0 {
            bail!("max_restarts must be at least 1");
        }
        Ok(())
    }
}

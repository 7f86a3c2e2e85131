use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub herdbook: HerdbookConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

/// Herdbook-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HerdbookConfig {
    /// Path to the SQLite database holding the herd and its pedigree.
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Report tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Generations searched for a shared ancestor when screening a mating
    /// for inbreeding. This bounds the common-ancestor check, it is not a
    /// relatedness coefficient.
    #[serde(default = "default_inbreeding_generations")]
    pub inbreeding_generations: usize,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            inbreeding_generations: default_inbreeding_generations(),
        }
    }
}

fn default_inbreeding_generations() -> usize {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in HERDBOOK_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("HERDBOOK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        // The database file itself may not exist yet (migrations create it),
        // but its parent directory must.
        if let Some(parent) = self.herdbook.db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                anyhow::bail!(
                    "db_path directory does not exist: {}. Create it or point db_path elsewhere in config.toml.",
                    parent.display()
                );
            }
        }

        if self.reports.inbreeding_generations == 0 {
            anyhow::bail!("reports.inbreeding_generations must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.herdbook.db_path
    }

    /// Inbreeding screening depth in generations
    pub fn inbreeding_generations(&self) -> usize {
        self.reports.inbreeding_generations
    }
}

//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::section::SectionConfig;

/// Main psec configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when none is given on the command line
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Concurrency and dispatch policy
    pub section: SectionConfig,

    /// Shell that runs job commands (invoked as `<shell> -c <command>`)
    pub shell: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            section: SectionConfig::default(),
            shell: "sh".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain: an explicit path must load,
    /// otherwise the first readable candidate wins, otherwise defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidate_paths() {
            if !candidate.exists() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Failed to load config from {}: {:#}", candidate.display(), e),
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Implicit config locations, highest priority first:
    /// `~/.config/psec/psec.yml`, then `./psec.yml`
    pub fn candidate_paths() -> Vec<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("psec").join("psec.yml"))
            .into_iter()
            .chain([PathBuf::from("psec.yml")])
            .collect()
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::debug!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }
}

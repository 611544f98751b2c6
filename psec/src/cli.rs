//! CLI argument parsing for psec

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "psec")]
#[command(author, version, about = "Run shell jobs with bounded concurrency and group-fair dispatch", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every job in a job file
    Run {
        /// Job file (YAML)
        #[arg(required = true)]
        jobs: PathBuf,

        /// Max jobs running at once (default: from config)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the order jobs would start in when run one at a time
    Plan {
        /// Job file (YAML)
        #[arg(required = true)]
        jobs: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Dispatch policy overrides
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Spread dispatch across groups
    #[arg(long, conflicts_with = "no_fair")]
    pub fair: bool,

    /// Dispatch strictly in file order
    #[arg(long)]
    pub no_fair: bool,
}

impl PolicyArgs {
    /// Fairness override, or None to keep the configured value
    pub fn fairness(&self) -> Option<bool> {
        match (self.fair, self.no_fair) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Output format for run and plan results
#[derive(Clone, Debug, Default, PartialEq, Eq)]
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
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
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

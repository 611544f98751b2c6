//! psec - run shell jobs through a parallel section
//!
//! CLI entry point for running and planning job files.

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use parallel_section::cli::{Cli, Command, OutputFormat, PolicyArgs};
use parallel_section::config::Config;
use parallel_section::jobs::{JobFile, JobRunner, RunSummary, plan_order};
use parallel_section::section::SectionConfig;

/// Priority: CLI --log-level > config file > default (INFO)
fn log_level(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> tracing::Level {
    match cli_log_level.or(config_log_level) {
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
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let level = log_level(cli_log_level, config_log_level);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn section_config(config: &Config, concurrency: Option<usize>, policy: &PolicyArgs) -> SectionConfig {
    SectionConfig {
        concurrency_limit: concurrency.unwrap_or(config.section.concurrency_limit),
        fairness_across_groups: policy.fairness().unwrap_or(config.section.fairness_across_groups),
    }
}

fn print_summary(summary: &RunSummary) {
    for key in &summary.report.completed {
        match summary.report.failure(key) {
            Some(failure) => println!("{} {} {}", "✗".red(), key, failure.message.dimmed()),
            None => println!("{} {}", "✓".green(), key),
        }
    }
    if summary.skipped > 0 {
        println!("{} {} duplicate job(s) skipped", "!".yellow(), summary.skipped);
    }
    println!(
        "{} of {} job(s) succeeded",
        summary.report.completed.len() - summary.report.failures.len(),
        summary.admitted
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;
    debug!(?cli, ?config, "main: parsed arguments and config");

    match cli.command {
        Command::Run {
            jobs,
            concurrency,
            policy,
            format,
        } => {
            let file = JobFile::load(&jobs)?;
            let runner = JobRunner::new(section_config(&config, concurrency, &policy), config.shell.clone());
            let summary = runner.run(file.jobs).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => print_summary(&summary),
            }

            if !summary.report.is_success() {
                return Err(eyre!("{} job(s) failed", summary.report.failures.len()));
            }
        }
        Command::Plan { jobs, policy, format } => {
            let file = JobFile::load(&jobs)?;
            let fairness = section_config(&config, None, &policy).fairness_across_groups;
            let order = plan_order(file.jobs, fairness).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&order)?),
                OutputFormat::Text => {
                    for (position, job) in order.iter().enumerate() {
                        println!("{:>3}. {} {}", position + 1, job.key.cyan(), format!("[{}]", job.group).dimmed());
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_defaults_to_info() {
        assert_eq!(log_level(None, None), tracing::Level::INFO);
        assert_eq!(log_level(None, Some("bogus")), tracing::Level::INFO);
    }

    #[test]
    fn test_log_level_cli_overrides_config() {
        assert_eq!(log_level(Some("debug"), Some("error")), tracing::Level::DEBUG);
        assert_eq!(log_level(None, Some("warning")), tracing::Level::WARN);
    }
}

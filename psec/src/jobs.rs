//! Shell jobs run through a parallel section
//!
//! A job file lists commands, each with a unique key and a group:
//!
//! ```yaml
//! jobs:
//!   - key: fetch-a
//!     group: github
//!     command: "curl -s https://example.com/a"
//!   - key: migrate
//!     group: db
//!     command: "./migrate.sh"
//!     lock: database
//! ```
//!
//! Jobs naming the same `lock` never run at the same time.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::named_locks::NamedLocks;
use crate::section::{DrainReport, ParallelSection, RunnableItem, SectionConfig};

/// A single shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub key: String,

    #[serde(default)]
    pub group: String,

    pub command: String,

    /// Jobs sharing a lock name are serialized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<String>,
}

/// Contents of a job file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

impl JobFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(format!("Failed to read job file {}", path.display()))?;
        Self::from_yaml(&content).context(format!("Failed to parse job file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: Self = serde_yaml::from_str(content)?;
        Ok(file)
    }
}

/// Outcome of a job run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub admitted: usize,
    pub skipped: usize,
    pub report: DrainReport,
}

/// Runs jobs as shell commands with the configured section policy
pub struct JobRunner {
    section_config: SectionConfig,
    shell: String,
    locks: Arc<NamedLocks>,
}

impl JobRunner {
    pub fn new(section_config: SectionConfig, shell: impl Into<String>) -> Self {
        Self {
            section_config,
            shell: shell.into(),
            locks: Arc::new(NamedLocks::new()),
        }
    }

    /// Run every job and wait for all of them
    pub async fn run(&self, jobs: Vec<Job>) -> Result<RunSummary> {
        debug!(count = jobs.len(), ?self.section_config, "JobRunner::run: called");
        let section = ParallelSection::from_config(&self.section_config)?;
        section.open().await;

        let total = jobs.len();
        let items = jobs.into_iter().map(|job| self.job_item(job)).collect();
        let admitted = section.admit(items).await;

        let report = section.drain().await?;
        info!(admitted, failed = report.failures.len(), "Jobs finished");

        Ok(RunSummary {
            admitted,
            skipped: total - admitted,
            report,
        })
    }

    fn job_item(&self, job: Job) -> RunnableItem<Job> {
        let shell = self.shell.clone();
        let command = job.command.clone();
        let lock = job.lock.clone();
        let locks = self.locks.clone();
        let key = job.key.clone();

        let started_key = key.clone();
        let started_group = job.group.clone();

        RunnableItem::new(job.key.clone(), job.group.clone(), job, async move {
            let _guard = match &lock {
                Some(name) => Some(locks.lock(name).await),
                None => None,
            };
            run_command(&shell, &command).await.context(format!("Job {} failed", key))
        })
        .on_started(async move {
            info!(key = %started_key, group = %started_group, "Job started");
        })
    }
}

async fn run_command(shell: &str, command: &str) -> Result<()> {
    debug!(%shell, %command, "run_command: called");
    let status = Command::new(shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .status()
        .await
        .context(format!("Failed to spawn {}", shell))?;

    if !status.success() {
        return Err(eyre!("Command `{}` exited with {}", command, status));
    }
    Ok(())
}

/// Order in which the jobs would start when run one at a time
pub async fn plan_order(jobs: Vec<Job>, fairness_across_groups: bool) -> Result<Vec<Job>> {
    debug!(count = jobs.len(), fairness_across_groups, "plan_order: called");
    let section = ParallelSection::new(1, fairness_across_groups)?;
    section.open().await;

    let order = Arc::new(Mutex::new(Vec::with_capacity(jobs.len())));
    let items = jobs
        .into_iter()
        .map(|job| {
            let order = order.clone();
            let started = job.clone();
            RunnableItem::new(job.key.clone(), job.group.clone(), job, async { Ok(()) })
                .on_started(async move { order.lock().await.push(started) })
        })
        .collect();

    section.admit(items).await;
    section.drain().await?;

    let order = std::mem::take(&mut *order.lock().await);
    Ok(order)
}

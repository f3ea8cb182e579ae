//! Concurrent independent runs
//!
//! Jobs share the tool registry and the model adapter. Each one gets its
//! own conversation and its own working directory, so two jobs pointing at
//! the same directory are refused before anything starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::agent::loop_state::{AbortReason, RunOutcome, RunReport};
use crate::agent::orchestrator::Orchestrator;
use crate::agent::Conversation;
use crate::core::{Result, ScribeError};

/// One task bound to its own working directory
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub name: String,
    pub task: String,
    pub working_dir: PathBuf,
}

impl BatchJob {
    pub fn new(
        name: impl Into<String>,
        task: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            task: task.into(),
            working_dir: working_dir.into(),
        }
    }
}

/// Runs many jobs at once from one template orchestrator
pub struct BatchRunner {
    template: Orchestrator,
}

impl BatchRunner {
    pub fn new(template: Orchestrator) -> Self {
        Self { template }
    }

    /// Run every job concurrently; reports come back in job order
    ///
    /// Cancelling `cancel` stops all jobs between steps.
    pub async fn run_all(
        &self,
        jobs: Vec<BatchJob>,
        cancel: &CancellationToken,
    ) -> Result<Vec<(String, RunReport)>> {
        check_distinct_dirs(&jobs)?;
        tracing::info!(jobs = jobs.len(), "Starting batch");

        let mut set = JoinSet::new();
        let names: Vec<String> = jobs.iter().map(|j| j.name.clone()).collect();

        for (index, job) in jobs.into_iter().enumerate() {
            let sandbox = self.template.sandbox().clone().with_working_dir(&job.working_dir);
            let orchestrator = self.template.clone().with_sandbox(sandbox);
            let token = cancel.child_token();

            set.spawn(async move {
                tracing::debug!(job = %job.name, "Job started");
                let report = orchestrator.run(&job.task, &token).await;
                (index, report)
            });
        }

        let mut reports: Vec<Option<RunReport>> = names.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => tracing::error!(error = %e, "Batch job panicked"),
            }
        }

        Ok(names
            .into_iter()
            .zip(reports)
            .map(|(name, report)| {
                let report = report.unwrap_or_else(|| {
                    RunReport::new(
                        RunOutcome::Aborted(AbortReason::Internal("job panicked".into())),
                        0,
                        Conversation::new(),
                    )
                });
                (name, report)
            })
            .collect())
    }
}

/// Refuse jobs that would share a working directory
fn check_distinct_dirs(jobs: &[BatchJob]) -> Result<()> {
    let mut seen: HashMap<PathBuf, &str> = HashMap::new();
    for job in jobs {
        let key = normalize(&job.working_dir);
        if let Some(other) = seen.insert(key, &job.name) {
            return Err(ScribeError::config(format!(
                "jobs '{}' and '{}' share the working directory {}",
                other,
                job.name,
                job.working_dir.display()
            )));
        }
    }
    Ok(())
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

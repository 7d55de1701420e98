//! The merge job.
//!
//! Steps run strictly in order; the first failure halts the job. Provisioning
//! steps of the hosted runner (fonts, interpreter, packages) have no
//! counterpart here.

use std::path::Path;

use serde::Serialize;
use tracing::{error, info};

use crate::config::JobConfig;
use crate::error::{ChartError, Result};
use crate::insights::{self, InsightsReport};
use crate::loader;
use crate::merger::{ChartMerger, MergeReport};
use crate::publish::{GitRunner, PublishOutcome, Publisher, SystemGit};
use crate::trigger::{self, TriggerEvent};

/// A job step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Log the working tree and the inputs.
    Environment,
    /// Merge chart exports and write analyses.
    Merge,
    /// Write insight summaries.
    Insights,
    /// Commit and push the outputs.
    Publish,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Merge => write!(f, "merge"),
            Self::Insights => write!(f, "insights"),
            Self::Publish => write!(f, "publish"),
        }
    }
}

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step ran and succeeded.
    Succeeded,
    /// The step was disabled.
    Skipped,
}

/// Record of one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    /// Which step.
    pub step: Step,
    /// How it ended.
    pub status: StepStatus,
    /// Short human-readable summary.
    pub message: String,
}

/// Result of a job run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    /// Whether the trigger matched.
    pub triggered: bool,
    /// Executed steps in order.
    pub steps: Vec<StepOutcome>,
    /// Merge result, if the merge ran.
    pub merge: Option<MergeReport>,
    /// Insights result, if insights ran.
    pub insights: Option<InsightsReport>,
    /// Publish result, if publishing ran.
    pub publish: Option<PublishOutcome>,
}

impl JobReport {
    /// Steps in execution order.
    pub fn executed(&self) -> Vec<Step> {
        self.steps.iter().map(|s| s.step).collect()
    }

    fn record<S: Into<String>>(&mut self, step: Step, status: StepStatus, message: S) {
        let message = message.into();
        info!("[{}] {}", step, message);
        self.steps.push(StepOutcome {
            step,
            status,
            message,
        });
    }
}

/// The merge job: trigger check, then environment, merge, insights, publish.
#[derive(Debug)]
pub struct MergeJob<R = SystemGit> {
    config: JobConfig,
    publisher: Publisher<R>,
}

impl MergeJob<SystemGit> {
    /// Create a job that publishes with the system git.
    pub fn new(config: JobConfig) -> Result<Self> {
        Self::with_runner(config, SystemGit)
    }
}

impl<R: GitRunner> MergeJob<R> {
    /// Create a job with a custom git runner.
    pub fn with_runner(config: JobConfig, runner: R) -> Result<Self> {
        config.validate()?;
        let publisher = Publisher::with_runner(config.publish.clone(), &config.repo_dir, runner);
        Ok(Self { config, publisher })
    }

    /// Get the job configuration.
    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Get the publisher.
    pub fn publisher(&self) -> &Publisher<R> {
        &self.publisher
    }

    /// Get a mutable reference to the publisher, e.g. to set a token.
    pub fn publisher_mut(&mut self) -> &mut Publisher<R> {
        &mut self.publisher
    }

    /// Build the merger for this job's folders.
    pub fn merger(&self) -> ChartMerger {
        let paths = &self.config.paths;
        let mut merger = ChartMerger::new(self.config.resolve(&paths.input));
        merger.set_intermediate_dir(self.config.resolve(&paths.intermediate));
        merger.set_final_dir(self.config.resolve(&paths.final_dir));
        merger.set_strict(self.config.merge.strict);
        merger
    }

    /// Run the job for `event`.
    ///
    /// Returns an untriggered report without running anything when the
    /// event does not match the configured path filters.
    pub async fn run(&self, event: &TriggerEvent) -> Result<JobReport> {
        let mut report = JobReport::default();

        let filter = self.config.trigger.filter()?;
        if !trigger::should_run(event, &filter) {
            info!("No changed path matches the trigger filters; nothing to do");
            return Ok(report);
        }
        report.triggered = true;

        if let Err(e) = self.run_steps(&mut report).await {
            error!(
                "Job failed after {} step(s) [{}]: {}",
                report.steps.len(),
                report
                    .executed()
                    .iter()
                    .map(Step::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                e
            );
            return Err(e);
        }
        Ok(report)
    }

    async fn run_steps(&self, report: &mut JobReport) -> Result<()> {
        let message = self.environment()?;
        report.record(Step::Environment, StepStatus::Succeeded, message);

        let merger = self.merger();
        let merged = tokio::task::spawn_blocking(move || merger.run())
            .await
            .map_err(std::io::Error::other)??;
        report.record(
            Step::Merge,
            StepStatus::Succeeded,
            format!(
                "merged {} files into {} countries",
                merged.total_files(),
                merged.countries.len()
            ),
        );
        report.merge = Some(merged);

        if self.config.insights.enabled {
            let final_dir = self.config.resolve(&self.config.paths.final_dir);
            let insights_dir = self.config.resolve(&self.config.paths.insights);
            let generated =
                tokio::task::spawn_blocking(move || insights::generate(final_dir, insights_dir))
                    .await
                    .map_err(std::io::Error::other)??;
            report.record(
                Step::Insights,
                StepStatus::Succeeded,
                format!("{} sections", generated.sections.len()),
            );
            report.insights = Some(generated);
        }

        let outcome = self.publisher.publish().await?;
        let (status, message) = match &outcome {
            PublishOutcome::Committed { commit, branch } => {
                (StepStatus::Succeeded, format!("pushed {commit} to {branch}"))
            }
            PublishOutcome::NothingToCommit => {
                (StepStatus::Succeeded, "no changes to commit".to_string())
            }
            PublishOutcome::Skipped => (StepStatus::Skipped, "publishing disabled".to_string()),
        };
        report.record(Step::Publish, status, message);
        report.publish = Some(outcome);

        Ok(())
    }

    fn environment(&self) -> Result<String> {
        let repo_dir: &Path = &self.config.repo_dir;
        if !repo_dir.as_os_str().is_empty() && !repo_dir.is_dir() {
            return Err(ChartError::Config(format!(
                "repository directory {} does not exist",
                repo_dir.display()
            )));
        }

        let input = self.config.resolve(&self.config.paths.input);
        let files = loader::discover_csv_files(&input);
        for file in &files {
            tracing::debug!("input: {}", file.display());
        }
        Ok(format!("{} CSV files in {}", files.len(), input.display()))
    }
}

//! Commit and push of merge results.
//!
//! Mirrors the last step of the merge job: stage the output folders, commit
//! them with a fixed message, and push to the target branch. An empty index
//! is not an error; the step then succeeds without a commit.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PublishConfig;
use crate::error::{ChartError, Result};

/// Output of one git invocation.
#[derive(Debug, Clone, Default)]
pub struct GitOutput {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl GitOutput {
    /// Whether git exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs git commands in a working tree.
#[async_trait]
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` inside `repo_dir`.
    async fn git(&self, repo_dir: &Path, args: &[String]) -> Result<GitOutput>;
}

/// Runs the `git` executable found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemGit;

#[async_trait]
impl GitRunner for SystemGit {
    async fn git(&self, repo_dir: &Path, args: &[String]) -> Result<GitOutput> {
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .await?;

        Ok(GitOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Result of a publish step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    /// A commit was created and pushed.
    Committed {
        /// Commit hash.
        commit: String,
        /// Branch pushed to.
        branch: String,
    },
    /// Nothing was staged; no commit was made.
    NothingToCommit,
    /// Publishing is disabled.
    Skipped,
}

/// Stages, commits and pushes the configured output paths.
#[derive(Debug)]
pub struct Publisher<R = SystemGit> {
    config: PublishConfig,
    repo_dir: PathBuf,
    runner: R,
    token: Option<String>,
}

impl Publisher<SystemGit> {
    /// Create a publisher using the system git.
    pub fn new<P: AsRef<Path>>(config: PublishConfig, repo_dir: P) -> Self {
        Self::with_runner(config, repo_dir, SystemGit)
    }
}

impl<R: GitRunner> Publisher<R> {
    /// Create a publisher with a custom git runner.
    pub fn with_runner<P: AsRef<Path>>(config: PublishConfig, repo_dir: P, runner: R) -> Self {
        Self {
            config,
            repo_dir: repo_dir.as_ref().to_path_buf(),
            runner,
            token: None,
        }
    }

    /// Use this token instead of reading `token_env`.
    pub fn set_token<S: Into<String>>(&mut self, token: S) {
        self.token = Some(token.into());
    }

    /// Get the publish configuration.
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Get the git runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Commit and push the output paths.
    ///
    /// # Errors
    ///
    /// Returns `MissingToken` when there is something to commit, a push URL
    /// template is configured and the token variable is unset, and `Git` when identity setup, commit, or
    /// push fails. A failing `git add` is logged and ignored.
    pub async fn publish(&self) -> Result<PublishOutcome> {
        if !self.config.enabled {
            info!("Publishing disabled");
            return Ok(PublishOutcome::Skipped);
        }

        let scrub = |text: &str| redact(text, self.token.as_deref());

        self.run_checked(&["config", "user.name", self.config.user_name.as_str()], &scrub)
            .await?;
        self.run_checked(&["config", "user.email", self.config.user_email.as_str()], &scrub)
            .await?;

        let mut add: Vec<String> = vec!["add".into(), "--".into()];
        add.extend(
            self.config
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );
        let added = self.run(&add).await?;
        if !added.success() {
            warn!("No files to add: {}", scrub(added.stderr.trim()));
        }

        let diff = self.run(&args(&["diff", "--cached", "--quiet"])).await?;
        match diff.code {
            Some(0) => {
                info!("No changes to commit");
                return Ok(PublishOutcome::NothingToCommit);
            }
            Some(1) => {}
            _ => {
                return Err(ChartError::Git(format!(
                    "git diff failed: {}",
                    scrub(diff.stderr.trim())
                )))
            }
        }

        let token = self.token()?;
        let scrub = |text: &str| redact(text, token.as_deref());

        self.run_checked(&["commit", "-m", self.config.message.as_str()], &scrub)
            .await?;
        let commit = self
            .run_checked(&["rev-parse", "HEAD"], &scrub)
            .await?
            .stdout
            .trim()
            .to_string();

        let remote = self.push_target(token.as_deref());
        let refspec = format!("HEAD:{}", self.config.branch);
        self.run_checked(&["push", remote.as_str(), refspec.as_str()], &scrub)
            .await?;

        info!("Pushed {} to {}", commit, self.config.branch);
        Ok(PublishOutcome::Committed {
            commit,
            branch: self.config.branch.clone(),
        })
    }

    fn token(&self) -> Result<Option<String>> {
        if self.config.remote_url.is_none() {
            return Ok(self.token.clone());
        }
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match std::env::var(&self.config.token_env) {
            Ok(token) if !token.is_empty() => Ok(Some(token)),
            _ => Err(ChartError::MissingToken(self.config.token_env.clone())),
        }
    }

    fn push_target(&self, token: Option<&str>) -> String {
        match (&self.config.remote_url, token) {
            (Some(template), Some(token)) => template.replace("{token}", token),
            (None, Some(_)) => {
                debug!(
                    "No publish.remote_url template; pushing to {} and ignoring the token",
                    self.config.remote
                );
                self.config.remote.clone()
            }
            _ => self.config.remote.clone(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<GitOutput> {
        self.runner.git(&self.repo_dir, args).await
    }

    async fn run_checked(
        &self,
        command: &[&str],
        scrub: &(dyn Fn(&str) -> String + Sync),
    ) -> Result<GitOutput> {
        let command = args(command);
        debug!("git {}", scrub(&command.join(" ")));

        let output = self.run(&command).await?;
        if !output.success() {
            return Err(ChartError::Git(format!(
                "git {} failed: {}",
                command.first().map(String::as_str).unwrap_or_default(),
                scrub(output.stderr.trim())
            )));
        }
        Ok(output)
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Replace every occurrence of `token` in `text`.
pub fn redact(text: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => text.replace(token, "***"),
        _ => text.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeGit;
    use super::*;
    use crate::config::DEFAULT_COMMIT_MESSAGE;

    fn publisher(git: FakeGit) -> Publisher<FakeGit> {
        Publisher::with_runner(PublishConfig::default(), "/repo", git)
    }

    #[tokio::test]
    async fn test_nothing_to_commit_succeeds_without_commit() {
        let p = publisher(FakeGit::default());
        let outcome = p.publish().await.unwrap();

        assert_eq!(outcome, PublishOutcome::NothingToCommit);
        assert_eq!(p.runner().subcommands(), vec!["config", "config", "add", "diff"]);
    }

    #[tokio::test]
    async fn test_changes_create_one_commit_and_push() {
        let p = publisher(FakeGit::with_changes());
        let outcome = p.publish().await.unwrap();

        assert_eq!(
            outcome,
            PublishOutcome::Committed {
                commit: "0123abcd".into(),
                branch: "main".into()
            }
        );
        let subs = p.runner().subcommands();
        assert_eq!(subs.iter().filter(|s| *s == "commit").count(), 1);
        assert_eq!(
            p.runner().call("commit").unwrap(),
            vec!["commit", "-m", DEFAULT_COMMIT_MESSAGE]
        );
        assert_eq!(
            p.runner().call("push").unwrap(),
            vec!["push", "origin", "HEAD:main"]
        );
        assert_eq!(
            p.runner().call("add").unwrap(),
            vec!["add", "--", "country_data", "final_data"]
        );
    }

    #[tokio::test]
    async fn test_failed_add_is_swallowed() {
        let git = FakeGit {
            fail_on: Some("add"),
            ..Default::default()
        };
        let outcome = publisher(git).publish().await.unwrap();
        assert_eq!(outcome, PublishOutcome::NothingToCommit);
    }

    #[tokio::test]
    async fn test_push_failure_is_an_error_and_token_is_redacted() {
        let config = PublishConfig {
            remote_url: Some("https://{token}@github.com/me/charts.git".into()),
            ..Default::default()
        };
        let git = FakeGit {
            staged: true,
            fail_on: Some("push"),
            ..Default::default()
        };
        let mut p = Publisher::with_runner(config, "/repo", git);
        p.set_token("s3cr3t");

        let err = p.publish().await.unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ChartError::Git(_)));
        assert!(!message.contains("s3cr3t"));
        assert!(message.contains("https://***@github.com/me/charts.git"));

        let push = p.runner().call("push").unwrap();
        assert_eq!(push[1], "https://s3cr3t@github.com/me/charts.git");
    }

    #[tokio::test]
    async fn test_missing_token() {
        let config = PublishConfig {
            remote_url: Some("https://{token}@github.com/me/charts.git".into()),
            token_env: "CHARTMERGE_TEST_UNSET_TOKEN".into(),
            ..Default::default()
        };
        let p = Publisher::with_runner(config, "/repo", FakeGit::with_changes());
        let err = p.publish().await.unwrap_err();
        assert!(matches!(err, ChartError::MissingToken(ref v) if v == "CHARTMERGE_TEST_UNSET_TOKEN"));
        assert_eq!(p.runner().subcommands(), vec!["config", "config", "add", "diff"]);
    }

    #[tokio::test]
    async fn test_missing_token_is_fine_without_changes() {
        let config = PublishConfig {
            remote_url: Some("https://{token}@github.com/me/charts.git".into()),
            token_env: "CHARTMERGE_TEST_UNSET_TOKEN_CLEAN".into(),
            ..Default::default()
        };
        let p = Publisher::with_runner(config, "/repo", FakeGit::default());
        let outcome = p.publish().await.unwrap();

        assert_eq!(outcome, PublishOutcome::NothingToCommit);
        assert!(p.runner().call("commit").is_none());
        assert!(p.runner().call("push").is_none());
    }

    #[tokio::test]
    async fn test_token_without_template_pushes_to_remote() {
        let mut p = publisher(FakeGit::with_changes());
        p.set_token("s3cr3t");
        p.publish().await.unwrap();

        assert_eq!(
            p.runner().call("push").unwrap(),
            vec!["push", "origin", "HEAD:main"]
        );
    }

    #[test]
    fn test_disabled_does_nothing() {
        let config = PublishConfig {
            enabled: false,
            ..Default::default()
        };
        let p = Publisher::with_runner(config, "/repo", FakeGit::with_changes());
        let outcome = tokio_test::block_on(p.publish()).unwrap();
        assert_eq!(outcome, PublishOutcome::Skipped);
        assert!(p.runner().subcommands().is_empty());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("https://abc@host", Some("abc")), "https://***@host");
        assert_eq!(redact("plain", None), "plain");
        assert_eq!(redact("plain", Some("")), "plain");
    }
}

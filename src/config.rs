//! Job configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an
//! empty or absent file describes the standard layout:
//!
//! ```toml
//! [paths]
//! input = "spotify_data"
//! intermediate = "country_data"
//! final = "final_data"
//!
//! [trigger]
//! paths = ["spotify_data/**/*.csv"]
//!
//! [publish]
//! branch = "main"
//! token_env = "GH_PAT"
//! remote_url = "https://{token}@github.com/owner/repo.git"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChartError, Result};
use crate::trigger::{PathFilter, DEFAULT_TRIGGER_PATH};

/// Config file looked up in the repository root.
pub const CONFIG_FILE: &str = "chartmerge.toml";

/// Commit message for published results.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Automated merge and upload of data files";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Working tree the job runs in.
    pub repo_dir: PathBuf,
    /// Input and output folders, relative to `repo_dir`.
    pub paths: PathsConfig,
    /// Merge behaviour.
    pub merge: MergeConfig,
    /// Insight summaries.
    pub insights: InsightsConfig,
    /// Trigger filters.
    pub trigger: TriggerConfig,
    /// Commit and push.
    pub publish: PublishConfig,
}

/// Folder layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Weekly chart exports.
    pub input: PathBuf,
    /// Per-country merged files.
    pub intermediate: PathBuf,
    /// Merged file and analyses.
    #[serde(rename = "final")]
    pub final_dir: PathBuf,
    /// Insight summaries.
    pub insights: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("spotify_data"),
            intermediate: PathBuf::from("country_data"),
            final_dir: PathBuf::from("final_data"),
            insights: PathBuf::from("insights"),
        }
    }
}

/// Merge behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Fail on the first unreadable input instead of skipping it.
    pub strict: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Insight summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Run the insights step after merging.
    pub enabled: bool,
}

/// Trigger filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Path globs that start the job on push.
    pub paths: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            paths: vec![DEFAULT_TRIGGER_PATH.to_string()],
        }
    }
}

impl TriggerConfig {
    /// Compile the configured globs.
    pub fn filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.paths)
    }
}

/// Commit and push settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Whether the job publishes at all.
    pub enabled: bool,
    /// Paths staged for the commit, relative to the repository.
    pub paths: Vec<PathBuf>,
    /// Commit message.
    pub message: String,
    /// Branch pushed to.
    pub branch: String,
    /// Remote name used when no `remote_url` is set.
    pub remote: String,
    /// Push URL template; `{token}` is replaced with the token.
    pub remote_url: Option<String>,
    /// Environment variable holding the push token.
    pub token_env: String,
    /// Commit author name.
    pub user_name: String,
    /// Commit author email.
    pub user_email: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            paths: vec![PathBuf::from("country_data"), PathBuf::from("final_data")],
            message: DEFAULT_COMMIT_MESSAGE.to_string(),
            branch: "main".to_string(),
            remote: "origin".to_string(),
            remote_url: None,
            token_env: "GH_PAT".to_string(),
            user_name: "github-actions[bot]".to_string(),
            user_email: "github-actions[bot]@users.noreply.github.com".to_string(),
        }
    }
}

impl JobConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: JobConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ChartError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml(&text)
    }

    /// Load `chartmerge.toml` from `repo_dir` if present, defaults otherwise.
    ///
    /// `repo_dir` always wins over a `repo_dir` set in the file.
    pub fn discover<P: AsRef<Path>>(repo_dir: P) -> Result<Self> {
        let repo_dir = repo_dir.as_ref();
        let path = repo_dir.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            Self::load(&path)?
        } else {
            Self::default()
        };
        config.repo_dir = repo_dir.to_path_buf();
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.publish.branch.trim().is_empty() {
            return Err(ChartError::Config("publish.branch must not be empty".into()));
        }
        if self.publish.message.trim().is_empty() {
            return Err(ChartError::Config("publish.message must not be empty".into()));
        }
        if let Some(url) = &self.publish.remote_url {
            if !url.contains("{token}") {
                return Err(ChartError::Config(
                    "publish.remote_url must contain a {token} placeholder".into(),
                ));
            }
        }
        self.trigger.filter()?;
        Ok(())
    }

    /// Resolve a configured path against `repo_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_dir.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = JobConfig::from_toml("").unwrap();
        assert_eq!(config, JobConfig::default());
        assert_eq!(config.paths.input, PathBuf::from("spotify_data"));
        assert_eq!(config.publish.branch, "main");
        assert_eq!(config.publish.message, DEFAULT_COMMIT_MESSAGE);
        assert!(config.merge.strict);
        assert!(!config.insights.enabled);
    }

    #[test]
    fn test_partial_config() {
        let config = JobConfig::from_toml(
            r#"
            [paths]
            final = "out"

            [publish]
            remote_url = "https://{token}@github.com/me/charts.git"
            token_env = "CHARTS_PAT"
            "#,
        )
        .unwrap();

        assert_eq!(config.paths.final_dir, PathBuf::from("out"));
        assert_eq!(config.paths.intermediate, PathBuf::from("country_data"));
        assert_eq!(config.publish.token_env, "CHARTS_PAT");
        assert_eq!(config.publish.branch, "main");
    }

    #[test]
    fn test_remote_url_needs_placeholder() {
        let err = JobConfig::from_toml(
            r#"
            [publish]
            remote_url = "https://github.com/me/charts.git"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ChartError::Config(_)));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            JobConfig::from_toml("paths = 3"),
            Err(ChartError::TomlError(_))
        ));
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = JobConfig::discover(dir.path()).unwrap();
        assert_eq!(config.repo_dir, dir.path());
        assert_eq!(
            config.resolve(&config.paths.input),
            dir.path().join("spotify_data")
        );
    }

    #[test]
    fn test_discover_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[insights]\nenabled = true\n").unwrap();
        let config = JobConfig::discover(dir.path()).unwrap();
        assert!(config.insights.enabled);
    }
}

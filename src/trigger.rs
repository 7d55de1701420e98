//! Job trigger conditions.
//!
//! The merge job runs on a push that touches a chart export, or whenever it
//! is dispatched by hand.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};

/// Path filter used when none is configured.
pub const DEFAULT_TRIGGER_PATH: &str = "spotify_data/**/*.csv";

/// What started the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Commits were pushed touching these repository-relative paths.
    Push {
        /// Changed paths.
        changed_paths: Vec<String>,
    },
    /// Manual, on-demand run.
    Dispatch,
}

/// Compiled path globs.
#[derive(Debug, Clone)]
pub struct PathFilter {
    patterns: Vec<(String, Regex)>,
}

impl Default for PathFilter {
    fn default() -> Self {
        // The default pattern is a constant and always compiles.
        Self {
            patterns: vec![(
                DEFAULT_TRIGGER_PATH.to_string(),
                Regex::new(&glob_to_regex(DEFAULT_TRIGGER_PATH)).expect("default glob compiles"),
            )],
        }
    }
}

impl PathFilter {
    /// Compile a set of globs.
    ///
    /// `*` matches within one path segment, `**/` matches any number of
    /// directories (including none) and `?` matches one character.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(&glob_to_regex(p))
                    .map(|re| (p.to_string(), re))
                    .map_err(|source| ChartError::InvalidPattern {
                        pattern: p.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// The source globs.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(p, _)| p.as_str())
    }

    /// Check a repository-relative path against every glob.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.strip_prefix("./").unwrap_or(path);
        self.patterns.iter().any(|(_, re)| re.is_match(path))
    }
}

/// Decide whether the job runs for `event`.
///
/// Dispatch ignores path filters entirely.
pub fn should_run(event: &TriggerEvent, filter: &PathFilter) -> bool {
    match event {
        TriggerEvent::Dispatch => true,
        TriggerEvent::Push { changed_paths } => changed_paths.iter().any(|p| filter.matches(p)),
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut re = String::from("^");
    let mut chars = glob.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                    re.push_str("(?:[^/]*/)*");
                } else {
                    re.push_str(".*");
                }
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }

    re.push('$');
    re
}

//! # chartmerge
//!
//! Merge weekly Spotify chart exports per country, compute trend analyses,
//! and publish the results back to the repository.
//!
//! ## Quick Start
//!
//! The easiest way to run the whole job is through [`MergeJob`]:
//!
//! ```rust,no_run
//! use chartmerge::{JobConfig, MergeJob, TriggerEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load chartmerge.toml from the working tree, or use defaults
//!     let config = JobConfig::discover(".")?;
//!     let job = MergeJob::new(config)?;
//!
//!     // Run as if triggered by hand
//!     let report = job.run(&TriggerEvent::Dispatch).await?;
//!     println!("Ran {} steps", report.steps.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! - `spotify_data/` - weekly exports named `regional-<cc>-weekly-<date>.csv`
//! - `country_data/` - one `<CC>_data.csv` per country
//! - `final_data/` - `final_merged_data.csv` plus the analyses
//!
//! ## Lower-Level APIs
//!
//! - [`ChartMerger`] - merge and analyses only, no git
//! - [`analysis`] - the individual analyses over [`ChartEntry`] rows
//! - [`Publisher`] - stage, commit and push
//! - [`trigger`] - path filters deciding whether a push starts the job

pub mod analysis;
pub mod config;
pub mod error;
pub mod insights;
mod job;
pub mod loader;
pub mod merger;
pub mod models;
pub mod publish;
pub mod trigger;
pub mod writer;

// Main interface (recommended)
pub use job::{JobReport, MergeJob, Step, StepOutcome, StepStatus};

// Lower-level APIs
pub use config::JobConfig;
pub use error::{ChartError, Result};
pub use merger::{ChartMerger, CountrySummary, MergeReport};
pub use models::{ChartEntry, ChartTable};
pub use publish::{GitRunner, PublishOutcome, Publisher, SystemGit};
pub use trigger::{PathFilter, TriggerEvent};

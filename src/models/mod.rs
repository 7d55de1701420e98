//! Data models for chart exports and analysis results.
//!
//! This module contains the column-preserving [`ChartTable`], its typed
//! [`ChartEntry`] view and the rows produced by each analysis.

pub mod analysis;
pub mod common;
pub mod table;

// Re-exports for convenience
pub use analysis::{Longevity, RisingTrend, StreamsDistribution, TopTrack};
pub use common::{country_from_filename, UNKNOWN_COUNTRY};
pub use table::{columns, ChartEntry, ChartTable, TrackKey};

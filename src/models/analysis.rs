//! Analysis result rows.
//!
//! Field order is the output column order.

use serde::Serialize;

use super::common::{format_number, format_opt_number, serialize_number, serialize_opt_number};

/// Most streamed track of a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTrack {
    /// Country code.
    pub country: String,
    /// Track title.
    pub track_name: String,
    /// Artist names.
    pub artist_names: String,
    /// Streams summed over every week.
    #[serde(serialize_with = "serialize_number")]
    pub total_streams: f64,
    /// Best rank reached.
    #[serde(serialize_with = "serialize_opt_number")]
    pub peak_rank: Option<f64>,
    /// Mean weekly streams.
    #[serde(serialize_with = "serialize_opt_number")]
    pub avg_streams: Option<f64>,
}

/// Track with the longest chart run of a country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Longevity {
    /// Country code.
    pub country: String,
    /// Track title.
    pub track_name: String,
    /// Artist names.
    pub artist_names: String,
    /// `weeks_on_chart` summed over every week.
    #[serde(serialize_with = "serialize_number")]
    pub total_weeks: f64,
    /// Streams summed over every week.
    #[serde(serialize_with = "serialize_number")]
    pub total_streams: f64,
    /// Mean weekly streams.
    #[serde(serialize_with = "serialize_opt_number")]
    pub avg_streams_per_week: Option<f64>,
}

/// How concentrated a country's streams are in its top 10.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamsDistribution {
    /// Country code.
    pub country: String,
    /// All streams of the country.
    #[serde(serialize_with = "serialize_number")]
    pub total_streams: f64,
    /// Streams of rows ranked 10 or better; missing if there are none.
    #[serde(serialize_with = "serialize_opt_number")]
    pub top_10_streams: Option<f64>,
    /// Track names of rows ranked 10 or better.
    pub top_10_tracks: String,
    /// `top_10_streams` as a percentage of `total_streams`.
    #[serde(serialize_with = "serialize_number")]
    pub top_10_share: f64,
}

/// A recently charting row with its momentum.
#[derive(Debug, Clone, PartialEq)]
pub struct RisingTrend {
    /// Country code.
    pub country: String,
    /// The full source row.
    pub row: Vec<String>,
    /// `previous_rank - rank`; positive when climbing.
    pub rank_change: Option<f64>,
    /// Stream change versus the previous week of the same track.
    pub stream_growth_rate: f64,
}

impl RisingTrend {
    /// Columns appended to the source headers.
    pub const EXTRA_COLUMNS: [&'static str; 2] = ["rank_change", "stream_growth_rate"];

    /// Output record: the source row followed by the two computed cells.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = self.row.clone();
        record.push(format_opt_number(self.rank_change));
        record.push(format_number(self.stream_growth_rate));
        record
    }
}

//! Trend analyses over merged chart rows.
//!
//! Every analysis groups by country (and usually by track key), orders the
//! groups, and keeps the first [`TOP_N`] per country.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::models::common::round2;
use crate::models::{
    ChartEntry, ChartTable, Longevity, RisingTrend, StreamsDistribution, TopTrack, TrackKey,
};

/// Rows kept per country.
pub const TOP_N: usize = 10;

/// Only rows with at most this many weeks on chart count as rising.
pub const RISING_MAX_WEEKS: f64 = 4.0;

/// Rows ranked this or better count as the top of the chart.
pub const TOP_RANK_CUTOFF: f64 = 10.0;

/// Sum and mean accumulator that skips missing values.
#[derive(Debug, Clone, Copy, Default)]
struct Stat {
    sum: f64,
    count: usize,
}

impl Stat {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn min_opt(current: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (current, value) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Descending order with missing values last.
fn desc_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Keep the first `n` items of each country, assuming items are sorted by country.
fn head_per_country<T>(items: Vec<T>, n: usize, country: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    items
        .into_iter()
        .filter(|item| {
            let count = seen.entry(country(item).to_string()).or_insert(0);
            *count += 1;
            *count <= n
        })
        .collect()
}

/// Most streamed tracks per country.
///
/// Totals and means are rounded to two decimals.
pub fn top_tracks(entries: &[ChartEntry]) -> Vec<TopTrack> {
    #[derive(Default)]
    struct Acc {
        streams: Stat,
        peak_rank: Option<f64>,
    }

    let mut groups: BTreeMap<TrackKey, Acc> = BTreeMap::new();
    for entry in entries {
        let Some(key) = entry.key() else { continue };
        let acc = groups.entry(key).or_default();
        acc.streams.add(entry.streams);
        acc.peak_rank = min_opt(acc.peak_rank, entry.peak_rank);
    }

    let mut rows: Vec<TopTrack> = groups
        .into_iter()
        .map(|((country, track_name, artist_names), acc)| TopTrack {
            country,
            track_name,
            artist_names,
            total_streams: round2(acc.streams.sum),
            peak_rank: acc.peak_rank,
            avg_streams: acc.streams.mean().map(round2),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.country
            .cmp(&b.country)
            .then_with(|| desc_missing_last(Some(a.total_streams), Some(b.total_streams)))
    });

    head_per_country(rows, TOP_N, |r| r.country.as_str())
}

/// Tracks climbing the chart in their first weeks.
///
/// Rows are taken from `table` in order; the growth rate compares a row's
/// streams to the previous qualifying row of the same track.
pub fn rising_trends(table: &ChartTable) -> Vec<RisingTrend> {
    let mut last_streams: HashMap<TrackKey, f64> = HashMap::new();
    let mut trends = Vec::new();

    for entry in table.entries() {
        match entry.weeks_on_chart {
            Some(weeks) if weeks <= RISING_MAX_WEEKS => {}
            _ => continue,
        }

        let rank_change = match (entry.previous_rank, entry.rank) {
            (Some(prev), Some(rank)) => Some(prev - rank),
            _ => None,
        };

        let stream_growth_rate = match entry.key() {
            Some(key) => {
                let previous = last_streams.get(&key).copied();
                // Missing streams carry the last known value forward.
                let current = entry.streams.or(previous);
                if let Some(current) = current {
                    last_streams.insert(key, current);
                }
                match (current, previous) {
                    // Growth from zero is infinite; only 0 -> 0 is undefined.
                    (Some(cur), Some(prev)) => {
                        let growth = cur / prev - 1.0;
                        if growth.is_nan() {
                            0.0
                        } else {
                            round2(growth)
                        }
                    }
                    _ => 0.0,
                }
            }
            None => 0.0,
        };

        trends.push(RisingTrend {
            country: entry.country.clone().unwrap_or_default(),
            row: table.rows[entry.row].clone(),
            rank_change,
            stream_growth_rate,
        });
    }

    trends.sort_by(|a, b| {
        a.country
            .cmp(&b.country)
            .then_with(|| desc_missing_last(a.rank_change, b.rank_change))
            .then_with(|| {
                desc_missing_last(Some(a.stream_growth_rate), Some(b.stream_growth_rate))
            })
    });

    head_per_country(trends, TOP_N, |t| t.country.as_str())
}

/// Render rising trends as a table: source columns plus the computed ones.
pub fn rising_trends_table(source_headers: &[String], trends: &[RisingTrend]) -> ChartTable {
    let mut headers = source_headers.to_vec();
    headers.extend(RisingTrend::EXTRA_COLUMNS.iter().map(|c| c.to_string()));

    let mut table = ChartTable::new(headers);
    for trend in trends {
        table.push_row(trend.to_record());
    }
    table
}

/// Tracks with the longest chart runs per country.
pub fn longevity(entries: &[ChartEntry]) -> Vec<Longevity> {
    #[derive(Default)]
    struct Acc {
        weeks: Stat,
        streams: Stat,
    }

    let mut groups: BTreeMap<TrackKey, Acc> = BTreeMap::new();
    for entry in entries {
        let Some(key) = entry.key() else { continue };
        let acc = groups.entry(key).or_default();
        acc.weeks.add(entry.weeks_on_chart);
        acc.streams.add(entry.streams);
    }

    let mut rows: Vec<Longevity> = groups
        .into_iter()
        .map(|((country, track_name, artist_names), acc)| Longevity {
            country,
            track_name,
            artist_names,
            total_weeks: acc.weeks.sum,
            total_streams: round2(acc.streams.sum),
            avg_streams_per_week: acc.streams.mean().map(round2),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.country
            .cmp(&b.country)
            .then_with(|| desc_missing_last(Some(a.total_weeks), Some(b.total_weeks)))
    });

    head_per_country(rows, TOP_N, |r| r.country.as_str())
}

/// Share of each country's streams held by its top 10 rows.
pub fn streams_distribution(entries: &[ChartEntry]) -> Vec<StreamsDistribution> {
    #[derive(Default)]
    struct Acc {
        total: Stat,
        top: Option<Stat>,
        tracks: Vec<String>,
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for entry in entries {
        let Some(country) = entry.country.clone() else {
            continue;
        };
        let acc = groups.entry(country).or_default();
        acc.total.add(entry.streams);

        if matches!(entry.rank, Some(rank) if rank <= TOP_RANK_CUTOFF) {
            acc.top.get_or_insert_with(Stat::default).add(entry.streams);
            if let Some(track) = &entry.track_name {
                acc.tracks.push(track.clone());
            }
        }
    }

    groups
        .into_iter()
        .map(|(country, acc)| {
            let top_10_streams = acc.top.map(|s| s.sum);
            let share = top_10_streams
                .map(|top| top / acc.total.sum)
                .filter(|s| s.is_finite())
                .unwrap_or(0.0);

            StreamsDistribution {
                country,
                total_streams: round2(acc.total.sum),
                top_10_streams: top_10_streams.map(round2),
                top_10_tracks: acc.tracks.join(", "),
                top_10_share: round2(share * 100.0),
            }
        })
        .collect()
}

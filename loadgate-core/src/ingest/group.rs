//! Per-group accumulation and the finished snapshot

use std::collections::{BTreeMap, BTreeSet};

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::ingest::record::SampleRecord;
use crate::stats::SampleSeries;

/// First status code counted as a client/server error.
pub const HTTP_ERROR_STATUS: i32 = 400;

/// Pseudo status code standing in for a connection error or an unparseable
/// status code. Always classified as an error.
pub const CONNECTION_ERROR_STATUS: i32 = 599;

/// Occurrence counts per status code.
#[derive(Debug, Clone, Default)]
pub struct StatusCodeCounts {
    counts: BTreeMap<i32, u64>,
}

impl StatusCodeCounts {
    pub(crate) fn increment(&mut self, code: i32) {
        *self.counts.entry(code).or_insert(0) += 1;
    }

    /// Mapping from status code to count.
    pub fn counts(&self) -> &BTreeMap<i32, u64> {
        &self.counts
    }

    pub fn count(&self, code: i32) -> u64 {
        self.counts.get(&code).copied().unwrap_or(0)
    }
}

/// Accumulates one group during ingestion. Owned exclusively by the
/// aggregator; [`finish`](GroupBuilder::finish) produces the immutable
/// [`AggregatedGroup`] snapshot.
#[derive(Debug)]
pub(crate) struct GroupBuilder {
    start: Option<i64>,
    end: i64,
    duration: SampleSeries,
    size: SampleSeries,
    active_threads: SampleSeries,
    size_by_label: Option<BTreeMap<String, SampleSeries>>,
    duration_by_label: Option<BTreeMap<String, SampleSeries>>,
    status_codes: StatusCodeCounts,
    labels_by_status: BTreeMap<i32, BTreeSet<String>>,
}

impl GroupBuilder {
    pub(crate) fn new(config: &AnalyzerConfig) -> Self {
        Self {
            start: None,
            end: 0,
            duration: SampleSeries::with_histogram(config.max_samples),
            size: SampleSeries::new(config.max_samples),
            active_threads: SampleSeries::with_histogram(config.max_samples),
            size_by_label: config.generate_details.then(BTreeMap::new),
            duration_by_label: config.generate_details.then(BTreeMap::new),
            status_codes: StatusCodeCounts::default(),
            labels_by_status: BTreeMap::new(),
        }
    }

    pub(crate) fn record(&mut self, record: &SampleRecord) -> Result<()> {
        self.status_codes.increment(record.status_code);
        self.labels_by_status
            .entry(record.status_code)
            .or_default()
            .insert(record.label.clone());

        // thread count is registered at response-completion time
        self.active_threads
            .add_sample(record.timestamp + record.duration, record.active_threads)?;

        if is_error(record) {
            self.duration.add_error(record.timestamp)?;
            self.size.add_error(record.timestamp)?;
        } else {
            self.size.add_sample(record.timestamp, record.bytes)?;
            self.duration.add_sample(record.timestamp, record.duration)?;

            add_detail(&mut self.size_by_label, &record.label, record.timestamp, record.bytes)?;
            add_detail(
                &mut self.duration_by_label,
                &record.label,
                record.timestamp,
                record.duration,
            )?;
        }

        if self.start.is_none() {
            self.start = Some(record.timestamp);
        }
        // deliberately last-write-wins: a late out-of-order record regresses
        // the reported end time
        self.end = record.timestamp;

        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<AggregatedGroup> {
        self.duration.finish()?;
        self.size.finish()?;
        self.active_threads.finish()?;
        if let Some(series_by_label) = &mut self.size_by_label {
            for series in series_by_label.values_mut() {
                series.finish()?;
            }
        }
        if let Some(series_by_label) = &mut self.duration_by_label {
            for series in series_by_label.values_mut() {
                series.finish()?;
            }
        }

        Ok(AggregatedGroup {
            start: self.start.unwrap_or(0),
            end: self.end,
            duration: self.duration,
            size: self.size,
            active_threads: self.active_threads,
            size_by_label: self.size_by_label,
            duration_by_label: self.duration_by_label,
            status_codes: self.status_codes,
            labels_by_status: self.labels_by_status,
        })
    }
}

/// Error classification: failed flag, unparseable size/duration, error-class
/// status code, or the connection-error sentinel.
fn is_error(record: &SampleRecord) -> bool {
    !record.success
        || record.bytes == -1
        || record.duration == -1
        || record.status_code >= HTTP_ERROR_STATUS
        || record.status_code == CONNECTION_ERROR_STATUS
}

/// Route a detail value into the per-label map, creating the series lazily.
/// Detail series never retain raw points; a large result set with many
/// distinct labels would otherwise exhaust memory.
fn add_detail(
    series_by_label: &mut Option<BTreeMap<String, SampleSeries>>,
    label: &str,
    timestamp: i64,
    value: i64,
) -> Result<()> {
    if let Some(map) = series_by_label {
        map.entry(label.to_string())
            .or_insert_with(|| SampleSeries::new(0))
            .add_sample(timestamp, value)?;
    }
    Ok(())
}

/// Aggregated data of one group, frozen at end-of-stream.
#[derive(Debug)]
pub struct AggregatedGroup {
    start: i64,
    end: i64,
    duration: SampleSeries,
    size: SampleSeries,
    active_threads: SampleSeries,
    size_by_label: Option<BTreeMap<String, SampleSeries>>,
    duration_by_label: Option<BTreeMap<String, SampleSeries>>,
    status_codes: StatusCodeCounts,
    labels_by_status: BTreeMap<i32, BTreeSet<String>>,
}

impl AggregatedGroup {
    /// Timestamp of the first record seen for this group.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Timestamp of the most recent record seen for this group.
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Response duration series.
    pub fn duration(&self) -> &SampleSeries {
        &self.duration
    }

    /// Response size series.
    pub fn size(&self) -> &SampleSeries {
        &self.size
    }

    /// Active thread count series.
    pub fn active_threads(&self) -> &SampleSeries {
        &self.active_threads
    }

    /// Per-label response size series, when detail generation was enabled.
    pub fn size_by_label(&self) -> Option<&BTreeMap<String, SampleSeries>> {
        self.size_by_label.as_ref()
    }

    /// Per-label response duration series, when detail generation was enabled.
    pub fn duration_by_label(&self) -> Option<&BTreeMap<String, SampleSeries>> {
        self.duration_by_label.as_ref()
    }

    pub fn status_codes(&self) -> &StatusCodeCounts {
        &self.status_codes
    }

    /// Which labels produced each status code.
    pub fn labels_by_status(&self) -> &BTreeMap<i32, BTreeSet<String>> {
        &self.labels_by_status
    }
}

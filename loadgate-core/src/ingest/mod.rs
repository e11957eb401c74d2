//! Result ingestion
//!
//! A single forward pass over the record stream: derive the group key,
//! classify success/error, route the derived values into the matching
//! group accumulator, and freeze everything at end-of-stream. Memory is
//! bounded by O(groups x retention cap) regardless of stream length.

pub mod group;
pub mod record;
pub mod xml;

pub use group::{AggregatedGroup, StatusCodeCounts, CONNECTION_ERROR_STATUS, HTTP_ERROR_STATUS};
pub use record::SampleRecord;
pub use xml::read_results;

use std::collections::BTreeMap;

use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::ingest::group::GroupBuilder;
use crate::pattern::ant_match;

/// Group key used when group patterns are configured but none matches.
pub const DEFAULT_GROUP: &str = "default";

/// Streaming classifier and router. Create one per run, feed every record,
/// then [`finish`](Aggregator::finish) exactly once.
pub struct Aggregator<'a> {
    config: &'a AnalyzerConfig,
    groups: BTreeMap<String, GroupBuilder>,
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self {
            config,
            groups: BTreeMap::new(),
        }
    }

    /// Route one record into its group.
    pub fn record(&mut self, record: &SampleRecord) -> Result<()> {
        let key = self.group_key(record);
        let config = self.config;
        self.groups
            .entry(key)
            .or_insert_with(|| GroupBuilder::new(config))
            .record(record)
    }

    /// Freeze all groups and hand out the finished map.
    pub fn finish(self) -> Result<BTreeMap<String, AggregatedGroup>> {
        let mut finished = BTreeMap::new();
        for (key, builder) in self.groups {
            finished.insert(key, builder.finish()?);
        }
        Ok(finished)
    }

    /// Derive the group key: first matching configured pattern, `"default"`
    /// when patterns are configured but none matches, otherwise the
    /// thread-group name with its trailing thread index stripped.
    fn group_key(&self, record: &SampleRecord) -> String {
        if !self.config.request_groups.is_empty() {
            for group in &self.config.request_groups {
                if ant_match(&group.pattern, &record.label) {
                    return group.name.clone();
                }
            }
            return DEFAULT_GROUP.to_string();
        }

        // thread group names read "<name> <n>-<m>"; cut at the first space
        match record.thread_group.find(' ') {
            Some(separator) => record.thread_group[..separator].to_string(),
            None => record.thread_group.clone(),
        }
    }
}

//! Configuration types for result analysis
//!
//! All configuration is an explicit value handed to the ingestion entry
//! point; nothing here is process-global. The types deserialize from TOML
//! profiles (see the CLI crate) and derive a JSON Schema behind the
//! `schema` feature.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::check::CheckConfig;

/// Element kind of a generic sample record.
pub const SAMPLE_KIND: &str = "sample";
/// Element kind of an HTTP sample record.
pub const HTTP_SAMPLE_KIND: &str = "httpSample";

/// Default retention cap per sample series.
pub const DEFAULT_MAX_SAMPLES: i64 = 50_000;

/// Analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct AnalyzerConfig {
    /// Retention cap per sample series: 0 stores no raw points, a negative
    /// cap stores every point uncompressed
    #[serde(default = "default_max_samples")]
    pub max_samples: i64,

    /// Element kinds that are processed; everything else is skipped
    #[serde(default = "default_sample_kinds")]
    pub sample_kinds: BTreeSet<String>,

    /// Ordered group definitions; first matching pattern wins. When empty,
    /// records are grouped by thread-group name instead
    #[serde(default)]
    pub request_groups: Vec<RequestGroup>,

    /// Build per-label size/duration series in addition to the group ones
    #[serde(default)]
    pub generate_details: bool,

    /// Default tolerance rules, used for groups without an override
    #[serde(default)]
    pub checks: CheckConfig,
}

fn default_max_samples() -> i64 {
    DEFAULT_MAX_SAMPLES
}

fn default_sample_kinds() -> BTreeSet<String> {
    [SAMPLE_KIND, HTTP_SAMPLE_KIND]
        .iter()
        .map(|kind| kind.to_string())
        .collect()
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
            sample_kinds: default_sample_kinds(),
            request_groups: Vec::new(),
            generate_details: false,
            checks: CheckConfig::default(),
        }
    }
}

/// A named group with an Ant-style label pattern and optional per-group
/// tolerance rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct RequestGroup {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub checks: Option<CheckConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.max_samples, 50_000);
        assert!(config.sample_kinds.contains("sample"));
        assert!(config.sample_kinds.contains("httpSample"));
        assert!(config.request_groups.is_empty());
        assert!(!config.generate_details);
        assert_eq!(config.checks.throughput.threshold, -1.0);
        assert_eq!(config.checks.errors.threshold, -1.0);
    }
}

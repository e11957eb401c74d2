//! Tolerance checking over finished groups
//!
//! A [`Check`] turns a threshold, a tolerance percentage and a direction
//! mode into an acceptance interval. The checker evaluates throughput and
//! error rate for every group against the applicable [`CheckConfig`]
//! (per-group override when the group key matches a configured request
//! group, the default otherwise) and reduces the verdicts to one pass/fail.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::ingest::AggregatedGroup;

/// How the acceptance interval is derived from threshold and tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum ToleranceDirection {
    /// Accept anything at or above the threshold
    Upper,
    /// Accept anything between 0 and the threshold
    Lower,
    /// Accept the threshold up to threshold + tolerance%
    UpperTolerance,
    /// Accept threshold - tolerance% up to the threshold
    LowerTolerance,
    /// Accept threshold +/- tolerance%
    UpperLowerTolerance,
    /// Accept the threshold exactly
    Equals,
}

/// One tolerance rule. A negative threshold disables the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct Check {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Tolerance in percent of the threshold
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_direction")]
    pub direction: ToleranceDirection,
}

fn default_threshold() -> f64 {
    -1.0
}

fn default_tolerance() -> f64 {
    5.0
}

fn default_direction() -> ToleranceDirection {
    ToleranceDirection::UpperLowerTolerance
}

impl Default for Check {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            tolerance: default_tolerance(),
            direction: default_direction(),
        }
    }
}

impl Check {
    /// Lower bound of the acceptance interval.
    pub fn min_value(&self) -> f64 {
        match self.direction {
            ToleranceDirection::LowerTolerance | ToleranceDirection::UpperLowerTolerance => {
                self.threshold - self.threshold * self.tolerance / 100.0
            }
            ToleranceDirection::Lower => 0.0,
            _ => self.threshold,
        }
    }

    /// Upper bound of the acceptance interval.
    pub fn max_value(&self) -> f64 {
        match self.direction {
            ToleranceDirection::UpperTolerance | ToleranceDirection::UpperLowerTolerance => {
                self.threshold + self.threshold * self.tolerance / 100.0
            }
            ToleranceDirection::Upper => f64::MAX,
            _ => self.threshold,
        }
    }

    /// Evaluate a metric value: `None` when the rule is disabled, otherwise
    /// whether the value falls inside the acceptance interval (or equals the
    /// threshold exactly in [`ToleranceDirection::Equals`] mode).
    pub fn valid(&self, value: f64) -> Result<Option<bool>> {
        if value < 0.0 {
            return Err(Error::Argument(format!(
                "value must be positive, got {value}"
            )));
        }
        if self.threshold < 0.0 {
            return Ok(None);
        }
        let ok = if self.direction == ToleranceDirection::Equals {
            value == self.threshold
        } else {
            value >= self.min_value() && value <= self.max_value()
        };
        Ok(Some(ok))
    }
}

/// Tolerance rules for one group: throughput and error rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
pub struct CheckConfig {
    #[serde(default)]
    pub throughput: Check,
    #[serde(default)]
    pub errors: Check,
}

/// Metric a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckMetric {
    /// Successful requests per second
    Throughput,
    /// Errors as a percentage of all requests
    ErrorRate,
}

impl std::fmt::Display for CheckMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckMetric::Throughput => write!(f, "throughput"),
            CheckMetric::ErrorRate => write!(f, "errors"),
        }
    }
}

/// One evaluated metric of one group.
#[derive(Debug, Clone, Serialize)]
pub struct CheckFinding {
    pub group: String,
    pub metric: CheckMetric,
    pub value: f64,
    pub min_value: f64,
    pub max_value: f64,
    /// `None` when the rule was disabled
    pub verdict: Option<bool>,
}

/// All findings of one run; fails if any finding failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub findings: Vec<CheckFinding>,
}

impl CheckReport {
    /// Overall verdict: AND across all groups and metrics. Disabled rules
    /// are informational and never fail the run.
    pub fn passed(&self) -> bool {
        self.findings
            .iter()
            .all(|finding| finding.verdict != Some(false))
    }

    /// The findings that failed.
    pub fn failures(&self) -> impl Iterator<Item = &CheckFinding> {
        self.findings
            .iter()
            .filter(|finding| finding.verdict == Some(false))
    }
}

/// Evaluate every finished group against the configured tolerance rules.
pub fn check_groups(
    groups: &BTreeMap<String, AggregatedGroup>,
    config: &AnalyzerConfig,
) -> Result<CheckReport> {
    let mut report = CheckReport::default();

    for (key, group) in groups {
        let checks = resolve_checks(config, key);
        let duration = group.duration();

        let throughput = duration.success_per_second()? as f64;
        report
            .findings
            .push(evaluate(&checks.throughput, throughput, key, CheckMetric::Throughput)?);

        let errors = duration.error_count()?;
        let successes = duration.success_count()?;
        let total = errors + successes;
        let error_rate = if total == 0 {
            0.0
        } else {
            errors as f64 / total as f64 * 100.0
        };
        report
            .findings
            .push(evaluate(&checks.errors, error_rate, key, CheckMetric::ErrorRate)?);
    }

    Ok(report)
}

/// Per-group override when a request group of the same name carries checks,
/// default rules otherwise.
fn resolve_checks<'a>(config: &'a AnalyzerConfig, key: &str) -> &'a CheckConfig {
    config
        .request_groups
        .iter()
        .find(|group| group.name == key)
        .and_then(|group| group.checks.as_ref())
        .unwrap_or(&config.checks)
}

fn evaluate(check: &Check, value: f64, group: &str, metric: CheckMetric) -> Result<CheckFinding> {
    let verdict = check.valid(value)?;
    match verdict {
        None => {
            tracing::info!("{group}: check {metric} disabled: {value}");
        }
        Some(true) => {
            tracing::info!(
                "{group}: check {metric} is correct: {value} (min: {}, max: {})",
                check.min_value(),
                check.max_value()
            );
        }
        Some(false) => {
            tracing::error!(
                "{group}: check {metric} is incorrect: {value} (min: {}, max: {})",
                check.min_value(),
                check.max_value()
            );
        }
    }
    Ok(CheckFinding {
        group: group.to_string(),
        metric,
        value,
        min_value: check.min_value(),
        max_value: check.max_value(),
        verdict,
    })
}

//! Loadgate Core Library
//!
//! This crate turns a stream of raw load-test sample records into per-group
//! aggregated statistics and a machine-checkable pass/fail verdict. It
//! provides the streaming ingestion and classification engine, the
//! bounded-memory sample series with progressive compression, the
//! histogram-based quantile estimator and the tolerance-band checker.
//!
//! Rendering, chart generation and file layout are external concerns; they
//! consume the finished group map exclusively through its read-only
//! accessors.

pub mod check;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pattern;
pub mod stats;

pub use check::{
    check_groups, Check, CheckConfig, CheckFinding, CheckMetric, CheckReport, ToleranceDirection,
};
pub use config::{AnalyzerConfig, RequestGroup};
pub use error::{Error, Result};
pub use ingest::{
    read_results, AggregatedGroup, Aggregator, SampleRecord, StatusCodeCounts,
    CONNECTION_ERROR_STATUS, HTTP_ERROR_STATUS,
};
pub use stats::{Point, Quantile, SampleSeries, ValueHistogram};

//! Statistics collection and quantile estimation

pub mod quantile;
pub mod series;

pub use quantile::{Quantile, ValueHistogram};
pub use series::{Point, SampleSeries};

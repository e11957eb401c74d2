//! Streaming per-metric sample aggregation
//!
//! A [`SampleSeries`] collects one scalar metric ((timestamp, value) pairs)
//! for one group and maintains exact running statistics in constant memory.
//! Alongside the exact counters it keeps a bounded, chronologically ordered
//! subsequence of raw points for later plotting, thinned by a progressive
//! pairwise compression scheme, and optionally a value histogram that feeds
//! quantile estimation.

use crate::error::{Error, Result};
use crate::stats::quantile::{Quantile, ValueHistogram};

/// One retained (timestamp, value) observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// Milliseconds since epoch
    pub timestamp: i64,
    pub value: i64,
}

/// Streaming aggregator for one scalar metric.
///
/// Mutation (`add_sample`, `add_error`) is only legal before [`finish`],
/// derived statistics are only legal after it. The retention cap follows the
/// configured limit: `0` stores no raw points at all, a negative cap stores
/// every point uncompressed, a positive cap bounds storage by halving the
/// retained series and aggregating subsequent points whenever the cap is hit.
///
/// [`finish`]: SampleSeries::finish
#[derive(Debug, Clone)]
pub struct SampleSeries {
    success: u64,
    errors: u64,

    total: f64,
    total_squared: f64,
    std_deviation: i64,

    min: i64,
    max: i64,
    min_timestamp: i64,
    max_timestamp: i64,

    points: Vec<Point>,
    pending: Vec<Point>,
    /// Number of raw points aggregated into one retained point
    compression: i64,
    max_points: i64,

    histogram: Option<ValueHistogram>,
    finished: bool,
}

impl SampleSeries {
    /// Create a series without a value histogram.
    pub fn new(max_points: i64) -> Self {
        Self::build(max_points, false)
    }

    /// Create a series that also counts a value histogram for quantiles.
    pub fn with_histogram(max_points: i64) -> Self {
        Self::build(max_points, true)
    }

    fn build(max_points: i64, histogram: bool) -> Self {
        Self {
            success: 0,
            errors: 0,
            total: 0.0,
            total_squared: 0.0,
            std_deviation: 0,
            min: i64::MAX,
            max: i64::MIN,
            min_timestamp: i64::MAX,
            max_timestamp: i64::MIN,
            points: Vec::new(),
            pending: Vec::new(),
            compression: 1,
            max_points,
            histogram: histogram.then(ValueHistogram::default),
            finished: false,
        }
    }

    /// Record an error observation. Errors count and move the observed time
    /// window, but contribute nothing to value statistics.
    pub fn add_error(&mut self, timestamp: i64) -> Result<()> {
        self.assert_not_finished()?;
        self.errors += 1;
        self.record_timestamp(timestamp);
        Ok(())
    }

    /// Record a successful observation.
    pub fn add_sample(&mut self, timestamp: i64, value: i64) -> Result<()> {
        self.assert_not_finished()?;

        self.success += 1;
        self.total += value as f64;
        self.total_squared += (value as f64) * (value as f64);

        if value > self.max {
            self.max = value;
        }
        if value < self.min {
            self.min = value;
        }
        self.record_timestamp(timestamp);

        if let Some(histogram) = &mut self.histogram {
            histogram.increment(value);
        }

        self.retain(timestamp, value);
        Ok(())
    }

    /// Freeze the series. Flushes the pending aggregation buffer and computes
    /// the standard deviation; a second call is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        if !self.pending.is_empty() {
            let aggregated = aggregate(&self.pending);
            self.points.push(aggregated);
            self.pending.clear();
        }

        // Rapid single-pass method: sqrt(n * sum(x^2) - sum(x)^2) / n.
        // Not numerically stabilized; this is the defined semantics.
        if self.success > 0 {
            let n = self.success as f64;
            self.std_deviation =
                ((n * self.total_squared - self.total * self.total).sqrt() / n) as i64;
        }
        Ok(())
    }

    /// Whether enough successful samples exist for value statistics.
    pub fn has_samples(&self) -> bool {
        self.success > 0
    }

    pub fn success_count(&self) -> Result<u64> {
        self.assert_finished()?;
        Ok(self.success)
    }

    pub fn error_count(&self) -> Result<u64> {
        self.assert_finished()?;
        Ok(self.errors)
    }

    /// Number of retained raw points (after compression).
    pub fn stored_count(&self) -> Result<usize> {
        self.assert_finished()?;
        Ok(self.points.len())
    }

    /// The retained raw series, in arrival order.
    pub fn points(&self) -> Result<&[Point]> {
        self.assert_finished()?;
        Ok(&self.points)
    }

    pub fn min(&self) -> Result<i64> {
        self.assert_finished()?;
        self.assert_samples()?;
        Ok(self.min)
    }

    pub fn max(&self) -> Result<i64> {
        self.assert_finished()?;
        self.assert_samples()?;
        Ok(self.max)
    }

    /// Mean value, truncated to whole units.
    pub fn average(&self) -> Result<i64> {
        self.assert_finished()?;
        self.assert_samples()?;
        Ok(self.total as i64 / self.success as i64)
    }

    pub fn total(&self) -> Result<i64> {
        self.assert_finished()?;
        Ok(self.total as i64)
    }

    pub fn std_deviation(&self) -> Result<i64> {
        self.assert_finished()?;
        Ok(self.std_deviation)
    }

    pub fn min_timestamp(&self) -> Result<i64> {
        self.assert_finished()?;
        self.assert_events()?;
        Ok(self.min_timestamp)
    }

    pub fn max_timestamp(&self) -> Result<i64> {
        self.assert_finished()?;
        self.assert_events()?;
        Ok(self.max_timestamp)
    }

    /// Observed time window in whole seconds, rounded.
    pub fn duration_secs(&self) -> Result<i64> {
        let span = self.max_timestamp()? - self.min_timestamp()?;
        Ok((span as f64 / 1000.0).round() as i64)
    }

    /// Successful samples per second over the observed window, 0 when the
    /// window is shorter than a second.
    pub fn success_per_second(&self) -> Result<u64> {
        let duration = self.duration_secs()?;
        if duration == 0 {
            return Ok(0);
        }
        Ok(self.success / duration as u64)
    }

    /// Build a quantile estimator with resolution `q` from the histogram.
    pub fn quantiles(&self, q: u32) -> Result<Quantile> {
        self.assert_finished()?;
        match &self.histogram {
            Some(histogram) => Quantile::new(q, histogram),
            None => Err(Error::State("no histogram available")),
        }
    }

    // ------------------------------------------------------------------

    fn assert_not_finished(&self) -> Result<()> {
        if self.finished {
            return Err(Error::State("series is already finished"));
        }
        Ok(())
    }

    fn assert_finished(&self) -> Result<()> {
        if !self.finished {
            return Err(Error::State("series is not finished"));
        }
        Ok(())
    }

    fn assert_samples(&self) -> Result<()> {
        if self.success == 0 {
            return Err(Error::State("no samples"));
        }
        Ok(())
    }

    fn assert_events(&self) -> Result<()> {
        if self.success == 0 && self.errors == 0 {
            return Err(Error::State("no samples"));
        }
        Ok(())
    }

    fn record_timestamp(&mut self, timestamp: i64) {
        if timestamp < self.min_timestamp {
            self.min_timestamp = timestamp;
        }
        if timestamp > self.max_timestamp {
            self.max_timestamp = timestamp;
        }
    }

    /// Place one point into the retained series, compressing as needed.
    fn retain(&mut self, timestamp: i64, value: i64) {
        if self.max_points == 0 {
            // statistics-only mode
            return;
        }

        if self.max_points > 0 && self.points.len() as i64 >= self.max_points {
            self.halve();
            self.compression *= 2;
        }

        if self.compression == 1 {
            self.points.push(Point { timestamp, value });
        } else {
            self.pending.push(Point { timestamp, value });
            if self.pending.len() as i64 >= self.compression {
                let aggregated = aggregate(&self.pending);
                self.points.push(aggregated);
                self.pending.clear();
            }
        }
    }

    /// Halve the retained series by aggregating adjacent pairs. An unpaired
    /// trailing point is kept as-is.
    fn halve(&mut self) {
        let mut halved = Vec::with_capacity(self.points.len() / 2 + 1);
        let mut pairs = self.points.chunks_exact(2);
        for pair in &mut pairs {
            let (first, second) = (pair[0], pair[1]);
            halved.push(Point {
                timestamp: first.timestamp + (second.timestamp - first.timestamp) / 2,
                value: (first.value + second.value) / 2,
            });
        }
        if let [last] = pairs.remainder() {
            halved.push(*last);
        }
        self.points = halved;
    }
}

/// Collapse a buffer of points into one: timestamp at the middle of the
/// buffered span, value the integer mean.
fn aggregate(buffer: &[Point]) -> Point {
    let first = buffer[0].timestamp;
    let last = buffer[buffer.len() - 1].timestamp;
    let sum: i64 = buffer.iter().map(|p| p.value).sum();
    Point {
        timestamp: first + (last - first) / 2,
        value: sum / buffer.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_of(series: &SampleSeries) -> (Vec<i64>, Vec<i64>) {
        let points = series.points().unwrap();
        (
            points.iter().map(|p| p.timestamp).collect(),
            points.iter().map(|p| p.value).collect(),
        )
    }

    #[test]
    fn test_exact_statistics_without_compression() {
        let mut series = SampleSeries::new(4);
        series.add_sample(10, 2).unwrap();
        series.add_sample(20, 4).unwrap();
        series.add_sample(30, 6).unwrap();
        series.add_sample(40, 8).unwrap();
        series.finish().unwrap();

        assert_eq!(series.success_count().unwrap(), 4);
        assert_eq!(series.error_count().unwrap(), 0);
        assert_eq!(series.average().unwrap(), 5);
        assert_eq!(series.min().unwrap(), 2);
        assert_eq!(series.max().unwrap(), 8);
        assert_eq!(series.total().unwrap(), 20);
        assert_eq!(series.min_timestamp().unwrap(), 10);
        assert_eq!(series.max_timestamp().unwrap(), 40);
    }

    #[test]
    fn test_single_halving_pass() {
        let mut series = SampleSeries::new(4);
        series.add_sample(10, 2).unwrap();
        series.add_sample(20, 4).unwrap();
        series.add_sample(30, 6).unwrap();
        series.add_sample(40, 8).unwrap();

        // the fifth sample triggers the first halving pass:
        // retained becomes (15,3),(35,7) at compression 2
        series.add_sample(50, 10).unwrap();
        series.add_sample(60, 12).unwrap();

        // aggregated to (75, 15)
        series.add_sample(70, 14).unwrap();
        series.add_sample(80, 16).unwrap();

        series.finish().unwrap();

        let (timestamps, values) = points_of(&series);
        assert_eq!(values, vec![3, 7, 11, 15]);
        assert_eq!(timestamps, vec![15, 35, 55, 75]);
    }

    #[test]
    fn test_repeated_halving_and_partial_flush() {
        let mut series = SampleSeries::new(2);
        series.add_sample(10, 2).unwrap();
        series.add_sample(20, 4).unwrap();
        series.add_sample(30, 6).unwrap();
        series.add_sample(40, 8).unwrap();

        // first pass gave (15,3),(35,7); the next sample re-halves to (25,5)
        // at compression 4 and starts buffering
        series.add_sample(50, 10).unwrap();
        series.add_sample(60, 12).unwrap();
        series.add_sample(100, 200).unwrap();

        // finish flushes the three buffered points as one aggregate
        series.finish().unwrap();

        let (timestamps, values) = points_of(&series);
        assert_eq!(values, vec![5, 222 / 3]);
        assert_eq!(timestamps, vec![25, 75]);
    }

    #[test]
    fn test_cap_bounds_retention() {
        let cap = 16;
        let mut series = SampleSeries::new(cap);
        for i in 0..10_000i64 {
            series.add_sample(i * 10, i).unwrap();
        }
        series.finish().unwrap();

        assert!(series.stored_count().unwrap() <= cap as usize);
        // exact counters are unaffected by compression
        assert_eq!(series.success_count().unwrap(), 10_000);
        assert_eq!(series.min().unwrap(), 0);
        assert_eq!(series.max().unwrap(), 9_999);

        // chronological order survives compression
        let points = series.points().unwrap();
        for pair in points.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_zero_cap_stores_nothing() {
        let mut series = SampleSeries::new(0);
        for i in 0..100 {
            series.add_sample(i, i).unwrap();
        }
        series.finish().unwrap();
        assert_eq!(series.stored_count().unwrap(), 0);
        assert_eq!(series.success_count().unwrap(), 100);
    }

    #[test]
    fn test_negative_cap_stores_everything() {
        let mut series = SampleSeries::new(-1);
        for i in 0..100_000i64 {
            series.add_sample(i, i).unwrap();
        }
        series.finish().unwrap();
        assert_eq!(series.stored_count().unwrap(), 100_000);
    }

    #[test]
    fn test_errors_do_not_touch_value_statistics() {
        let mut series = SampleSeries::new(100);
        series.add_sample(10, 5).unwrap();
        series.add_error(20).unwrap();
        series.add_error(30).unwrap();
        series.finish().unwrap();

        assert_eq!(series.success_count().unwrap(), 1);
        assert_eq!(series.error_count().unwrap(), 2);
        assert_eq!(series.min().unwrap(), 5);
        assert_eq!(series.max().unwrap(), 5);
        assert_eq!(series.total().unwrap(), 5);
        // errors still widen the observed time window
        assert_eq!(series.min_timestamp().unwrap(), 10);
        assert_eq!(series.max_timestamp().unwrap(), 30);
    }

    #[test]
    fn test_std_deviation() {
        let mut series = SampleSeries::new(100);
        for value in [2, 4, 4, 4, 5, 5, 7, 9] {
            series.add_sample(0, value).unwrap();
        }
        series.finish().unwrap();
        // population standard deviation of the textbook sequence is 2
        assert_eq!(series.std_deviation().unwrap(), 2);
    }

    #[test]
    fn test_throughput() {
        let mut series = SampleSeries::new(100);
        for i in 0..100i64 {
            // 100 samples spread over 10 seconds
            series.add_sample(1_000_000 + i * 100, 1).unwrap();
        }
        series.finish().unwrap();
        assert_eq!(series.duration_secs().unwrap(), 10);
        assert_eq!(series.success_per_second().unwrap(), 10);
    }

    #[test]
    fn test_throughput_zero_duration() {
        let mut series = SampleSeries::new(100);
        series.add_sample(1000, 1).unwrap();
        series.add_sample(1000, 2).unwrap();
        series.finish().unwrap();
        assert_eq!(series.duration_secs().unwrap(), 0);
        assert_eq!(series.success_per_second().unwrap(), 0);
    }

    #[test]
    fn test_mutation_after_finish_is_rejected() {
        let mut series = SampleSeries::new(100);
        series.add_sample(10, 1).unwrap();
        series.finish().unwrap();
        assert!(series.add_sample(20, 2).is_err());
        assert!(series.add_error(20).is_err());
    }

    #[test]
    fn test_query_before_finish_is_rejected() {
        let mut series = SampleSeries::new(100);
        series.add_sample(10, 1).unwrap();
        assert!(series.average().is_err());
        assert!(series.min().is_err());
        assert!(series.points().is_err());
        assert!(series.success_count().is_err());
    }

    #[test]
    fn test_value_queries_without_samples_are_rejected() {
        let mut series = SampleSeries::new(100);
        series.add_error(10).unwrap();
        series.finish().unwrap();
        assert!(series.min().is_err());
        assert!(series.max().is_err());
        assert!(series.average().is_err());
        // counts remain queryable
        assert_eq!(series.error_count().unwrap(), 1);
        assert_eq!(series.success_count().unwrap(), 0);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut series = SampleSeries::new(4);
        for i in 0..6i64 {
            series.add_sample(i * 10 + 10, (i + 1) * 2).unwrap();
        }
        series.finish().unwrap();
        let first = (
            series.std_deviation().unwrap(),
            points_of(&series),
            series.average().unwrap(),
        );
        series.finish().unwrap();
        let second = (
            series.std_deviation().unwrap(),
            points_of(&series),
            series.average().unwrap(),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn test_quantiles_require_histogram() {
        let mut series = SampleSeries::new(100);
        series.add_sample(0, 1).unwrap();
        series.finish().unwrap();
        assert!(series.quantiles(100).is_err());

        let mut series = SampleSeries::with_histogram(100);
        series.add_sample(0, 1).unwrap();
        series.finish().unwrap();
        assert!(series.quantiles(100).is_ok());
    }
}

//! The typed per-element attribute set consumed by aggregation

/// One parsed sample record.
///
/// Numeric fields that failed to parse carry their sentinel (-1 for counts,
/// 599 for the status code) by the time a record reaches aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRecord {
    /// Request/operation identifier, used for grouping and per-label detail
    pub label: String,
    /// Milliseconds since epoch
    pub timestamp: i64,
    /// Elapsed time in milliseconds, -1 if unparseable
    pub duration: i64,
    /// Response size in bytes, -1 if unparseable
    pub bytes: i64,
    pub success: bool,
    /// Result/status code, 599 if unparseable
    pub status_code: i32,
    /// Concurrent thread count at record time, -1 if unparseable
    pub active_threads: i64,
    /// Owning thread group, formatted as `"<name> <n>-<m>"`
    pub thread_group: String,
}

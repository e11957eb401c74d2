//! Streaming reader for JMeter-style XML result files
//!
//! A single forward pass over the document. Elements whose tag is in the
//! configured kind set become [`SampleRecord`]s; everything else is skipped
//! without side effects. Malformed attribute values degrade to sentinels
//! with a warning, malformed framing aborts the run.

use std::collections::BTreeMap;
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::ingest::group::CONNECTION_ERROR_STATUS;
use crate::ingest::record::SampleRecord;
use crate::ingest::{AggregatedGroup, Aggregator};

/// Progress is logged every this many parsed records.
const LOG_EVERY: u64 = 10_000;

/// Aggregate a result stream into finished groups.
pub fn read_results<R: BufRead>(
    reader: R,
    config: &AnalyzerConfig,
) -> Result<BTreeMap<String, AggregatedGroup>> {
    let mut xml = Reader::from_reader(reader);
    let mut aggregator = Aggregator::new(config);
    let mut buf = Vec::new();
    let mut parsed: u64 = 0;

    loop {
        match xml.read_event_into(&mut buf) {
            Err(e) => {
                return Err(Error::Parse(format!(
                    "malformed result stream at position {}: {e}",
                    xml.buffer_position()
                )))
            }
            Ok(Event::Eof) => break,
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                let name = element.local_name();
                let name = String::from_utf8_lossy(name.as_ref());
                if config.sample_kinds.contains(name.as_ref()) {
                    let record = parse_record(&element)?;
                    aggregator.record(&record)?;

                    parsed += 1;
                    if parsed % LOG_EVERY == 0 {
                        tracing::info!("parsed {parsed} entries ...");
                    }
                }
            }
            Ok(_) => {}
        }
        buf.clear();
    }

    tracing::info!("finished parsing {parsed} entries");
    aggregator.finish()
}

/// Pull the consumed attribute set out of one sample element.
fn parse_record(element: &BytesStart<'_>) -> Result<SampleRecord> {
    let mut label = None;
    let mut timestamp = None;
    let mut duration = None;
    let mut bytes = None;
    let mut success = None;
    let mut status_code = None;
    let mut active_threads = None;
    let mut thread_group = None;

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| Error::Parse(e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| Error::Parse(e.to_string()))?
            .into_owned();
        match attribute.key.as_ref() {
            b"lb" => label = Some(value),
            b"ts" => timestamp = Some(value),
            b"t" => duration = Some(value),
            b"by" => bytes = Some(value),
            b"s" => success = Some(value),
            b"rc" => status_code = Some(value),
            b"na" => active_threads = Some(value),
            b"tn" => thread_group = Some(value),
            _ => {}
        }
    }

    Ok(SampleRecord {
        label: label.unwrap_or_default(),
        timestamp: parse_count("timestamp", timestamp),
        duration: parse_count("duration", duration),
        bytes: parse_count("bytes", bytes),
        success: success.is_some_and(|s| s.eq_ignore_ascii_case("true")),
        status_code: parse_status(status_code),
        active_threads: parse_count("active threads", active_threads),
        thread_group: thread_group.unwrap_or_default(),
    })
}

/// Parse a numeric count attribute; -1 when absent or unparseable.
fn parse_count(field: &str, raw: Option<String>) -> i64 {
    match raw {
        None => -1,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("error parsing {field} value '{raw}'");
            -1
        }),
    }
}

/// Parse the status code attribute; the connection-error sentinel when
/// absent or unparseable.
fn parse_status(raw: Option<String>) -> i32 {
    let Some(raw) = raw else {
        tracing::warn!("missing status code");
        return CONNECTION_ERROR_STATUS;
    };
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!("error parsing status code '{raw}'");
        CONNECTION_ERROR_STATUS
    })
}

use crate::error::LogError;
use rtq_abstract::{Sample, Series};
use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Trace events the evaluator turns into series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEventKind {
    PacketSent,
    PacketReceived,
    CongestionMetricsUpdated,
}

impl TraceEventKind {
    pub const ALL: [TraceEventKind; 3] = [
        TraceEventKind::PacketSent,
        TraceEventKind::PacketReceived,
        TraceEventKind::CongestionMetricsUpdated,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            TraceEventKind::PacketSent => "transport:packet_sent",
            TraceEventKind::PacketReceived => "transport:packet_received",
            TraceEventKind::CongestionMetricsUpdated => "recovery:metrics_updated",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.event_name() == name)
    }

    /// Value carried by an event of this kind, `None` when the event does
    /// not produce a sample.
    fn value(self, data: &EventData) -> Option<f64> {
        match self {
            TraceEventKind::PacketSent | TraceEventKind::PacketReceived => {
                Some(data.raw.as_ref().map_or(0, |raw| raw.length) as f64)
            }
            // metrics_updated fires for every recovery metric; only some carry a window
            TraceEventKind::CongestionMetricsUpdated => data
                .congestion_window
                .filter(|cwnd| *cwnd > 0)
                .map(|cwnd| cwnd as f64),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    #[serde(default)]
    length: u64,
}

#[derive(Debug, Default, Deserialize)]
struct EventData {
    #[serde(default)]
    raw: Option<RawInfo>,
    #[serde(default)]
    congestion_window: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TraceEvent {
    /// Milliseconds relative to the trace reference time.
    time: f64,
    name: String,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct TraceHeader {
    #[allow(dead_code)]
    qlog_version: String,
}

/// One line of a newline-delimited trace.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceRecord {
    Header(TraceHeader),
    Event(TraceEvent),
    Other(IgnoredAny),
}

/// Samples for every supported event kind, gathered in one pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraceSeries {
    pub packets_sent: Series<f64>,
    pub packets_received: Series<f64>,
    pub congestion_window: Series<f64>,
}

impl TraceSeries {
    pub fn get(&self, kind: TraceEventKind) -> &Series<f64> {
        match kind {
            TraceEventKind::PacketSent => &self.packets_sent,
            TraceEventKind::PacketReceived => &self.packets_received,
            TraceEventKind::CongestionMetricsUpdated => &self.congestion_window,
        }
    }

    fn get_mut(&mut self, kind: TraceEventKind) -> &mut Series<f64> {
        match kind {
            TraceEventKind::PacketSent => &mut self.packets_sent,
            TraceEventKind::PacketReceived => &mut self.packets_received,
            TraceEventKind::CongestionMetricsUpdated => &mut self.congestion_window,
        }
    }

    pub fn into_series(self, kind: TraceEventKind) -> Series<f64> {
        match kind {
            TraceEventKind::PacketSent => self.packets_sent,
            TraceEventKind::PacketReceived => self.packets_received,
            TraceEventKind::CongestionMetricsUpdated => self.congestion_window,
        }
    }
}

/// `(relative time, value)` for every event of `kind` in the trace.
pub fn read_trace(path: &Path, kind: TraceEventKind) -> Result<Series<f64>, LogError> {
    Ok(read_trace_all(path)?.into_series(kind))
}

/// Read every supported event kind from the trace at `path`.
///
/// Lines that are not a JSON object, such as a trailing line cut short when
/// the traced process was killed, are dropped before decoding.
pub fn read_trace_all(path: &Path) -> Result<TraceSeries, LogError> {
    let file = File::open(path).map_err(|e| LogError::io(path, e))?;
    let filtered = filter_object_lines(path, BufReader::new(file))?;
    decode_events(path, &filtered)
}

fn filter_object_lines<R: BufRead>(path: &Path, mut input: R) -> Result<Vec<u8>, LogError> {
    let mut kept = Vec::new();
    let mut line = Vec::new();
    let mut skipped = 0usize;
    loop {
        line.clear();
        let n = input
            .read_until(b'\n', &mut line)
            .map_err(|e| LogError::io(path, e))?;
        if n == 0 {
            break;
        }
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        if serde_json::from_slice::<Map<String, Value>>(trimmed).is_ok() {
            kept.extend_from_slice(trimmed);
            kept.push(b'\n');
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        warn!("skipped {} undecodable lines in {}", skipped, path.display());
    }
    Ok(kept)
}

fn decode_events(path: &Path, ndjson: &[u8]) -> Result<TraceSeries, LogError> {
    let mut series = TraceSeries::default();
    let records = serde_json::Deserializer::from_slice(ndjson).into_iter::<TraceRecord>();
    for record in records {
        let record = record.map_err(|source| LogError::Trace {
            path: path.to_path_buf(),
            source,
        })?;
        let event = match record {
            TraceRecord::Event(event) => event,
            TraceRecord::Header(_) | TraceRecord::Other(_) => continue,
        };
        let Some(kind) = TraceEventKind::from_event_name(&event.name) else {
            continue;
        };
        match kind.value(&event.data) {
            Some(value) => series.get_mut(kind).push(Sample::new(event.time, value)),
            None => debug!("skipping {} at {} without value", event.name, event.time),
        }
    }
    Ok(series)
}

/// Locate the single trace file with `extension` in `dir`.
///
/// A missing directory or no match means tracing was not enabled for the
/// run. More than one match is [`LogError::AmbiguousTrace`].
pub fn discover_trace(dir: &Path, extension: &str) -> Result<Option<PathBuf>, LogError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(LogError::io(dir, e)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| LogError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => Err(LogError::AmbiguousTrace {
            dir: dir.to_path_buf(),
            count,
        }),
    }
}

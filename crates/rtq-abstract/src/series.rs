use serde::{Deserialize, Serialize};

/// One `(key, value)` observation of a metric.
///
/// Integer keys are frame indexes, millisecond offsets or second buckets.
/// Floating point keys are protocol-trace relative times, which carry
/// sub-millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample<K> {
    pub key: K,
    pub value: f64,
}

impl<K> Sample<K> {
    pub fn new(key: K, value: f64) -> Self {
        Self { key, value }
    }
}

/// Samples in insertion (= time) order. Keys are not required to be unique.
pub type Series<K> = Vec<Sample<K>>;

/// Common view over both key kinds.
pub trait SampleKey: Copy + PartialOrd {
    /// Origin of the axis, used for synthetic points.
    const ZERO: Self;

    /// Key expressed as milliseconds. Only used when a series is bucketed.
    fn as_millis(self) -> f64;
}

impl SampleKey for i64 {
    const ZERO: Self = 0;

    fn as_millis(self) -> f64 {
        self as f64
    }
}

impl SampleKey for f64 {
    const ZERO: Self = 0.0;

    fn as_millis(self) -> f64 {
        self
    }
}

/// Unit of an integer timestamp column in a delimited log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Convert a raw timestamp to whole milliseconds, truncating toward zero.
    pub fn to_millis(self, raw: i64) -> i64 {
        match self {
            TimeUnit::Milliseconds => raw,
            TimeUnit::Nanoseconds => raw / 1_000_000,
        }
    }
}

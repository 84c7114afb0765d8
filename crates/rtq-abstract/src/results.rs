use crate::config::{Implementation, RunConfig};
use crate::series::Series;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Derived data of one run. Every series may be empty when its source
/// artifact was absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub average_ssim: f64,
    pub average_psnr: f64,
    pub average_target_bitrate: f64,

    /// Keyed by frame number.
    pub per_frame_ssim: Series<i64>,
    /// Keyed by frame number, bounded to `[0, 1]` for finite non-negative input.
    pub per_frame_psnr: Series<i64>,

    /// Bytes per second, keyed by second.
    pub sent_rtp: Series<i64>,
    pub received_rtp: Series<i64>,
    pub sent_rtcp: Series<i64>,
    pub received_rtcp: Series<i64>,

    /// Protocol-trace bytes per second, keyed by second.
    pub qlog_sender_packets_sent: Series<i64>,
    pub qlog_sender_packets_received: Series<i64>,
    pub qlog_receiver_packets_sent: Series<i64>,
    pub qlog_receiver_packets_received: Series<i64>,

    /// Stair-step congestion window keyed by trace time in milliseconds.
    pub qlog_congestion_window: Series<f64>,

    /// Congestion-controller log, keyed by millisecond timestamp.
    pub cc_target_bitrate: Series<i64>,
    pub cc_rate_transmitted: Series<i64>,
    pub cc_srtt: Series<i64>,

    /// Stair-step emulated link rate derived from the phase schedule.
    pub link_capacity: Series<i64>,
}

/// One executed experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub config: RunConfig,
    #[serde(default)]
    pub metrics: Metrics,
}

impl RunResult {
    pub fn implementation_name(&self) -> &str {
        &self.config.implementation.name
    }

    pub fn test_case_name(&self) -> &str {
        &self.config.test_case.name
    }
}

/// Results keyed by implementation name, then test-case name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub results: BTreeMap<String, BTreeMap<String, RunResult>>,
}

/// Presentation view of [`AggregatedResults`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable<'a> {
    pub columns: Vec<&'a str>,
    pub rows: Vec<ResultRow<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow<'a> {
    pub implementation: &'a Implementation,
    /// One cell per column, `None` where the pair was never run.
    pub cells: Vec<Option<&'a RunResult>>,
}

impl AggregatedResults {
    /// Insert a result, replacing any previous result for the same
    /// implementation and test case. Returns the replaced result.
    pub fn insert(&mut self, result: RunResult) -> Option<RunResult> {
        let implementation = result.implementation_name().to_string();
        let test_case = result.test_case_name().to_string();
        self.results
            .entry(implementation)
            .or_default()
            .insert(test_case, result)
    }

    pub fn get(&self, implementation: &str, test_case: &str) -> Option<&RunResult> {
        self.results.get(implementation)?.get(test_case)
    }

    pub fn len(&self) -> usize {
        self.results.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point every result at its detail page `<implementation>/<test case>`.
    pub fn attach_details_links(&mut self) {
        for (implementation, cases) in &mut self.results {
            for (test_case, result) in cases.iter_mut() {
                result.config.details_link = format!("{implementation}/{test_case}");
            }
        }
    }

    /// Rows sorted by implementation name, columns in natural test-case order.
    pub fn table(&self) -> ResultTable<'_> {
        let mut columns: Vec<&str> = self
            .results
            .values()
            .flat_map(|cases| cases.keys().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        columns.sort_by(|a, b| natural_cmp(a, b));

        let rows = self
            .results
            .values()
            .filter_map(|cases| {
                let first = cases.values().next()?;
                Some(ResultRow {
                    implementation: &first.config.implementation,
                    cells: columns.iter().map(|c| cases.get(*c)).collect(),
                })
            })
            .collect();

        ResultTable { columns, rows }
    }
}

/// Compare strings treating embedded digit runs as numbers, so that
/// `case-2` sorts before `case-10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let n = take_number(&mut left);
                let m = take_number(&mut right);
                let ord = n
                    .trim_start_matches('0')
                    .len()
                    .cmp(&m.trim_start_matches('0').len())
                    .then_with(|| n.trim_start_matches('0').cmp(m.trim_start_matches('0')));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

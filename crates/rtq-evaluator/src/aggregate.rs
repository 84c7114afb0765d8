use crate::error::EvalError;
use crate::storage::read_json;
use chrono::{DateTime, Utc};
use rtq_abstract::{AggregatedResults, RunResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Collects per-run results into one [`AggregatedResults`].
///
/// A result for an implementation and test case that is already present
/// replaces the earlier one.
#[derive(Debug, Default)]
pub struct Aggregator {
    results: AggregatedResults,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.results.date = Some(date);
        self
    }

    pub fn insert(&mut self, result: RunResult) -> Option<RunResult> {
        let replaced = self.results.insert(result)?;
        warn!(
            "replacing earlier result for {} / {}",
            replaced.implementation_name(),
            replaced.test_case_name()
        );
        Some(replaced)
    }

    /// Insert every `*.json` file below `dir`, visiting entries in lexical
    /// order so repeated keys resolve the same way on every run. Returns the
    /// number of files read.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, EvalError> {
        let files = result_files(dir)?;
        for path in &files {
            let result: RunResult = read_json(path)?;
            info!(
                "{}: {} / {}",
                path.display(),
                result.implementation_name(),
                result.test_case_name()
            );
            self.insert(result);
        }
        Ok(files.len())
    }

    pub fn finish(self) -> AggregatedResults {
        self.results
    }
}

/// Aggregate every result file below `dir`, stamped with `date`.
pub fn aggregate_dir(dir: &Path, date: DateTime<Utc>) -> Result<AggregatedResults, EvalError> {
    let mut aggregator = Aggregator::new().with_date(date);
    aggregator.load_dir(dir)?;
    Ok(aggregator.finish())
}

fn result_files(dir: &Path) -> Result<Vec<PathBuf>, EvalError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|e| EvalError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EvalError::io(dir, e))?;
    entries.sort();

    let mut files = Vec::new();
    for path in entries {
        if path.is_dir() {
            files.extend(result_files(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::write_json_atomic;
    use rtq_abstract::{Implementation, RunConfig, Sample, TestCase};

    fn result(implementation: &str, test_case: &str, ssim: f64) -> RunResult {
        let mut result = RunResult {
            config: RunConfig {
                implementation: Implementation {
                    name: implementation.into(),
                    ..Default::default()
                },
                test_case: TestCase {
                    name: test_case.into(),
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        };
        result.metrics.average_ssim = ssim;
        result
    }

    #[test]
    fn later_result_wins() {
        let mut aggregator = Aggregator::new();
        assert!(aggregator.insert(result("pion", "static", 0.5)).is_none());
        let replaced = aggregator.insert(result("pion", "static", 0.9)).unwrap();
        assert_eq!(replaced.metrics.average_ssim, 0.5);

        let results = aggregator.finish();
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("pion", "static").unwrap().metrics.average_ssim, 0.9);
    }

    #[test]
    fn loads_nested_json_in_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("b");
        fs::create_dir(&nested).unwrap();
        write_json_atomic(&dir.path().join("a.json"), &result("pion", "static", 0.1)).unwrap();
        write_json_atomic(&nested.join("run.json"), &result("pion", "static", 0.2)).unwrap();
        write_json_atomic(&dir.path().join("c.json"), &result("quic-go", "static", 0.3)).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut aggregator = Aggregator::new();
        assert_eq!(aggregator.load_dir(dir.path()).unwrap(), 3);
        let results = aggregator.finish();
        assert_eq!(results.len(), 2);
        assert_eq!(results.get("pion", "static").unwrap().metrics.average_ssim, 0.2);
    }

    #[test]
    fn unreadable_result_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(matches!(
            aggregate_dir(dir.path(), Utc::now()),
            Err(EvalError::Decode { .. })
        ));
    }

    #[test]
    fn stamps_date_and_keeps_series() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = result("pion", "static", 0.7);
        run.metrics.sent_rtp = vec![Sample::new(0, 1200.0), Sample::new(1, 800.0)];
        write_json_atomic(&dir.path().join("run.json"), &run).unwrap();

        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let results = aggregate_dir(dir.path(), date).unwrap();
        assert_eq!(results.date, Some(date));
        assert_eq!(results.get("pion", "static"), Some(&run));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            aggregate_dir(&dir.path().join("absent"), Utc::now()),
            Err(EvalError::Io { .. })
        ));
    }
}

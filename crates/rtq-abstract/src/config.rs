use crate::duration::JsonDuration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Container image and invocation of one side of an implementation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub params: String,
}

/// A sender/receiver pairing under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    #[serde(default)]
    pub name: String,
    pub sender: Endpoint,
    pub receiver: Endpoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    pub name: String,
}

/// Emulated link parameters applied during one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default)]
    pub delay: JsonDuration,
    #[serde(default)]
    pub jitter: JsonDuration,
    /// Link rate in bit/s.
    #[serde(default)]
    pub bitrate: u64,
}

/// One step of the network-condition schedule. A zero duration holds the
/// configuration until the end of the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(default)]
    pub duration: JsonDuration,
    pub config: LinkConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub name: String,
    pub video_file: VideoFile,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

/// Immutable description of one run, written by the orchestrator as
/// `config.json` before evaluation starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub date: DateTime<Utc>,
    /// Relative link to the rendered detail page, set after aggregation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub details_link: String,
    pub implementation: Implementation,
    pub test_case: TestCase,
    #[serde(default)]
    pub timeout: JsonDuration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn decodes_orchestrator_config() {
        let json = r#"{
            "date": "2021-09-01T12:00:00Z",
            "implementation": {
                "name": "rtq-go-scream",
                "sender": {"image": "engelbart/rtq-go-endpoint:main", "params": "--scream"},
                "receiver": {"image": "engelbart/rtq-go-endpoint:main"}
            },
            "test_case": {
                "name": "simple-p2p-1",
                "video_file": {"name": "sintel_trailer.mkv"},
                "phases": [
                    {"duration": "40s", "config": {"delay": "50ms", "bitrate": 1000000}},
                    {"duration": 0, "config": {"delay": 50000000, "bitrate": 600000}}
                ]
            },
            "timeout": 600000000000
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.implementation.name, "rtq-go-scream");
        assert_eq!(config.implementation.sender.params, "--scream");
        assert_eq!(config.test_case.phases.len(), 2);
        assert_eq!(config.test_case.phases[0].duration.as_millis(), 40_000);
        assert_eq!(
            config.test_case.phases[1].config.delay.0,
            Duration::from_millis(50)
        );
        assert!(config.test_case.phases[1].duration.is_zero());
        assert_eq!(config.timeout.0, Duration::from_secs(600));
        assert!(config.details_link.is_empty());
    }
}

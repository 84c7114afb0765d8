pub mod config;
pub mod duration;
pub mod results;
pub mod series;
pub mod settings;

pub use config::{Endpoint, Implementation, LinkConfig, Phase, RunConfig, TestCase, VideoFile};
pub use duration::{DurationParseError, JsonDuration};
pub use results::{AggregatedResults, Metrics, ResultRow, ResultTable, RunResult, natural_cmp};
pub use series::{Sample, SampleKey, Series, TimeUnit};
pub use settings::{ArtifactLayout, ColumnLayout, Columns, EvalSettings, QualitySettings};

//! Per-run evaluation of experiment artifacts and aggregation of run results.

pub mod aggregate;
pub mod capacity;
pub mod error;
pub mod evaluator;
pub mod quality;
pub mod storage;

pub use aggregate::{Aggregator, aggregate_dir};
pub use capacity::link_capacity;
pub use error::EvalError;
pub use evaluator::{Role, RunEvaluator};
pub use quality::{Ffmpeg, QualityJob, QualityTool};
pub use storage::{load_settings, read_json, write_json_atomic};

//! Parsers and numeric transforms that turn raw run artifacts into series.

pub mod error;
pub mod extract;
pub mod reader;
pub mod resample;
pub mod trace;

pub use error::{ExtractError, LogError};
pub use extract::{PsnrExtractor, RowExtractor, SsimExtractor, TimeValueExtractor, bounded_psnr};
pub use reader::read_delimited;
pub use resample::{MAX_BUCKETS, bucket_and_sum, rounded_mean, step_expand};
pub use trace::{TraceEventKind, TraceSeries, discover_trace, read_trace, read_trace_all};

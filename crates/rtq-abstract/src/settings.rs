use crate::series::TimeUnit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the evaluator looks for each artifact, relative to the run directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    pub config: PathBuf,
    pub ssim_log: PathBuf,
    pub psnr_log: PathBuf,
    pub sender_rtp_out: PathBuf,
    pub receiver_rtp_in: PathBuf,
    pub sender_rtcp_in: PathBuf,
    pub receiver_rtcp_out: PathBuf,
    pub sender_qlog_dir: PathBuf,
    pub receiver_qlog_dir: PathBuf,
    pub qlog_extension: String,
    pub sender_cc_log: PathBuf,
    /// Directory holding the reference video named in the test case.
    pub input_dir: PathBuf,
    /// Video written by the receiver.
    pub output_video: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            config: "config.json".into(),
            ssim_log: "ssim.log".into(),
            psnr_log: "psnr.log".into(),
            sender_rtp_out: "sender_logs/rtp/rtp_out.log".into(),
            receiver_rtp_in: "receiver_logs/rtp/rtp_in.log".into(),
            sender_rtcp_in: "sender_logs/rtp/rtcp_in.log".into(),
            receiver_rtcp_out: "receiver_logs/rtp/rtcp_out.log".into(),
            sender_qlog_dir: "sender_logs/qlog".into(),
            receiver_qlog_dir: "receiver_logs/qlog".into(),
            qlog_extension: "qlog".into(),
            sender_cc_log: "sender_logs/cc.log".into(),
            input_dir: "input".into(),
            output_video: "output/out.mkv".into(),
        }
    }
}

/// `(time column, value column)` pair of a timestamped log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Columns {
    pub time: usize,
    pub value: usize,
}

impl Columns {
    pub const fn new(time: usize, value: usize) -> Self {
        Self { time, value }
    }
}

/// Column layout of every delimited log the evaluator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Field holding `All:<value>` in the SSIM log.
    pub ssim_field: usize,
    /// Field holding `psnr_avg:<value>` in the PSNR log.
    pub psnr_field: usize,
    pub rtp: Columns,
    pub rtcp: Columns,
    pub cc_target_bitrate: Columns,
    pub cc_srtt: Columns,
    pub cc_rate_transmitted: Columns,
    /// Unit of the RTP/RTCP timestamp column.
    pub packet_time_unit: TimeUnit,
    /// Unit of the congestion-controller timestamp column.
    pub cc_time_unit: TimeUnit,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            ssim_field: 4,
            psnr_field: 5,
            rtp: Columns::new(2, 8),
            rtcp: Columns::new(2, 3),
            cc_target_bitrate: Columns::new(0, 1),
            cc_srtt: Columns::new(0, 5),
            cc_rate_transmitted: Columns::new(0, 13),
            packet_time_unit: TimeUnit::Milliseconds,
            cc_time_unit: TimeUnit::Milliseconds,
        }
    }
}

/// External video-quality tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub enabled: bool,
    pub program: PathBuf,
    /// Captured stdout and stderr of the tool, relative to the run directory.
    pub log_file: PathBuf,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "ffmpeg".into(),
            log_file: "ffmpeg.log".into(),
        }
    }
}

/// Everything the evaluator needs besides the run directory. Every field
/// has a default, so an empty settings file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSettings {
    pub layout: ArtifactLayout,
    pub columns: ColumnLayout,
    pub quality: QualitySettings,
    /// Width of one throughput bucket.
    pub bucket_width_ms: u64,
}

impl Default for EvalSettings {
    fn default() -> Self {
        Self {
            layout: ArtifactLayout::default(),
            columns: ColumnLayout::default(),
            quality: QualitySettings::default(),
            bucket_width_ms: 1000,
        }
    }
}

use crate::capacity::link_capacity;
use crate::error::EvalError;
use crate::quality::{QualityJob, QualityTool};
use crate::storage::read_json;
use rtq_abstract::{Columns, EvalSettings, Metrics, RunConfig, RunResult, Series};
use rtq_core::{
    PsnrExtractor, RowExtractor, SsimExtractor, TimeValueExtractor, TraceSeries, bucket_and_sum,
    discover_trace, read_delimited, read_trace_all, rounded_mean, step_expand,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SPACE: u8 = b' ';
const TAB: u8 = b'\t';
const COMMA: u8 = b',';

/// Which endpoint produced a protocol trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Sender,
    Receiver,
}

/// Evaluates the artifacts one run left in its working directory.
pub struct RunEvaluator {
    run_dir: PathBuf,
    settings: EvalSettings,
    quality_tool: Option<Box<dyn QualityTool>>,
}

impl RunEvaluator {
    pub fn new(run_dir: impl Into<PathBuf>, settings: EvalSettings) -> Self {
        Self {
            run_dir: run_dir.into(),
            settings,
            quality_tool: None,
        }
    }

    /// Run `tool` before reading the per-frame quality logs.
    pub fn with_quality_tool(mut self, tool: Box<dyn QualityTool>) -> Self {
        self.quality_tool = Some(tool);
        self
    }

    fn path(&self, relative: &Path) -> PathBuf {
        self.run_dir.join(relative)
    }

    pub fn load_config(&self) -> Result<RunConfig, EvalError> {
        read_json(&self.path(&self.settings.layout.config))
    }

    /// Produce the complete result of the run, or the first fatal error.
    pub fn evaluate(&self) -> Result<RunResult, EvalError> {
        let config = self.load_config()?;
        info!(
            "evaluating {} / {} in {}",
            config.implementation.name,
            config.test_case.name,
            self.run_dir.display()
        );

        if let Some(tool) = &self.quality_tool {
            self.compute_quality(tool.as_ref(), &config)?;
        }

        let mut metrics = Metrics::default();
        self.frame_quality(&mut metrics)?;
        self.packet_logs(&mut metrics)?;
        self.traces(&mut metrics)?;
        self.congestion_control(&mut metrics)?;

        if let Some(end) = metrics.cc_target_bitrate.iter().map(|s| s.key).max() {
            metrics.link_capacity = link_capacity(&config.test_case.phases, end);
        }

        Ok(RunResult { config, metrics })
    }

    fn compute_quality(&self, tool: &dyn QualityTool, config: &RunConfig) -> Result<(), EvalError> {
        let layout = &self.settings.layout;
        let reference = layout.input_dir.join(&config.test_case.video_file.name);
        tool.compute(&QualityJob {
            run_dir: &self.run_dir,
            reference: &reference,
            distorted: &layout.output_video,
            ssim_log: &layout.ssim_log,
            psnr_log: &layout.psnr_log,
        })
    }

    /// Read an optional log. An absent file is `None`; anything else that
    /// goes wrong beyond tail truncation is fatal.
    fn read_optional<E>(
        &self,
        relative: &Path,
        delimiter: u8,
        extractor: &E,
    ) -> Result<Option<Series<i64>>, EvalError>
    where
        E: RowExtractor<i64>,
    {
        let path = self.path(relative);
        match read_delimited(&path, delimiter, extractor) {
            Ok(series) => {
                info!("{}: {} samples", relative.display(), series.len());
                Ok(Some(series))
            }
            Err(err) if err.is_not_found() => {
                info!("{} not found, skipping", relative.display());
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn frame_quality(&self, metrics: &mut Metrics) -> Result<(), EvalError> {
        let layout = &self.settings.layout;
        let columns = &self.settings.columns;

        let ssim = SsimExtractor {
            field: columns.ssim_field,
        };
        if let Some(series) = self.read_optional(&layout.ssim_log, SPACE, &ssim)? {
            metrics.average_ssim = rounded_mean(&series);
            metrics.per_frame_ssim = series;
        }

        let psnr = PsnrExtractor {
            field: columns.psnr_field,
        };
        if let Some(series) = self.read_optional(&layout.psnr_log, SPACE, &psnr)? {
            metrics.average_psnr = rounded_mean(&series);
            metrics.per_frame_psnr = series;
        }
        Ok(())
    }

    fn packet_log(&self, relative: &Path, columns: Columns) -> Result<Series<i64>, EvalError> {
        let extractor = TimeValueExtractor::new(columns, self.settings.columns.packet_time_unit);
        Ok(self
            .read_optional(relative, TAB, &extractor)?
            .map(|series| bucket_and_sum(&series, self.settings.bucket_width_ms))
            .unwrap_or_default())
    }

    fn packet_logs(&self, metrics: &mut Metrics) -> Result<(), EvalError> {
        let layout = &self.settings.layout;
        let columns = &self.settings.columns;
        metrics.sent_rtp = self.packet_log(&layout.sender_rtp_out, columns.rtp)?;
        metrics.received_rtp = self.packet_log(&layout.receiver_rtp_in, columns.rtp)?;
        metrics.sent_rtcp = self.packet_log(&layout.receiver_rtcp_out, columns.rtcp)?;
        metrics.received_rtcp = self.packet_log(&layout.sender_rtcp_in, columns.rtcp)?;
        Ok(())
    }

    /// Events of the single trace file of `role`, if tracing was enabled.
    pub fn trace(&self, role: Role) -> Result<Option<TraceSeries>, EvalError> {
        let layout = &self.settings.layout;
        let dir = match role {
            Role::Sender => &layout.sender_qlog_dir,
            Role::Receiver => &layout.receiver_qlog_dir,
        };
        let Some(path) = discover_trace(&self.path(dir), &layout.qlog_extension)? else {
            info!("no {:?} trace in {}, skipping", role, dir.display());
            return Ok(None);
        };
        let series = read_trace_all(&path)?;
        info!(
            "{}: {} sent, {} received, {} congestion window updates",
            path.display(),
            series.packets_sent.len(),
            series.packets_received.len(),
            series.congestion_window.len()
        );
        Ok(Some(series))
    }

    fn traces(&self, metrics: &mut Metrics) -> Result<(), EvalError> {
        let width = self.settings.bucket_width_ms;
        if let Some(sender) = self.trace(Role::Sender)? {
            metrics.qlog_sender_packets_sent = bucket_and_sum(&sender.packets_sent, width);
            metrics.qlog_sender_packets_received = bucket_and_sum(&sender.packets_received, width);
            metrics.qlog_congestion_window = step_expand(&sender.congestion_window);
        }
        if let Some(receiver) = self.trace(Role::Receiver)? {
            metrics.qlog_receiver_packets_sent = bucket_and_sum(&receiver.packets_sent, width);
            metrics.qlog_receiver_packets_received =
                bucket_and_sum(&receiver.packets_received, width);
        }
        Ok(())
    }

    fn congestion_control(&self, metrics: &mut Metrics) -> Result<(), EvalError> {
        let relative = &self.settings.layout.sender_cc_log;
        let columns = &self.settings.columns;
        let unit = columns.cc_time_unit;

        let target = TimeValueExtractor::new(columns.cc_target_bitrate, unit);
        let Some(target_bitrate) = self.read_optional(relative, COMMA, &target)? else {
            return Ok(());
        };
        metrics.average_target_bitrate = rounded_mean(&target_bitrate);
        metrics.cc_target_bitrate = target_bitrate;

        let rate = TimeValueExtractor::new(columns.cc_rate_transmitted, unit);
        let srtt = TimeValueExtractor::new(columns.cc_srtt, unit);
        match (
            self.read_optional(relative, COMMA, &rate)?,
            self.read_optional(relative, COMMA, &srtt)?,
        ) {
            (Some(rate), Some(srtt)) => {
                metrics.cc_rate_transmitted = rate;
                metrics.cc_srtt = srtt;
            }
            _ => warn!("{} disappeared while it was being read", relative.display()),
        }
        Ok(())
    }
}

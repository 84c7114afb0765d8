use crate::error::EvalError;
use rtq_abstract::QualitySettings;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

/// Inputs and outputs of one per-frame quality computation. Log paths are
/// relative to `run_dir`.
#[derive(Debug, Clone, Copy)]
pub struct QualityJob<'a> {
    pub run_dir: &'a Path,
    pub reference: &'a Path,
    pub distorted: &'a Path,
    pub ssim_log: &'a Path,
    pub psnr_log: &'a Path,
}

/// External tool that compares the sent and received video and leaves the
/// per-frame SSIM and PSNR logs on disk. Runs to completion before any log is
/// read; a failure is fatal for the run.
pub trait QualityTool {
    fn compute(&self, job: &QualityJob<'_>) -> Result<(), EvalError>;
}

/// ffmpeg with its `ssim` and `psnr` filters.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
    log_file: PathBuf,
}

impl Ffmpeg {
    pub fn new(program: impl Into<PathBuf>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            log_file: log_file.into(),
        }
    }

    pub fn from_settings(settings: &QualitySettings) -> Self {
        Self::new(settings.program.clone(), settings.log_file.clone())
    }

    fn args(job: &QualityJob<'_>) -> Vec<String> {
        vec![
            "-i".into(),
            job.reference.display().to_string(),
            "-i".into(),
            job.distorted.display().to_string(),
            "-lavfi".into(),
            format!(
                "ssim={};[0:v][1:v]psnr={}",
                job.ssim_log.display(),
                job.psnr_log.display()
            ),
            "-f".into(),
            "null".into(),
            "-".into(),
        ]
    }
}

impl QualityTool for Ffmpeg {
    fn compute(&self, job: &QualityJob<'_>) -> Result<(), EvalError> {
        let program = self.program.display().to_string();
        let log = job.run_dir.join(&self.log_file);
        let stdout = File::create(&log).map_err(|e| EvalError::io(&log, e))?;
        let stderr = stdout.try_clone().map_err(|e| EvalError::io(&log, e))?;

        info!(
            "computing video quality of {} against {}",
            job.distorted.display(),
            job.reference.display()
        );
        let status = Command::new(&self.program)
            .args(Self::args(job))
            .current_dir(job.run_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .map_err(|source| EvalError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(EvalError::QualityTool {
                program,
                status,
                log,
            });
        }
        Ok(())
    }
}

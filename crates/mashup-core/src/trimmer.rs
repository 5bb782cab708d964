//! Leading-segment extraction using FFmpeg

use crate::error::TrimError;
use crate::model::{RawAudioAsset, TrimmedClip};
use crate::probe::Prober;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Cuts the leading `[0, target)` interval out of a downloaded asset.
///
/// Assets shorter than the target yield a clip of their full length.
#[async_trait]
pub trait ClipTrimmer: Send + Sync {
    /// Consumes `asset`; its files are gone once this returns, whatever the outcome.
    async fn trim(
        &self,
        asset: RawAudioAsset,
        target_seconds: u32,
        scratch: &Path,
    ) -> Result<TrimmedClip, TrimError>;
}

/// Length of the clip cut from an asset of `available` seconds.
pub fn clip_length(available: f64, target_seconds: u32) -> Result<f64, TrimError> {
    if !available.is_finite() || available <= 0.0 {
        return Err(TrimError::EmptyInput);
    }
    Ok(available.min(f64::from(target_seconds)))
}

#[derive(Debug)]
pub struct FfmpegTrimmer {
    ffmpeg_path: PathBuf,
    prober: Prober,
    sample_rate: u32,
    channels: u8,
}

impl FfmpegTrimmer {
    pub fn new(ffmpeg_path: PathBuf, prober: Prober, sample_rate: u32, channels: u8) -> Self {
        Self {
            ffmpeg_path,
            prober,
            sample_rate,
            channels,
        }
    }
}

#[async_trait]
impl ClipTrimmer for FfmpegTrimmer {
    async fn trim(
        &self,
        asset: RawAudioAsset,
        target_seconds: u32,
        scratch: &Path,
    ) -> Result<TrimmedClip, TrimError> {
        let length = clip_length(asset.duration_seconds, target_seconds)?;
        info!("Trimming {} to {:.1}s", asset.source.label(), length);

        // Uniform PCM so the clips concatenate sample-accurately
        let clip_file = tempfile::Builder::new()
            .prefix("clip-")
            .suffix(".wav")
            .tempfile_in(scratch)?
            .into_temp_path();

        let status = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error"])
            .arg("-i")
            .arg(asset.path())
            .args(["-t", &format!("{:.3}", length)])
            .args(["-vn", "-sn", "-dn"])
            .args(["-ac", &self.channels.to_string()])
            .args(["-ar", &self.sample_rate.to_string()])
            .args(["-c:a", "pcm_s16le"])
            .arg("-y")
            .arg(&*clip_file)
            .kill_on_drop(true)
            .status()
            .await?;

        if !status.success() {
            return Err(TrimError::FfmpegFailed(status.code()));
        }

        let info = self.prober.audio_info(&clip_file).await?;
        if !info.has_audio || info.duration <= 0.0 {
            return Err(TrimError::EmptyOutput);
        }

        debug!("Trimmed clip: {} ({:.2}s)", clip_file.display(), info.duration);
        Ok(TrimmedClip::new(asset.source.clone(), clip_file, info.duration))
    }
}

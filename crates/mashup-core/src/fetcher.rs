//! Per-video audio download using yt-dlp

use crate::error::FetchError;
use crate::locator::last_line;
use crate::model::{RawAudioAsset, VideoReference};
use crate::probe::Prober;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Downloads the audio of one candidate.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Download into a fresh directory under `scratch`. Nothing is left
    /// behind under `scratch` when this returns an error.
    async fn fetch(
        &self,
        reference: &VideoReference,
        scratch: &Path,
    ) -> Result<RawAudioAsset, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub cookie_file: Option<PathBuf>,
    pub cookies_from_browser: Option<String>,
    pub socket_timeout: Option<u32>,
}

#[derive(Debug)]
pub struct YtDlpFetcher {
    yt_dlp_path: PathBuf,
    prober: Prober,
    options: FetchOptions,
}

#[derive(Debug, Clone, Deserialize)]
struct DownloadMetadata {
    id: String,
    #[serde(default)]
    duration: Option<f64>,
}

impl YtDlpFetcher {
    pub fn new(yt_dlp_path: PathBuf, prober: Prober, options: FetchOptions) -> Self {
        Self {
            yt_dlp_path,
            prober,
            options,
        }
    }

    fn build_command(&self, url: &str, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.yt_dlp_path);
        cmd.args([
            // Audio-only when offered, otherwise the smallest complete stream
            "-f", "bestaudio/best",
            "--no-playlist",
            "--no-progress",
            "--no-warnings",
            "--print-json",
        ]);
        if let Some(ref cookies) = self.options.cookie_file {
            cmd.arg("--cookies").arg(cookies);
        }
        if let Some(ref browser) = self.options.cookies_from_browser {
            cmd.args(["--cookies-from-browser", browser]);
        }
        if let Some(timeout) = self.options.socket_timeout {
            cmd.args(["--socket-timeout", &timeout.to_string()]);
        }
        cmd.arg("-o").arg(dir.join("%(id)s.%(ext)s"));
        cmd.arg(url);
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        reference: &VideoReference,
        scratch: &Path,
    ) -> Result<RawAudioAsset, FetchError> {
        info!("Downloading audio: {}", reference.label());

        // Dropped on every early return below, taking partial files with it
        let dir = tempfile::Builder::new()
            .prefix("raw-")
            .tempdir_in(scratch)?;

        let output = self.build_command(&reference.url, dir.path()).output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            return Err(classify_failure(&reference.url, output.status.code(), &stderr));
        }

        let metadata = String::from_utf8_lossy(&output.stdout)
            .lines()
            .rev()
            .find_map(|line| serde_json::from_str::<DownloadMetadata>(line).ok());

        let audio_path = find_audio_file(dir.path(), metadata.as_ref().map(|m| m.id.as_str()))?;
        if std::fs::metadata(&audio_path)?.len() == 0 {
            return Err(FetchError::EmptyAudio);
        }

        let info = self.prober.audio_info(&audio_path).await?;
        if !info.has_audio {
            return Err(FetchError::NoAudioStream);
        }

        let duration = if info.duration > 0.0 {
            info.duration
        } else {
            metadata.and_then(|m| m.duration).unwrap_or(0.0)
        };
        if duration <= 0.0 {
            return Err(FetchError::EmptyAudio);
        }

        debug!("Downloaded {} ({:.1}s)", audio_path.display(), duration);
        Ok(RawAudioAsset::new(reference.clone(), dir, audio_path, duration))
    }
}

fn classify_failure(url: &str, code: Option<i32>, stderr: &str) -> FetchError {
    let lower = stderr.to_lowercase();

    if lower.contains("not available in your country")
        || lower.contains("geo restrict")
        || lower.contains("blocked it in your country")
    {
        return FetchError::RegionBlocked(url.to_string());
    }
    if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("has been removed")
        || lower.contains("sign in to confirm your age")
    {
        return FetchError::Unavailable(url.to_string());
    }

    FetchError::ToolFailed {
        code,
        stderr: last_line(stderr),
    }
}

/// Pick the downloaded media file out of a candidate directory
fn find_audio_file(dir: &Path, video_id: Option<&str>) -> Result<PathBuf, FetchError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            !matches!(ext, "part" | "ytdl" | "json" | "jpg" | "png" | "webp")
        })
        .collect();
    files.sort();

    if let Some(id) = video_id {
        if let Some(found) = files.iter().find(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(id)
        }) {
            return Ok(found.clone());
        }
    }

    files.into_iter().next().ok_or(FetchError::NoAudioStream)
}

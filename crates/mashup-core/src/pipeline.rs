//! Pipeline orchestration: locate, then fetch and trim candidates one at a
//! time until enough clips exist, then assemble.

use crate::assembler::{FfmpegAssembler, MashupAssembler};
use crate::error::{CandidateError, MashupError};
use crate::fetcher::{AudioFetcher, FetchOptions, YtDlpFetcher};
use crate::locator::{VideoLocator, YtDlpLocator};
use crate::model::{CandidateFailure, MashupRequest, MashupResult, TrimmedClip, VideoReference};
use crate::probe::Prober;
use crate::trimmer::{ClipTrimmer, FfmpegTrimmer};
use crate::Config;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Progress events emitted while a request runs
#[derive(Debug, Clone)]
pub enum PipelineStage {
    Locating { artist: String },
    Located { candidates: usize },
    Fetching {
        index: usize,
        candidates: usize,
        acquired: usize,
        required: usize,
        label: String,
    },
    ClipReady { acquired: usize, required: usize },
    CandidateSkipped { label: String, error: String },
    Assembling { clips: usize },
    Complete { output: PathBuf, duration: Duration },
    Failed { error: String },
}

/// The four collaborators a pipeline drives
#[derive(Clone)]
pub struct Components {
    pub locator: Arc<dyn VideoLocator>,
    pub fetcher: Arc<dyn AudioFetcher>,
    pub trimmer: Arc<dyn ClipTrimmer>,
    pub assembler: Arc<dyn MashupAssembler>,
}

impl Components {
    /// yt-dlp and FFmpeg backed components
    pub fn from_config(config: &Config) -> Result<Self, MashupError> {
        let yt_dlp = config.yt_dlp_path()?;
        let ffmpeg = config.ffmpeg_path()?;
        let prober = Prober::new(config.ffprobe_path()?);

        let fetch_options = FetchOptions {
            cookie_file: config.fetch.cookie_file.clone(),
            cookies_from_browser: config.fetch.cookies_from_browser.clone(),
            socket_timeout: config.fetch.socket_timeout,
        };

        Ok(Self {
            locator: Arc::new(YtDlpLocator::new(
                yt_dlp.clone(),
                config.search.overfetch_factor,
                config.search.query_suffix.clone(),
            )),
            fetcher: Arc::new(YtDlpFetcher::new(yt_dlp, prober.clone(), fetch_options)),
            trimmer: Arc::new(FfmpegTrimmer::new(
                ffmpeg.clone(),
                prober,
                config.output.sample_rate,
                config.output.channels,
            )),
            assembler: Arc::new(FfmpegAssembler::new(ffmpeg, config.output.bitrate.clone())),
        })
    }
}

/// Runs mashup requests. Cheap to clone; each run is independent and uses
/// its own work directory.
#[derive(Clone)]
pub struct Pipeline {
    components: Components,
    temp_root: PathBuf,
    progress_tx: Option<mpsc::Sender<PipelineStage>>,
}

impl Pipeline {
    pub fn new(components: Components, temp_root: PathBuf) -> Self {
        Self {
            components,
            temp_root,
            progress_tx: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, MashupError> {
        Ok(Self::new(Components::from_config(config)?, config.temp_dir()))
    }

    pub fn with_progress(mut self, progress_tx: mpsc::Sender<PipelineStage>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    async fn emit(&self, stage: PipelineStage) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx.send(stage).await;
        }
    }

    /// Run until done or until `cancel` fires. Cancelling drops the in-flight
    /// work, which removes every temp file and kills external tools.
    pub async fn run_until_cancelled(
        &self,
        request: &MashupRequest,
        cancel: CancellationToken,
    ) -> Result<MashupResult, MashupError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Mashup for '{}' cancelled", request.artist());
                self.emit(PipelineStage::Failed { error: MashupError::Cancelled.to_string() }).await;
                Err(MashupError::Cancelled)
            }
            result = self.run(request) => result,
        }
    }

    pub async fn run(&self, request: &MashupRequest) -> Result<MashupResult, MashupError> {
        let span = tracing::info_span!("mashup", id = %uuid::Uuid::new_v4().simple());
        let start_time = Instant::now();

        let result = self.execute(request).instrument(span).await;

        match &result {
            Ok(mashup) => {
                let duration = start_time.elapsed();
                info!(
                    "Mashup complete: {} ({} clips, {:.1}s audio, took {:.1}s)",
                    mashup.output_path.display(),
                    mashup.clip_count,
                    mashup.total_duration_seconds,
                    duration.as_secs_f32()
                );
                self.emit(PipelineStage::Complete {
                    output: mashup.output_path.clone(),
                    duration,
                })
                .await;
            }
            Err(e) => {
                self.emit(PipelineStage::Failed { error: e.to_string() }).await;
            }
        }

        result
    }

    async fn execute(&self, request: &MashupRequest) -> Result<MashupResult, MashupError> {
        let required = request.video_count() as usize;

        info!("Starting mashup for '{}'", request.artist());

        // Unique per request; removing it sweeps anything a component left behind
        tokio::fs::create_dir_all(&self.temp_root).await?;
        let work_dir = tempfile::Builder::new()
            .prefix("mashup_")
            .tempdir_in(&self.temp_root)?;
        let scratch = work_dir.path().canonicalize()?;
        debug!("Work directory: {}", scratch.display());

        self.emit(PipelineStage::Locating {
            artist: request.artist().to_string(),
        })
        .await;

        let candidates = dedup_candidates(
            self.components
                .locator
                .locate(request.artist(), required)
                .await?,
        );
        let total = candidates.len();
        info!("{} unique candidates for {} clips", total, required);
        self.emit(PipelineStage::Located { candidates: total }).await;

        // Video counts are unbounded; reserve only what the candidates can fill
        let mut clips: Vec<TrimmedClip> = Vec::with_capacity(required.min(total));
        let mut skipped: Vec<CandidateFailure> = Vec::new();

        for (index, reference) in candidates.into_iter().enumerate() {
            if clips.len() == required {
                break;
            }
            if clips.len() + (total - index) < required {
                info!(
                    "Stopping early: {} candidates left cannot reach {} clips",
                    total - index,
                    required
                );
                break;
            }

            self.emit(PipelineStage::Fetching {
                index,
                candidates: total,
                acquired: clips.len(),
                required,
                label: reference.label().to_string(),
            })
            .await;

            match self.acquire(&reference, request.clip_seconds(), &scratch).await {
                Ok(clip) => {
                    clips.push(clip);
                    self.emit(PipelineStage::ClipReady {
                        acquired: clips.len(),
                        required,
                    })
                    .await;
                }
                Err(error) => {
                    warn!("Skipping {}: {}", reference.label(), error);
                    self.emit(PipelineStage::CandidateSkipped {
                        label: reference.label().to_string(),
                        error: error.to_string(),
                    })
                    .await;
                    skipped.push(CandidateFailure { reference, error });
                }
            }
        }

        if clips.len() < required {
            return Err(MashupError::InsufficientClips {
                required,
                acquired: clips.len(),
                candidates: total,
            });
        }

        self.emit(PipelineStage::Assembling { clips: clips.len() }).await;
        let mut mashup = self
            .components
            .assembler
            .assemble(&clips, request.output_path(), request.artist())
            .await?;
        mashup.skipped = skipped;

        // Clip files go with their owners, then the work directory itself
        drop(clips);
        if let Err(e) = work_dir.close() {
            warn!("Failed to remove work directory {}: {}", scratch.display(), e);
        }

        Ok(mashup)
    }

    /// Fetch and trim a single candidate
    async fn acquire(
        &self,
        reference: &VideoReference,
        clip_seconds: u32,
        scratch: &Path,
    ) -> Result<TrimmedClip, CandidateError> {
        let asset = self.components.fetcher.fetch(reference, scratch).await?;
        let clip = self
            .components
            .trimmer
            .trim(asset, clip_seconds, scratch)
            .await?;
        Ok(clip)
    }
}

/// Drop repeated identifiers, keeping the first occurrence
fn dedup_candidates(candidates: Vec<VideoReference>) -> Vec<VideoReference> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

/// Validate raw parameters, then run. Nothing touches the network when
/// validation fails.
pub async fn run_mashup(
    pipeline: &Pipeline,
    artist: &str,
    video_count: u32,
    clip_seconds: u32,
    output_path: impl Into<PathBuf>,
) -> Result<MashupResult, MashupError> {
    let request = MashupRequest::new(artist, video_count, clip_seconds, output_path)?;
    pipeline.run(&request).await
}

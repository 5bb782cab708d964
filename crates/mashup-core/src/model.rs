//! Request, intermediate and result types for a mashup run

use crate::error::{CandidateError, ValidationError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::{TempDir, TempPath};

/// `videoCount` must be strictly greater than this
pub const MIN_VIDEO_COUNT: u32 = 10;
/// `clipDurationSeconds` must be strictly greater than this
pub const MIN_CLIP_SECONDS: u32 = 20;

/// A validated mashup request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MashupRequest {
    artist: String,
    video_count: u32,
    clip_seconds: u32,
    output_path: PathBuf,
}

impl MashupRequest {
    pub fn new(
        artist: &str,
        video_count: u32,
        clip_seconds: u32,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self, ValidationError> {
        let artist = artist.trim();
        if artist.is_empty() {
            return Err(ValidationError::EmptyArtist);
        }
        if video_count <= MIN_VIDEO_COUNT {
            return Err(ValidationError::TooSmall {
                name: "NumberOfVideos".to_string(),
                minimum: MIN_VIDEO_COUNT,
            });
        }
        if clip_seconds <= MIN_CLIP_SECONDS {
            return Err(ValidationError::TooSmall {
                name: "AudioDuration".to_string(),
                minimum: MIN_CLIP_SECONDS,
            });
        }
        let output_path = output_path.into();
        if output_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptyOutput);
        }

        Ok(Self {
            artist: artist.to_string(),
            video_count,
            clip_seconds,
            output_path,
        })
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn video_count(&self) -> u32 {
        self.video_count
    }

    pub fn clip_seconds(&self) -> u32 {
        self.clip_seconds
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Parse a textual count and require it to exceed `minimum`.
pub fn parse_count(raw: &str, minimum: u32, name: &str) -> Result<u32, ValidationError> {
    let not_an_integer = || ValidationError::NotAnInteger {
        name: name.to_string(),
    };

    let value: i64 = raw.trim().parse().map_err(|_| not_an_integer())?;
    if value <= i64::from(minimum) {
        return Err(ValidationError::TooSmall {
            name: name.to_string(),
            minimum,
        });
    }
    u32::try_from(value).map_err(|_| not_an_integer())
}

/// Sanitize a free-form name into a file stem
pub fn sanitize_filename(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

    let cleaned = re.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '_');
    if cleaned.is_empty() {
        "output".to_string()
    } else {
        cleaned.to_string()
    }
}

/// A candidate video found by a locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference {
    pub id: String,
    pub url: String,
    pub title: Option<String>,
}

impl VideoReference {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title when known, id otherwise
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// Downloaded audio for one candidate.
///
/// Owns the scratch directory it was downloaded into; dropping the asset
/// removes the directory and everything in it.
#[derive(Debug)]
pub struct RawAudioAsset {
    pub source: VideoReference,
    pub duration_seconds: f64,
    path: PathBuf,
    _scratch: TempDir,
}

impl RawAudioAsset {
    /// `path` must live inside `scratch`.
    pub fn new(
        source: VideoReference,
        scratch: TempDir,
        path: PathBuf,
        duration_seconds: f64,
    ) -> Self {
        Self {
            source,
            duration_seconds,
            path,
            _scratch: scratch,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A trimmed clip ready for assembly. The file is deleted on drop.
#[derive(Debug)]
pub struct TrimmedClip {
    pub source: VideoReference,
    pub duration_seconds: f64,
    file: TempPath,
}

impl TrimmedClip {
    pub fn new(source: VideoReference, file: TempPath, duration_seconds: f64) -> Self {
        Self {
            source,
            duration_seconds,
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

/// A candidate that was skipped, and why
#[derive(Debug)]
pub struct CandidateFailure {
    pub reference: VideoReference,
    pub error: CandidateError,
}

/// The finished mashup.
#[derive(Debug)]
pub struct MashupResult {
    pub output_path: PathBuf,
    pub clip_count: usize,
    pub total_duration_seconds: f64,
    /// Clip sources in the order they appear in the output
    pub sources: Vec<VideoReference>,
    pub skipped: Vec<CandidateFailure>,
}

//! Error types for mashup-core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MashupError>;

/// Outcome of a whole mashup run.
///
/// Per-candidate failures ([`FetchError`], [`TrimError`]) never appear here;
/// the pipeline records them as [`CandidateError`]s and moves on.
#[derive(Error, Debug)]
pub enum MashupError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Search failed: {0}")]
    Locator(#[from] LocatorError),

    #[error(
        "Could only prepare {acquired} of {required} clips from {candidates} candidate videos"
    )]
    InsufficientClips {
        required: usize,
        acquired: usize,
        candidates: usize,
    },

    #[error("Assembly failed: {0}")]
    Assemble(#[from] AssembleError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mashup cancelled")]
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Singer name cannot be empty.")]
    EmptyArtist,

    #[error("Output file name cannot be empty.")]
    EmptyOutput,

    #[error("{name} must be an integer.")]
    NotAnInteger { name: String },

    #[error("{name} must be greater than {minimum}.")]
    TooSmall { name: String, minimum: u32 },
}

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("yt-dlp not found. Install with: pip install yt-dlp")]
    ToolMissing,

    #[error("yt-dlp search failed with exit code {code:?}: {stderr}")]
    SearchFailed { code: Option<i32>, stderr: String },

    #[error("No videos found for '{0}'")]
    NoCandidates(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Video unavailable or private: {0}")]
    Unavailable(String),

    #[error("Video blocked in this region: {0}")]
    RegionBlocked(String),

    #[error("yt-dlp failed with exit code {code:?}: {stderr}")]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("No audio stream available")]
    NoAudioStream,

    #[error("Downloaded audio is empty")]
    EmptyAudio,

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TrimError {
    #[error("Source audio has zero duration")]
    EmptyInput,

    #[error("FFmpeg trim failed with exit code {0:?}")]
    FfmpegFailed(Option<i32>),

    #[error("Trimmed clip is empty")]
    EmptyOutput,

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("No clips to assemble")]
    NoClips,

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("FFmpeg concatenation failed with exit code {0:?}")]
    FfmpegFailed(Option<i32>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("ffprobe failed with exit code {0:?}")]
    FfprobeFailed(Option<i32>),

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single candidate video was skipped.
#[derive(Error, Debug)]
pub enum CandidateError {
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    #[error("trim: {0}")]
    Trim(#[from] TrimError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

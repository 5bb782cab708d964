//! Output formats and their FFmpeg codec arguments

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Flac,
    Wav,
    Aac,
    Opus,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Flac => "flac",
            OutputFormat::Wav => "wav",
            OutputFormat::Aac => "m4a",
            OutputFormat::Opus => "opus",
        }
    }

    pub fn from_extension(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mp3" => Some(OutputFormat::Mp3),
            "flac" => Some(OutputFormat::Flac),
            "wav" => Some(OutputFormat::Wav),
            "aac" | "m4a" => Some(OutputFormat::Aac),
            "opus" => Some(OutputFormat::Opus),
            _ => None,
        }
    }

    /// Format implied by the output path. No extension means MP3.
    pub fn for_path(path: &Path) -> Result<Self, String> {
        match path.extension().and_then(|e| e.to_str()) {
            None => Ok(OutputFormat::Mp3),
            Some(ext) => Self::from_extension(ext).ok_or_else(|| ext.to_string()),
        }
    }

    /// FFmpeg muxer name, needed because the encoder writes to a temp name
    pub fn muxer(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Flac => "flac",
            OutputFormat::Wav => "wav",
            OutputFormat::Aac => "ipod",
            OutputFormat::Opus => "opus",
        }
    }

    pub fn codec_args(&self, bitrate: &str) -> Vec<String> {
        let args: Vec<&str> = match self {
            OutputFormat::Mp3 => vec!["-c:a", "libmp3lame", "-b:a", bitrate],
            OutputFormat::Flac => vec!["-c:a", "flac"],
            OutputFormat::Wav => vec!["-c:a", "pcm_s16le"],
            OutputFormat::Aac => vec!["-c:a", "aac", "-b:a", bitrate],
            OutputFormat::Opus => vec!["-c:a", "libopus", "-b:a", bitrate],
        };
        args.into_iter().map(String::from).collect()
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Mp3 => write!(f, "MP3"),
            OutputFormat::Flac => write!(f, "FLAC"),
            OutputFormat::Wav => write!(f, "WAV"),
            OutputFormat::Aac => write!(f, "AAC"),
            OutputFormat::Opus => write!(f, "Opus"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_path() {
        assert_eq!(OutputFormat::for_path(Path::new("out.mp3")), Ok(OutputFormat::Mp3));
        assert_eq!(OutputFormat::for_path(Path::new("out.M4A")), Ok(OutputFormat::Aac));
        assert_eq!(OutputFormat::for_path(Path::new("mashup")), Ok(OutputFormat::Mp3));
        assert_eq!(
            OutputFormat::for_path(Path::new("out.docx")),
            Err("docx".to_string())
        );
    }

    #[test]
    fn test_codec_args_use_bitrate() {
        assert_eq!(
            OutputFormat::Mp3.codec_args("192k"),
            ["-c:a", "libmp3lame", "-b:a", "192k"]
        );
        assert_eq!(OutputFormat::Flac.codec_args("192k"), ["-c:a", "flac"]);
    }
}

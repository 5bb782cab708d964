//! Audio stream inspection using ffprobe

use crate::error::ProbeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub has_audio: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u8>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl Prober {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Get audio stream info (presence, sample rate, channels, duration)
    pub async fn audio_info(&self, input: &Path) -> Result<AudioInfo, ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(input)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            debug!("ffprobe stderr: {}", String::from_utf8_lossy(&output.stderr));
            return Err(ProbeError::FfprobeFailed(output.status.code()));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!("Probed {}: {:?}", input.display(), info);
        Ok(info)
    }
}

fn parse_probe_output(json: &str) -> Result<AudioInfo, ProbeError> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let Some(audio) = audio else {
        return Ok(AudioInfo {
            has_audio: false,
            sample_rate: None,
            channels: None,
            duration: 0.0,
        });
    };

    // Container duration is more reliable than per-stream duration for webm/opus
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(audio.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(0.0);

    Ok(AudioInfo {
        has_audio: true,
        sample_rate: audio.sample_rate.as_deref().and_then(|s| s.parse().ok()),
        channels: audio.channels,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_stream() {
        let json = r#"{
            "streams": [
                {"codec_type": "video", "duration": "212.0"},
                {"codec_type": "audio", "sample_rate": "48000", "channels": 2, "duration": "211.98"}
            ],
            "format": {"duration": "212.041000"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert!(info.has_audio);
        assert_eq!(info.sample_rate, Some(48000));
        assert_eq!(info.channels, Some(2));
        assert!((info.duration - 212.041).abs() < 1e-6);
    }

    #[test]
    fn test_parse_without_audio_stream() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "10.0"}}"#;
        let info = parse_probe_output(json).unwrap();
        assert!(!info.has_audio);
        assert_eq!(info.duration, 0.0);
    }

    #[test]
    fn test_parse_falls_back_to_stream_duration() {
        let json = r#"{"streams": [{"codec_type": "audio", "duration": "30.5"}], "format": {}}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration, 30.5);
        assert_eq!(info.sample_rate, None);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(ProbeError::Parse(_))
        ));
    }
}

//! Clip concatenation using the FFmpeg concat demuxer

use crate::encoder::OutputFormat;
use crate::error::AssembleError;
use crate::model::{MashupResult, TrimmedClip};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// Joins trimmed clips, in the given order, into the final artifact tagged
/// with `artist`.
///
/// The clips stay owned by the caller and are not deleted here.
#[async_trait]
pub trait MashupAssembler: Send + Sync {
    async fn assemble(
        &self,
        clips: &[TrimmedClip],
        output: &Path,
        artist: &str,
    ) -> Result<MashupResult, AssembleError>;
}

#[derive(Debug)]
pub struct FfmpegAssembler {
    ffmpeg_path: PathBuf,
    bitrate: String,
}

impl FfmpegAssembler {
    pub fn new(ffmpeg_path: PathBuf, bitrate: String) -> Self {
        Self {
            ffmpeg_path,
            bitrate,
        }
    }
}

#[async_trait]
impl MashupAssembler for FfmpegAssembler {
    async fn assemble(
        &self,
        clips: &[TrimmedClip],
        output: &Path,
        artist: &str,
    ) -> Result<MashupResult, AssembleError> {
        if clips.is_empty() {
            return Err(AssembleError::NoClips);
        }
        let format = OutputFormat::for_path(output).map_err(AssembleError::UnsupportedFormat)?;
        info!("Concatenating {} clips into {} ({})", clips.len(), output.display(), format);

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;

        let list = write_concat_list(clips)?;

        // Encode next to the destination, then rename: no partial artifact on failure
        let staging = tempfile::Builder::new()
            .prefix(".mashup-")
            .suffix(&format!(".{}", format.extension()))
            .tempfile_in(&parent)?;

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        cmd.args(["-f", "concat", "-safe", "0"]);
        cmd.arg("-i").arg(list.path());
        cmd.args(["-vn"]);
        cmd.args(format.codec_args(&self.bitrate));
        cmd.args(["-metadata", &format!("title={} mashup", artist)]);
        cmd.args(["-metadata", &format!("artist={}", artist)]);
        cmd.args(["-f", format.muxer()]);
        cmd.arg("-y").arg(staging.path());
        cmd.kill_on_drop(true);

        let status = cmd.status().await?;
        if !status.success() {
            return Err(AssembleError::FfmpegFailed(status.code()));
        }

        staging
            .persist(output)
            .map_err(|e| AssembleError::Io(e.error))?;
        debug!("Wrote mashup: {}", output.display());

        Ok(MashupResult {
            output_path: output.to_path_buf(),
            clip_count: clips.len(),
            total_duration_seconds: clips.iter().map(|c| c.duration_seconds).sum(),
            sources: clips.iter().map(|c| c.source.clone()).collect(),
            skipped: Vec::new(),
        })
    }
}

/// Writes the concat script beside the clips, inside the request's work directory
fn write_concat_list(clips: &[TrimmedClip]) -> std::io::Result<NamedTempFile> {
    let dir = clips
        .first()
        .and_then(|clip| clip.path().parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut list = tempfile::Builder::new()
        .prefix("mashup-concat-")
        .suffix(".txt")
        .tempfile_in(dir)?;
    list.write_all(concat_list(clips).as_bytes())?;
    list.flush()?;
    Ok(list)
}

/// Concat demuxer script listing the clips in order
fn concat_list(clips: &[TrimmedClip]) -> String {
    clips
        .iter()
        .map(|clip| {
            // Relative entries resolve against the list file's directory
            let path = clip
                .path()
                .canonicalize()
                .unwrap_or_else(|_| clip.path().to_path_buf());
            format!("file '{}'\n", escape_concat_path(&path))
        })
        .collect()
}

fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawAudioAsset, VideoReference};
    use crate::probe::Prober;
    use crate::trimmer::{ClipTrimmer, FfmpegTrimmer};

    fn clip_in(dir: &Path, name: &str) -> TrimmedClip {
        let path = dir.join(name);
        std::fs::write(&path, b"RIFF").unwrap();
        TrimmedClip::new(
            VideoReference::new(name, format!("https://youtu.be/{name}")),
            tempfile::TempPath::from_path(path),
            30.0,
        )
    }

    #[test]
    fn test_escape_concat_path() {
        assert_eq!(
            escape_concat_path(Path::new("/tmp/it's here.wav")),
            r"/tmp/it'\''s here.wav"
        );
    }

    #[test]
    fn test_concat_list_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let clips = vec![clip_in(dir.path(), "b.wav"), clip_in(dir.path(), "a.wav")];

        let list = concat_list(&clips);
        let lines: Vec<_> = list.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("b.wav'"));
        assert!(lines[1].ends_with("a.wav'"));
    }

    #[test]
    fn test_concat_list_written_beside_clips() {
        let dir = tempfile::tempdir().unwrap();
        let clips = vec![clip_in(dir.path(), "a.wav"), clip_in(dir.path(), "b.wav")];

        let list = write_concat_list(&clips).unwrap();

        assert_eq!(list.path().parent(), Some(dir.path()));
        let script = std::fs::read_to_string(list.path()).unwrap();
        assert_eq!(script, concat_list(&clips));

        let path = list.path().to_path_buf();
        drop(list);
        assert!(!path.exists());
    }

    /// A `seconds` long sine tone in its own scratch directory under `dir`
    async fn sine_asset(
        ffmpeg: &Path,
        prober: &Prober,
        dir: &Path,
        name: &str,
        seconds: u32,
    ) -> RawAudioAsset {
        let scratch = tempfile::Builder::new().prefix("raw-").tempdir_in(dir).unwrap();
        let path = scratch.path().join(format!("{name}.wav"));
        let status = Command::new(ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-f", "lavfi"])
            .args(["-i", &format!("sine=frequency=440:duration={seconds}")])
            .arg("-y")
            .arg(&path)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let info = prober.audio_info(&path).await.unwrap();
        RawAudioAsset::new(
            VideoReference::new(name, format!("https://youtu.be/{name}")),
            scratch,
            path,
            info.duration,
        )
    }

    #[tokio::test]
    async fn test_trim_and_assemble_with_ffmpeg() {
        let (Ok(ffmpeg), Ok(ffprobe)) = (which::which("ffmpeg"), which::which("ffprobe")) else {
            eprintln!("ffmpeg or ffprobe not installed, skipping");
            return;
        };
        let prober = Prober::new(ffprobe);
        let trimmer = FfmpegTrimmer::new(ffmpeg.clone(), prober.clone(), 44100, 2);
        let assembler = FfmpegAssembler::new(ffmpeg.clone(), "192k".into());
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let mut clips = Vec::new();
        for (name, seconds) in [("a", 40), ("b", 40), ("c", 10)] {
            let asset = sine_asset(&ffmpeg, &prober, work.path(), name, seconds).await;
            let raw_dir = asset.path().parent().unwrap().to_path_buf();
            clips.push(trimmer.trim(asset, 25, work.path()).await.unwrap());
            assert!(!raw_dir.exists());
        }
        assert!((clips[0].duration_seconds - 25.0).abs() < 0.03);
        assert!((clips[1].duration_seconds - 25.0).abs() < 0.03);
        // Shorter than the target: keeps its full length
        assert!((clips[2].duration_seconds - 10.0).abs() < 0.03);

        let output = out.path().join("mashup.wav");
        let result = assembler.assemble(&clips, &output, "Test Artist").await.unwrap();

        assert_eq!(result.clip_count, 3);
        assert_eq!(result.output_path, output);
        let info = prober.audio_info(&output).await.unwrap();
        assert!(info.has_audio);
        assert!((info.duration - 60.0).abs() < 0.05, "got {}s", info.duration);

        // Only the artifact next to the output, no staging leftovers
        let names: Vec<String> = std::fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["mashup.wav"]);

        let clip_paths: Vec<PathBuf> = clips.iter().map(|c| c.path().to_path_buf()).collect();
        assert!(clip_paths.iter().all(|p| p.exists()));
        drop(clips);
        assert!(clip_paths.iter().all(|p| !p.exists()));
        assert!(std::fs::read_dir(work.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_assemble_rejects_empty() {
        let assembler = FfmpegAssembler::new(PathBuf::from("ffmpeg"), "192k".into());
        let dir = tempfile::tempdir().unwrap();
        let result = assembler
            .assemble(&[], &dir.path().join("out.mp3"), "t")
            .await;
        assert!(matches!(result, Err(AssembleError::NoClips)));
    }

    #[tokio::test]
    async fn test_assemble_rejects_unknown_extension() {
        let assembler = FfmpegAssembler::new(PathBuf::from("ffmpeg"), "192k".into());
        let dir = tempfile::tempdir().unwrap();
        let clips = vec![clip_in(dir.path(), "a.wav")];
        let result = assembler
            .assemble(&clips, &dir.path().join("out.docx"), "t")
            .await;
        assert!(matches!(result, Err(AssembleError::UnsupportedFormat(ext)) if ext == "docx"));
    }
}

//! Candidate video search using yt-dlp

use crate::error::LocatorError;
use crate::model::VideoReference;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info};

/// Finds candidate videos for an artist.
#[async_trait]
pub trait VideoLocator: Send + Sync {
    /// Return candidates for `artist`, more than `min_count` when the source
    /// has them. Fails only when nothing at all was found.
    async fn locate(
        &self,
        artist: &str,
        min_count: usize,
    ) -> Result<Vec<VideoReference>, LocatorError>;
}

/// Number of candidates to ask for when `min_count` clips are needed.
pub fn candidate_budget(min_count: usize, overfetch_factor: f32) -> usize {
    let factor = if overfetch_factor.is_finite() {
        overfetch_factor.max(1.0)
    } else {
        1.0
    };
    ((min_count as f64 * f64::from(factor)).ceil() as usize).max(min_count)
}

#[derive(Debug)]
pub struct YtDlpLocator {
    yt_dlp_path: PathBuf,
    overfetch_factor: f32,
    query_suffix: String,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl YtDlpLocator {
    pub fn new(yt_dlp_path: PathBuf, overfetch_factor: f32, query_suffix: String) -> Self {
        Self {
            yt_dlp_path,
            overfetch_factor,
            query_suffix,
        }
    }

    fn search_query(&self, artist: &str, count: usize) -> String {
        let terms = format!("{} {}", artist.trim(), self.query_suffix.trim());
        format!("ytsearch{}:{}", count, terms.trim())
    }
}

#[async_trait]
impl VideoLocator for YtDlpLocator {
    async fn locate(
        &self,
        artist: &str,
        min_count: usize,
    ) -> Result<Vec<VideoReference>, LocatorError> {
        let budget = candidate_budget(min_count, self.overfetch_factor);
        let query = self.search_query(artist, budget);
        info!("Searching {} candidates: {}", budget, query);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--flat-playlist", "--dump-json", "--no-warnings", "--ignore-errors"])
            .arg(&query)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LocatorError::ToolMissing,
                _ => LocatorError::Io(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let candidates = parse_search_output(&stdout);

        // --ignore-errors can exit non-zero with usable results
        if candidates.is_empty() && !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            return Err(LocatorError::SearchFailed {
                code: output.status.code(),
                stderr: last_line(&stderr),
            });
        }

        if candidates.is_empty() {
            return Err(LocatorError::NoCandidates(artist.to_string()));
        }

        info!("Found {} candidates for '{}'", candidates.len(), artist);
        Ok(candidates)
    }
}

/// Parse `--dump-json` lines, skipping unparsable ones and repeated ids.
fn parse_search_output(stdout: &str) -> Vec<VideoReference> {
    let mut seen = HashSet::new();

    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<SearchEntry>(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Skipping unparsable search line: {}", e);
                None
            }
        })
        .filter(|entry| !entry.id.is_empty() && seen.insert(entry.id.clone()))
        .map(|entry| {
            let url = entry
                .url
                .filter(|u| u.starts_with("http"))
                .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", entry.id));
            let reference = VideoReference::new(entry.id, url);
            match entry.title {
                Some(title) => reference.with_title(title),
                None => reference,
            }
        })
        .collect()
}

pub(crate) fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_budget() {
        assert_eq!(candidate_budget(11, 2.0), 22);
        assert_eq!(candidate_budget(11, 1.5), 17);
        assert_eq!(candidate_budget(11, 0.5), 11);
        assert_eq!(candidate_budget(11, f32::NAN), 11);
    }

    #[test]
    fn test_search_query() {
        let locator = YtDlpLocator::new(PathBuf::from("yt-dlp"), 2.0, "official video".into());
        assert_eq!(
            locator.search_query(" Sharry Maan ", 22),
            "ytsearch22:Sharry Maan official video"
        );

        let bare = YtDlpLocator::new(PathBuf::from("yt-dlp"), 2.0, String::new());
        assert_eq!(bare.search_query("Sharry Maan", 11), "ytsearch11:Sharry Maan");
    }

    #[test]
    fn test_parse_search_output() {
        let stdout = concat!(
            r#"{"id": "aaa", "url": "https://www.youtube.com/watch?v=aaa", "title": "First"}"#,
            "\n",
            "WARNING: not json\n",
            r#"{"id": "bbb", "title": "Second"}"#,
            "\n",
            r#"{"id": "aaa", "url": "https://www.youtube.com/watch?v=aaa", "title": "Dup"}"#,
            "\n\n",
            r#"{"id": "ccc", "url": "ccc"}"#,
            "\n",
        );

        let refs = parse_search_output(stdout);
        let ids: Vec<_> = refs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["aaa", "bbb", "ccc"]);
        assert_eq!(refs[0].title.as_deref(), Some("First"));
        assert_eq!(refs[1].url, "https://www.youtube.com/watch?v=bbb");
        assert_eq!(refs[2].url, "https://www.youtube.com/watch?v=ccc");
        assert_eq!(refs[2].label(), "ccc");
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line("a\nERROR: boom\n\n"), "ERROR: boom");
        assert_eq!(last_line(""), "");
    }
}

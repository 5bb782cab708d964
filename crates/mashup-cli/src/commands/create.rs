use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::args::{CreateArgs, USAGE};
use mashup_core::{
    config::Config,
    model::{parse_count, MIN_CLIP_SECONDS, MIN_VIDEO_COUNT},
    MashupError, MashupRequest, Pipeline, PipelineStage,
};

pub async fn run(args: &CreateArgs, config_path: Option<&Path>) -> Result<()> {
    // Validate before anything touches the network
    let request = match build_request(args) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("Input error: {}", e);
            eprintln!("{}", USAGE);
            return Err(e.into());
        }
    };

    let mut config = Config::load(config_path)?;
    if let Some(factor) = args.overfetch {
        config.search.overfetch_factor = factor;
        config.validate()?;
    }

    let (tx, mut rx) = mpsc::channel(64);
    let pipeline = Pipeline::from_config(&config)
        .context("Missing external tools; run `mashup doctor`")?
        .with_progress(tx);

    let pb = ProgressBar::new(request.video_count() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?
        .progress_chars("=>-"),
    );

    let progress_handle = tokio::spawn(async move {
        while let Some(stage) = rx.recv().await {
            match stage {
                PipelineStage::Locating { artist } => {
                    pb.set_message(format!("Searching videos for {}...", artist));
                }
                PipelineStage::Located { candidates } => {
                    pb.set_message(format!("Found {} candidates", candidates));
                }
                PipelineStage::Fetching { index, candidates, label, .. } => {
                    pb.set_message(format!(
                        "[{}/{}] {}",
                        index + 1,
                        candidates,
                        truncate(&label, 40)
                    ));
                }
                PipelineStage::ClipReady { acquired, .. } => {
                    pb.set_position(acquired as u64);
                }
                PipelineStage::CandidateSkipped { label, error } => {
                    pb.println(format!("  skipped {}: {}", truncate(&label, 40), error));
                }
                PipelineStage::Assembling { clips } => {
                    pb.set_message(format!("Merging {} clips...", clips));
                }
                PipelineStage::Complete { output, duration } => {
                    pb.finish_with_message(format!(
                        "Done: {} ({:.1}s)",
                        output.display(),
                        duration.as_secs_f32()
                    ));
                }
                PipelineStage::Failed { error } => {
                    pb.abandon_with_message(format!("Failed: {}", error));
                }
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = pipeline.run_until_cancelled(&request, cancel).await;

    // Closing the channel lets the progress task finish
    drop(pipeline);
    progress_handle.await?;

    match result {
        Ok(mashup) => {
            println!("\nMashup created successfully: {}", mashup.output_path.display());
            if !mashup.skipped.is_empty() {
                println!("Skipped {} unusable videos", mashup.skipped.len());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("\nError: {}", describe(&e));
            Err(e.into())
        }
    }
}

fn build_request(args: &CreateArgs) -> Result<MashupRequest, MashupError> {
    let videos = parse_count(&args.videos, MIN_VIDEO_COUNT, "NumberOfVideos")?;
    let duration = parse_count(&args.duration, MIN_CLIP_SECONDS, "AudioDuration")?;
    Ok(MashupRequest::new(&args.singer, videos, duration, &args.output)?)
}

/// Console wording per failure kind
fn describe(error: &MashupError) -> String {
    match error {
        MashupError::InsufficientClips { .. } => format!(
            "{}. Try a more popular singer, fewer videos, or set fetch.cookie_file and retry.",
            error
        ),
        MashupError::Locator(_) => format!("{}. Check the singer name and your connection.", error),
        MashupError::Cancelled => "Cancelled; temporary files were removed.".to_string(),
        _ => error.to_string(),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

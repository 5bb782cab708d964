use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mashup")]
#[command(author, version, about = "Build an audio mashup from a singer's videos")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Singer to search for
    #[arg(value_name = "SingerName")]
    pub singer: Option<String>,

    /// Number of videos to use (more than 10)
    #[arg(value_name = "NumberOfVideos")]
    pub videos: Option<String>,

    /// Seconds taken from the start of each video (more than 20)
    #[arg(value_name = "AudioDuration")]
    pub duration: Option<String>,

    /// Output audio file (.mp3, .flac, .wav, .m4a, .opus)
    #[arg(value_name = "OutputFileName")]
    pub output: Option<PathBuf>,

    /// Candidates searched per required video
    #[arg(long, value_name = "FACTOR")]
    pub overfetch: Option<f32>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the web form that emails zipped mashups
    Serve {
        /// Listen address (overrides web.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Check external tool dependencies
    Doctor,

    /// Show configuration
    Config,
}

/// The four positional arguments of a mashup run
#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub singer: String,
    pub videos: String,
    pub duration: String,
    pub output: PathBuf,
    pub overfetch: Option<f32>,
}

pub const USAGE: &str =
    "Usage: mashup <SingerName> <NumberOfVideos> <AudioDuration> <OutputFileName>";

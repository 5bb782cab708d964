//! mashup-core: Core pipeline for building audio mashups from an artist's videos

pub mod assembler;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fetcher;
pub mod locator;
pub mod model;
pub mod pipeline;
pub mod probe;
pub mod trimmer;

pub use config::Config;
pub use error::{MashupError, Result};
pub use model::{MashupRequest, MashupResult, VideoReference};
pub use pipeline::{run_mashup, Pipeline, PipelineStage};

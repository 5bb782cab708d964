//! Error types for artifact delivery

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeliverError {
    #[error("SMTP setting missing: smtp.{0}")]
    MissingSetting(&'static str),

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("ZIP packaging failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Artifact has no file name: {0}")]
    InvalidArtifact(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

//! Delivery collaborators for mashup artifacts
//!
//! - ZIP packaging of the finished audio file
//! - SMTP email with the archive attached

mod archive;
mod error;
mod mail;

pub use archive::zip_artifact;
pub use error::DeliverError;
pub use mail::{parse_recipient, Mailer, SmtpSettings};

pub use lettre::message::Mailbox;

//! SMTP delivery of the zipped mashup

use crate::error::DeliverError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mashup_core::config::SmtpConfig;
use std::path::Path;
use tracing::info;

const SUBJECT: &str = "Your Mashup ZIP File";
const BODY: &str = "Please find your requested mashup zip file attached.";

/// Complete SMTP settings, checked once at startup
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: Mailbox,
}

impl SmtpSettings {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DeliverError> {
        let host = required(&config.host, "host")?;
        let username = required(&config.username, "username")?;
        let password = required(&config.password, "password")?;
        let from = config
            .from
            .clone()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| username.clone());

        Ok(Self {
            host,
            port: config.port,
            username,
            password,
            from: from.parse()?,
        })
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, DeliverError> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(DeliverError::MissingSetting(name))
}

/// Parse and normalize a recipient address
pub fn parse_recipient(address: &str) -> Result<Mailbox, DeliverError> {
    Ok(address.trim().parse()?)
}

pub struct Mailer {
    settings: SmtpSettings,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Mailer {
    pub fn new(settings: SmtpSettings) -> Result<Self, DeliverError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            settings,
            transport,
        })
    }

    /// Email `archive` to `to` as a ZIP attachment
    pub async fn send_archive(&self, to: Mailbox, archive: &Path) -> Result<(), DeliverError> {
        let message = build_message(self.settings.from.clone(), to.clone(), archive).await?;

        info!("Sending {} to {}", archive.display(), to);
        self.transport.send(message).await?;
        Ok(())
    }
}

async fn build_message(from: Mailbox, to: Mailbox, archive: &Path) -> Result<Message, DeliverError> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DeliverError::InvalidArtifact(archive.display().to_string()))?
        .to_string();
    let bytes = tokio::fs::read(archive).await?;

    let zip_type = ContentType::parse("application/zip")
        .map_err(|_| DeliverError::InvalidArtifact(filename.clone()))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(Attachment::new(filename).body(bytes, zip_type)),
        )?;

    Ok(message)
}

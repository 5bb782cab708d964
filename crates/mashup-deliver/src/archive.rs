//! ZIP packaging of the finished mashup

use crate::error::DeliverError;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate `source` into a single-entry archive at `archive`.
///
/// The entry is named after the source file. A failed write leaves no
/// archive behind.
pub async fn zip_artifact(source: &Path, archive: &Path) -> Result<PathBuf, DeliverError> {
    let source = source.to_path_buf();
    let archive = archive.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let result = write_archive(&source, &archive);
        if result.is_err() {
            let _ = std::fs::remove_file(&archive);
        }
        result.map(|_| archive)
    })
    .await?
}

fn write_archive(source: &Path, archive: &Path) -> Result<(), DeliverError> {
    let entry_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DeliverError::InvalidArtifact(source.display().to_string()))?
        .to_string();

    info!("Packaging {} into {}", entry_name, archive.display());

    let mut input = File::open(source)?;
    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive)?));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(false);

    zip.start_file(entry_name, options)?;
    let written = std::io::copy(&mut input, &mut zip)?;
    zip.finish()?;

    debug!("Archived {} bytes", written);
    Ok(())
}

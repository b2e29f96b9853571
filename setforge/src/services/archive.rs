//! Playlist archive writer

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the ordering notes inside every archive
pub const EXPLANATION_FILE: &str = "playlist_explanation.txt";

/// One stored file copied into the archive
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    pub source: PathBuf,
    /// Entry name inside the archive
    pub name: String,
}

/// Write `members` plus the explanation file to `dest`
///
/// Audio is stored uncompressed. The archive is assembled next to `dest`
/// and renamed into place, so `dest` is either absent or complete.
pub fn write_playlist_archive(dest: &Path, members: &[ArchiveMember], explanation: &str) -> Result<()> {
    let partial = dest.with_extension("zip.part");

    let result = write_to(&partial, members, explanation)
        .and_then(|()| {
            std::fs::rename(&partial, dest)
                .with_context(|| format!("Failed to move archive into {}", dest.display()))
        });

    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}

fn write_to(path: &Path, members: &[ArchiveMember], explanation: &str) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create archive {}", path.display()))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);

    for member in members {
        let mut source = File::open(&member.source)
            .with_context(|| format!("Failed to open stored track {}", member.source.display()))?;
        zip.start_file(member.name.as_str(), options)
            .with_context(|| format!("Failed to add {} to archive", member.name))?;
        io::copy(&mut source, &mut zip)
            .with_context(|| format!("Failed to copy {} into archive", member.name))?;
    }

    zip.start_file(EXPLANATION_FILE, options)
        .context("Failed to add playlist explanation")?;
    zip.write_all(explanation.as_bytes())
        .context("Failed to write playlist explanation")?;

    let mut writer = zip.finish().context("Failed to finalize archive")?;
    writer.flush().context("Failed to flush archive")?;
    writer
        .get_ref()
        .sync_all()
        .context("Failed to sync archive")?;

    Ok(())
}

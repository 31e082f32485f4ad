use std::{
    fs,
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use tracing::{info, warn};

use crate::error::ResolveError;

/// Extracts `archive` into `work_dir` and returns the payload root.
///
/// The format is chosen by file extension (`.zip`, or `.tar.gz`/`.tgz`).
/// Afterwards stray top-level plain files are removed best-effort; the
/// first top-level directory becomes the payload root, additional ones are
/// warned about and ignored. An archive without a top-level directory is
/// an extraction error.
pub fn extract(archive: &Path, work_dir: &Path) -> Result<PathBuf, ResolveError> {
    fs::create_dir_all(work_dir)?;
    let name = archive.to_string_lossy();

    info!(
        "Extracting archive {} into {}",
        archive.display(),
        work_dir.display()
    );

    if name.ends_with(".zip") {
        let file = fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| ResolveError::extraction(format!("failed to open zip archive: {e}")))?;
        zip.extract(work_dir)
            .map_err(|e| ResolveError::extraction(format!("failed to extract zip archive: {e}")))?;
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = fs::File::open(archive)?;
        let mut tar = tar::Archive::new(GzDecoder::new(file));
        tar.unpack(work_dir)
            .map_err(|e| ResolveError::extraction(format!("failed to extract tar archive: {e}")))?;
    } else {
        return Err(ResolveError::extraction(format!(
            "unsupported archive format: {name} (expected .zip, .tar.gz, or .tgz)"
        )));
    }

    payload_root(work_dir)
}

/// Picks the single payload root among the top-level entries of `work_dir`.
fn payload_root(work_dir: &Path) -> Result<PathBuf, ResolveError> {
    let mut root: Option<PathBuf> = None;

    for entry in fs::read_dir(work_dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if root.is_none() {
                root = Some(entry.path());
            } else {
                warn!(
                    "Ignoring extra top-level directory {}",
                    entry.path().display()
                );
            }
        } else {
            // Stray top-level files are not part of the installable unit.
            if let Err(e) = fs::remove_file(entry.path()) {
                warn!(
                    "Could not remove stray file {}: {}",
                    entry.path().display(),
                    e
                );
            }
        }
    }

    root.ok_or_else(|| {
        ResolveError::extraction(format!(
            "archive contained no top-level directory under {}",
            work_dir.display()
        ))
    })
}

/// Relocates the payload root to its final location in the library.
///
/// An already-occupied destination is skipped and treated as success so
/// downstream logic can rely on the location being populated.
pub fn place(payload_root: &Path, dest: &Path) -> Result<(), ResolveError> {
    if dest.exists() {
        warn!(
            "Destination {} already exists; keeping the existing install",
            dest.display()
        );
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(payload_root, dest)?;
    Ok(())
}

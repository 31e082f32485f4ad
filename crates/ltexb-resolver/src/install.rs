use std::{
    fs,
    path::{Path, PathBuf},
};

use semver::Version;
use tracing::{info, warn};
use uuid::Uuid;

use crate::digest;
use crate::download;
use crate::error::ResolveError;
use crate::extract;
use crate::locate::InstalledLocation;
use crate::platform::DependencySpec;
use crate::progress::ProgressStack;

// Weights of the install stages within the parent frame.
const SETUP_WEIGHT: f64 = 0.1;
const DOWNLOAD_WEIGHT: f64 = 0.7;
const VERIFY_WEIGHT: f64 = 0.1;
const PLACE_WEIGHT: f64 = 0.1;

/// Downloads, verifies, extracts, and places one artifact into the
/// library directory.
///
/// Stage failures propagate unchanged; there is no retry inside a single
/// call. The staging directory is removed best-effort either way.
pub async fn install(
    spec: &DependencySpec,
    library_dir: &Path,
    progress: &mut ProgressStack,
) -> Result<InstalledLocation, ResolveError> {
    let staging = library_dir.join(format!(".staging-{}", Uuid::new_v4()));
    let result = run_stages(spec, library_dir, &staging, progress).await;
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(&staging) {
            warn!("Could not clean staging dir {}: {}", staging.display(), e);
        }
    }
    result
}

async fn run_stages(
    spec: &DependencySpec,
    library_dir: &Path,
    staging: &Path,
    progress: &mut ProgressStack,
) -> Result<InstalledLocation, ResolveError> {
    info!("Installing {} {} from {}", spec.name, spec.version, spec.url);

    progress.start_task(SETUP_WEIGHT, format!("Preparing {}", spec.name));
    fs::create_dir_all(staging)?;
    let archive = staging.join(artifact_file_name(spec));
    progress.finish_task();

    progress.start_task(DOWNLOAD_WEIGHT, format!("Downloading {}", spec.name));
    download::download(&spec.url, &archive, progress).await?;
    progress.finish_task();

    progress.start_task(VERIFY_WEIGHT, format!("Verifying {}", spec.name));
    digest::verify(&archive, &spec.sha256)?;
    progress.finish_task();

    progress.start_task(PLACE_WEIGHT, format!("Extracting {}", spec.name));
    let work_dir = staging.join("extracted");
    let payload_root = extract::extract(&archive, &work_dir)?;
    let dest = destination_for(&payload_root, library_dir)?;
    extract::place(&payload_root, &dest)?;
    progress.finish_task();

    info!("Installed {} at {}", spec.name, dest.display());

    Ok(InstalledLocation {
        path: dest,
        version: Version::parse(&spec.version).ok(),
    })
}

fn artifact_file_name(spec: &DependencySpec) -> String {
    spec.url
        .rsplit('/')
        .next()
        .and_then(|name| name.split('?').next())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("{}-{}.{}", spec.name, spec.version, spec.archive.extension()))
}

fn destination_for(payload_root: &Path, library_dir: &Path) -> Result<PathBuf, ResolveError> {
    let name = payload_root.file_name().ok_or_else(|| {
        ResolveError::extraction(format!(
            "payload root {} has no directory name",
            payload_root.display()
        ))
    })?;
    Ok(library_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ArchiveKind;

    fn spec(url: &str) -> DependencySpec {
        DependencySpec {
            name: "ltex-ls",
            version: "15.2.0".to_string(),
            url: url.to_string(),
            archive: ArchiveKind::TarGz,
            sha256: "0".repeat(64),
        }
    }

    #[test]
    fn artifact_name_comes_from_the_url() {
        let spec = spec("https://host/releases/15.2.0/ltex-ls-15.2.0.tar.gz");
        assert_eq!(artifact_file_name(&spec), "ltex-ls-15.2.0.tar.gz");
    }

    #[test]
    fn artifact_name_falls_back_to_spec_fields() {
        let spec = spec("https://host/releases/");
        assert_eq!(artifact_file_name(&spec), "ltex-ls-15.2.0.tar.gz");
    }
}

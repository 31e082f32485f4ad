use std::{
    fs,
    path::{Path, PathBuf},
};

use semver::Version;
use tracing::debug;

use crate::platform::{runtime_dir_name, Os};

/// A resolved dependency root on disk.
#[derive(Clone, Debug)]
pub struct InstalledLocation {
    pub path: PathBuf,
    pub version: Option<Version>,
}

impl InstalledLocation {
    pub fn unversioned(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            version: None,
        }
    }
}

/// Picks the highest-versioned `<name_prefix>-<semver>` directory under
/// `library_dir`. Entries whose suffix does not parse as a semantic
/// version are skipped, not errors.
pub fn locate(library_dir: &Path, name_prefix: &str) -> Option<InstalledLocation> {
    let entries = match fs::read_dir(library_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(
                "Library directory {} not readable: {}",
                library_dir.display(),
                e
            );
            return None;
        }
    };

    let prefix = format!("{name_prefix}-");
    let mut best: Option<InstalledLocation> = None;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        let Ok(version) = Version::parse(suffix) else {
            debug!("Skipping {} (suffix is not a semantic version)", name);
            continue;
        };
        let better = match &best {
            Some(current) => current.version.as_ref() < Some(&version),
            None => true,
        };
        if better {
            best = Some(InstalledLocation {
                path: entry.path(),
                version: Some(version),
            });
        }
    }

    best
}

/// Fixed-name search for the bundled Java runtime home.
///
/// The extracted runtime always lands at `jdk-<pinned>-jre`; on macOS the
/// usable home is nested under `Contents/Home`.
pub fn bundled_runtime_home(library_dir: &Path, os: Os) -> Option<PathBuf> {
    let mut home = library_dir.join(runtime_dir_name());
    if os == Os::Mac {
        home = home.join("Contents/Home");
    }
    home.is_dir().then_some(home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_highest_parsable_version() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["ltex-ls-8.0.0", "ltex-ls-9.1.0", "ltex-ls-invalidtag"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        let found = locate(dir.path(), "ltex-ls").unwrap();
        assert_eq!(found.path, dir.path().join("ltex-ls-9.1.0"));
        assert_eq!(found.version, Some(Version::new(9, 1, 0)));
    }

    #[test]
    fn returns_none_when_nothing_parses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("ltex-ls-nightly")).unwrap();
        fs::create_dir(dir.path().join("unrelated")).unwrap();
        assert!(locate(dir.path(), "ltex-ls").is_none());
    }

    #[test]
    fn missing_library_directory_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate(&dir.path().join("nope"), "ltex-ls").is_none());
    }

    #[test]
    fn bundled_runtime_respects_mac_nesting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(runtime_dir_name());
        fs::create_dir_all(root.join("Contents/Home")).unwrap();

        assert_eq!(bundled_runtime_home(dir.path(), Os::Linux), Some(root.clone()));
        assert_eq!(
            bundled_runtime_home(dir.path(), Os::Mac),
            Some(root.join("Contents/Home"))
        );
    }

    #[test]
    fn bundled_runtime_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(bundled_runtime_home(dir.path(), Os::Linux).is_none());
    }
}

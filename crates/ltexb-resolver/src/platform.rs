use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Deserialize;
use tracing::warn;

use crate::error::ResolveError;

pub const SERVER_NAME: &str = "ltex-ls";
pub const SERVER_VERSION: &str = "15.2.0";
pub const RUNTIME_VERSION: &str = "11.0.12+7";

const SERVER_RELEASE_BASE: &str = "https://github.com/valentjn/ltex-ls/releases/download";
const RUNTIME_RELEASE_BASE: &str = "https://github.com/adoptium/temurin11-binaries/releases/download";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Os {
    Linux,
    Windows,
    Mac,
}

impl Os {
    pub fn key(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::Mac => "mac",
        }
    }

    /// Archive format the runtime vendor ships for this platform.
    pub fn archive_kind(self) -> ArchiveKind {
        match self {
            Os::Windows => ArchiveKind::Zip,
            _ => ArchiveKind::TarGz,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    X64,
    X86_32,
    Arm,
    Aarch64,
    Ppc64,
    S390x,
}

impl Arch {
    pub fn key(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86_32 => "x86-32",
            Arch::Arm => "arm",
            Arch::Aarch64 => "aarch64",
            Arch::Ppc64 => "ppc64",
            Arch::S390x => "s390x",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub fn detect() -> Result<Self, ResolveError> {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "windows" => Os::Windows,
            "macos" => Os::Mac,
            other => {
                return Err(ResolveError::config(format!(
                    "unsupported operating system: {other}"
                )))
            }
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X64,
            "x86" => Arch::X86_32,
            "arm" => Arch::Arm,
            "aarch64" => Arch::Aarch64,
            "powerpc64" => Arch::Ppc64,
            "s390x" => Arch::S390x,
            other => {
                return Err(ResolveError::config(format!(
                    "unsupported cpu architecture: {other}"
                )))
            }
        };
        Ok(Platform { os, arch })
    }
}

/// One concrete artifact to acquire: where to get it, what it must hash to.
#[derive(Clone, Debug)]
pub struct DependencySpec {
    pub name: &'static str,
    pub version: String,
    pub url: String,
    pub archive: ArchiveKind,
    pub sha256: String,
}

/// Spec for the pinned ltex-ls release. The server ships a single
/// platform-independent tar.gz.
pub fn server_spec() -> Result<DependencySpec, ResolveError> {
    let artifact = format!("{SERVER_NAME}-{SERVER_VERSION}.tar.gz");
    let sha256 = digest_for(&artifact)?;
    Ok(DependencySpec {
        name: SERVER_NAME,
        version: SERVER_VERSION.to_string(),
        url: format!("{SERVER_RELEASE_BASE}/{SERVER_VERSION}/{artifact}"),
        archive: ArchiveKind::TarGz,
        sha256,
    })
}

/// Spec for the pinned Java runtime on `platform`.
pub fn runtime_spec(platform: Platform) -> Result<DependencySpec, ResolveError> {
    let artifact = runtime_artifact_name(platform);
    let sha256 = digest_for(&artifact)?;
    let tag = format!("jdk-{}", RUNTIME_VERSION.replace('+', "%2B"));
    Ok(DependencySpec {
        name: "jre",
        version: RUNTIME_VERSION.to_string(),
        url: format!("{RUNTIME_RELEASE_BASE}/{tag}/{artifact}"),
        archive: platform.os.archive_kind(),
        sha256,
    })
}

pub fn runtime_artifact_name(platform: Platform) -> String {
    format!(
        "OpenJDK11U-jre_{}_{}_hotspot_{}.{}",
        platform.arch.key(),
        platform.os.key(),
        RUNTIME_VERSION.replace('+', "_"),
        platform.os.archive_kind().extension()
    )
}

/// Directory the extracted runtime archive unpacks to.
pub fn runtime_dir_name() -> String {
    format!("jdk-{RUNTIME_VERSION}-jre")
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DigestTable {
    artifacts: HashMap<String, String>,
}

fn digest_table() -> &'static HashMap<String, String> {
    static TABLE: OnceLock<HashMap<String, String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let raw = include_str!("../digests.json");
        match serde_json::from_str::<DigestTable>(raw) {
            Ok(table) => table.artifacts,
            Err(err) => {
                warn!("Failed to parse embedded digest table: {err}");
                HashMap::new()
            }
        }
    })
}

fn digest_for(artifact: &str) -> Result<String, ResolveError> {
    digest_table().get(artifact).cloned().ok_or_else(|| {
        ResolveError::config(format!(
            "no known digest for {artifact}; this platform is not supported"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_artifact_name_encodes_platform_and_version() {
        let platform = Platform {
            os: Os::Linux,
            arch: Arch::X64,
        };
        assert_eq!(
            runtime_artifact_name(platform),
            "OpenJDK11U-jre_x64_linux_hotspot_11.0.12_7.tar.gz"
        );
        let platform = Platform {
            os: Os::Windows,
            arch: Arch::X86_32,
        };
        assert_eq!(
            runtime_artifact_name(platform),
            "OpenJDK11U-jre_x86-32_windows_hotspot_11.0.12_7.zip"
        );
    }

    #[test]
    fn windows_implies_zip_everything_else_tar_gz() {
        assert_eq!(Os::Windows.archive_kind(), ArchiveKind::Zip);
        assert_eq!(Os::Linux.archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Os::Mac.archive_kind(), ArchiveKind::TarGz);
    }

    #[test]
    fn server_spec_is_resolvable_from_the_embedded_table() {
        let spec = server_spec().unwrap();
        assert_eq!(spec.name, "ltex-ls");
        assert!(spec.url.ends_with("ltex-ls-15.2.0.tar.gz"));
        assert_eq!(spec.sha256.len(), 64);
    }

    #[test]
    fn unknown_artifact_is_a_config_error() {
        let err = digest_for("OpenJDK11U-jre_mips_plan9_hotspot_0.zip").unwrap_err();
        assert!(matches!(err, ResolveError::Config(_)), "{err}");
    }
}

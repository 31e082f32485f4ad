use std::path::PathBuf;

/// Host-owned configuration consumed by the resolution ladders.
///
/// The host (editor shell, CLI) owns where these values come from; the
/// resolver only reads them.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    /// Override path for an already-installed server bundle.
    pub server_path: Option<String>,
    /// Override path for a Java runtime home.
    pub java_path: Option<String>,
    /// Probe the system-wide Java on macOS even though doing so can
    /// trigger the OS "install a JDK" dialog.
    pub force_try_system_wide_java: bool,
    /// Initial Java heap size hint in MB (`-Xms`).
    pub initial_java_heap_mb: Option<u32>,
    /// Maximum Java heap size hint in MB (`-Xmx`).
    pub maximum_java_heap_mb: Option<u32>,
    /// Library root for installed bundles; defaults to the ltexb data dir.
    pub library_dir: Option<PathBuf>,
}

impl Settings {
    pub fn library_dir(&self) -> PathBuf {
        self.library_dir
            .clone()
            .unwrap_or_else(ltexb_util::library_dir)
    }
}

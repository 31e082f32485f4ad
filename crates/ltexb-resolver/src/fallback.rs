//! Resolution ladders for the server bundle and the Java runtime.
//!
//! Both ladders are explicit state machines. The server bundle gets one
//! pass; the runtime gets three attempts, each advancing the strategy,
//! with a self-test after every attempt that produces a candidate.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::ResolveError;
use crate::install;
use crate::launch::{server_executable, ExecutableSpec};
use crate::locate::{bundled_runtime_home, locate, InstalledLocation};
use crate::paths;
use crate::platform::{runtime_spec, server_spec, DependencySpec, Os, Platform, SERVER_NAME};
use crate::progress::{NullListener, ProgressListener, ProgressStack};
use crate::selftest::{self, SelfTestResult};
use crate::settings::Settings;

const RUNTIME_ATTEMPTS: usize = 3;

/// Factory for per-install progress listeners; each install/download call
/// gets a fresh progress stack.
pub type ListenerFactory = Box<dyn Fn() -> Box<dyn ProgressListener> + Send>;

/// Final outcome of a successful resolution, cached for the session.
#[derive(Clone, Debug)]
pub struct ResolvedDependencies {
    pub server: InstalledLocation,
    pub runtime_home: Option<PathBuf>,
    pub executable: ExecutableSpec,
    pub self_test: SelfTestResult,
}

/// States of the single-pass server-bundle ladder.
#[derive(Debug)]
enum ServerState {
    OverrideCheck,
    LocalSearch,
    Download,
    Accept(InstalledLocation),
    Fail,
}

/// Strategy taken by each runtime attempt, indexed by attempt number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuntimeStrategy {
    OverrideOrAmbient,
    LocalSearch,
    DownloadThenSearch,
}

impl RuntimeStrategy {
    fn for_attempt(attempt: usize) -> Self {
        match attempt {
            0 => RuntimeStrategy::OverrideOrAmbient,
            1 => RuntimeStrategy::LocalSearch,
            _ => RuntimeStrategy::DownloadThenSearch,
        }
    }
}

/// Outcome of one runtime attempt's path resolution.
enum RuntimeOutcome {
    /// Self-test with this runtime home (None means ambient default).
    Candidate(Option<PathBuf>),
    /// Move on to the next attempt without self-testing.
    Skip,
}

pub struct FallbackController {
    settings: Settings,
    platform: Platform,
    server: DependencySpec,
    runtime: DependencySpec,
    listener_factory: ListenerFactory,
    resolved: Option<ResolvedDependencies>,
}

impl FallbackController {
    pub fn new(settings: Settings) -> Result<Self, ResolveError> {
        let platform = Platform::detect()?;
        let server = server_spec()?;
        let runtime = runtime_spec(platform)?;
        Ok(Self::with_specs(settings, platform, server, runtime))
    }

    /// Construction seam used by tests and by hosts that pin their own
    /// artifact sources.
    pub fn with_specs(
        settings: Settings,
        platform: Platform,
        server: DependencySpec,
        runtime: DependencySpec,
    ) -> Self {
        Self {
            settings,
            platform,
            server,
            runtime,
            listener_factory: Box::new(|| Box::new(NullListener)),
            resolved: None,
        }
    }

    pub fn with_listener_factory(mut self, factory: ListenerFactory) -> Self {
        self.listener_factory = factory;
        self
    }

    /// Runs both ladders. The result of a successful run is cached; later
    /// calls return it without re-resolving.
    pub async fn resolve(&mut self) -> Result<ResolvedDependencies, ResolveError> {
        if let Some(resolved) = &self.resolved {
            return Ok(resolved.clone());
        }

        let server = self.resolve_server().await?;
        info!("Server bundle resolved at {}", server.path.display());

        let resolved = self.resolve_runtime_and_test(server).await?;
        self.resolved = Some(resolved.clone());
        Ok(resolved)
    }

    /// Single pass: OverrideCheck → LocalSearch → Download → Accept/Fail.
    async fn resolve_server(&self) -> Result<InstalledLocation, ResolveError> {
        let library_dir = self.settings.library_dir();
        let mut downloaded = false;
        let mut state = ServerState::OverrideCheck;

        loop {
            state = match state {
                ServerState::OverrideCheck => match &self.settings.server_path {
                    Some(raw) => match paths::resolve_override(raw) {
                        Ok(path) => {
                            info!("Using configured server bundle at {}", path.display());
                            ServerState::Accept(InstalledLocation::unversioned(path))
                        }
                        Err(e) => {
                            warn!("Ignoring server override: {e}");
                            ServerState::LocalSearch
                        }
                    },
                    None => ServerState::LocalSearch,
                },

                ServerState::LocalSearch => match locate(&library_dir, SERVER_NAME) {
                    Some(found) => ServerState::Accept(found),
                    None if !downloaded => ServerState::Download,
                    None => ServerState::Fail,
                },

                ServerState::Download => {
                    downloaded = true;
                    match self.install_dependency(&self.server).await {
                        Ok(_) => ServerState::LocalSearch,
                        Err(e) => {
                            warn!("Server bundle install failed: {e}");
                            ServerState::Fail
                        }
                    }
                }

                ServerState::Accept(found) => return Ok(found),

                ServerState::Fail => {
                    return Err(ResolveError::Exhausted {
                        dependency: "server bundle",
                    })
                }
            };
        }
    }

    /// Up to three runtime attempts, self-testing after each candidate.
    async fn resolve_runtime_and_test(
        &self,
        server: InstalledLocation,
    ) -> Result<ResolvedDependencies, ResolveError> {
        for attempt in 0..RUNTIME_ATTEMPTS {
            let strategy = RuntimeStrategy::for_attempt(attempt);
            let outcome = self.run_runtime_attempt(strategy).await;

            let runtime_home = match outcome {
                RuntimeOutcome::Candidate(home) => home,
                RuntimeOutcome::Skip => {
                    info!("Runtime attempt {attempt} produced no candidate; moving on");
                    continue;
                }
            };

            let executable = server_executable(
                &server.path,
                runtime_home.as_deref(),
                &self.settings,
                self.platform.os,
            );
            let result = selftest::run(&executable).await;
            if result.success {
                info!(
                    "Self-test passed (server {}, runtime {})",
                    result.bundle_version.as_deref().unwrap_or("?"),
                    result.runtime_version.as_deref().unwrap_or("?")
                );
                return Ok(ResolvedDependencies {
                    server,
                    runtime_home,
                    executable,
                    self_test: result,
                });
            }
            warn!(
                "Self-test failed on attempt {attempt}: {}",
                result.failure.as_deref().unwrap_or("unknown reason")
            );
        }

        Err(ResolveError::Exhausted {
            dependency: "runtime bundle",
        })
    }

    async fn run_runtime_attempt(&self, strategy: RuntimeStrategy) -> RuntimeOutcome {
        let library_dir = self.settings.library_dir();

        match strategy {
            RuntimeStrategy::OverrideOrAmbient => {
                if let Some(raw) = &self.settings.java_path {
                    return match paths::resolve_override(raw) {
                        Ok(path) => {
                            info!("Using configured runtime at {}", path.display());
                            RuntimeOutcome::Candidate(Some(path))
                        }
                        Err(e) => {
                            warn!("Ignoring runtime override: {e}");
                            RuntimeOutcome::Skip
                        }
                    };
                }
                if ambient_probe_allowed(
                    self.platform.os,
                    self.settings.force_try_system_wide_java,
                ) {
                    RuntimeOutcome::Candidate(None)
                } else {
                    // Probing the system Java on macOS pops an OS dialog.
                    info!("Skipping ambient runtime probe on this platform");
                    RuntimeOutcome::Skip
                }
            }

            RuntimeStrategy::LocalSearch => {
                match bundled_runtime_home(&library_dir, self.platform.os) {
                    Some(home) => RuntimeOutcome::Candidate(Some(home)),
                    None => RuntimeOutcome::Skip,
                }
            }

            RuntimeStrategy::DownloadThenSearch => {
                let mut home = bundled_runtime_home(&library_dir, self.platform.os);
                if home.is_none() {
                    if let Err(e) = self.install_dependency(&self.runtime).await {
                        warn!("Runtime install failed: {e}");
                    }
                    home = bundled_runtime_home(&library_dir, self.platform.os);
                }
                // Last attempt self-tests even without a bundled runtime;
                // the ambient default may still work.
                RuntimeOutcome::Candidate(home)
            }
        }
    }

    async fn install_dependency(
        &self,
        spec: &DependencySpec,
    ) -> Result<InstalledLocation, ResolveError> {
        let mut progress = ProgressStack::new(
            format!("Installing {} {}", spec.name, spec.version),
            (self.listener_factory)(),
        );
        install::install(spec, &self.settings.library_dir(), &mut progress).await
    }
}

/// Whether attempt 0 may probe the system-wide runtime without an
/// explicit override.
fn ambient_probe_allowed(os: Os, force: bool) -> bool {
    os != Os::Mac || force
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, ArchiveKind};

    fn dead_spec(name: &'static str) -> DependencySpec {
        DependencySpec {
            name,
            version: "15.2.0".to_string(),
            // Nothing listens here; downloads fail fast.
            url: "http://127.0.0.1:9/artifact.tar.gz".to_string(),
            archive: ArchiveKind::TarGz,
            sha256: "0".repeat(64),
        }
    }

    fn controller(settings: Settings) -> FallbackController {
        let platform = Platform {
            os: Os::Linux,
            arch: Arch::X64,
        };
        FallbackController::with_specs(settings, platform, dead_spec("ltex-ls"), dead_spec("jre"))
    }

    #[test]
    fn strategy_table_matches_attempt_indices() {
        assert_eq!(
            RuntimeStrategy::for_attempt(0),
            RuntimeStrategy::OverrideOrAmbient
        );
        assert_eq!(RuntimeStrategy::for_attempt(1), RuntimeStrategy::LocalSearch);
        assert_eq!(
            RuntimeStrategy::for_attempt(2),
            RuntimeStrategy::DownloadThenSearch
        );
    }

    #[test]
    fn ambient_probe_skipped_only_on_mac_without_force() {
        assert!(ambient_probe_allowed(Os::Linux, false));
        assert!(ambient_probe_allowed(Os::Windows, false));
        assert!(!ambient_probe_allowed(Os::Mac, false));
        assert!(ambient_probe_allowed(Os::Mac, true));
    }

    #[tokio::test]
    async fn server_override_is_accepted_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let override_dir = dir.path().join("my-server");
        std::fs::create_dir(&override_dir).unwrap();

        let settings = Settings {
            server_path: Some(override_dir.to_string_lossy().into_owned()),
            library_dir: Some(dir.path().join("lib")),
            ..Settings::default()
        };
        let found = controller(settings).resolve_server().await.unwrap();
        assert!(found.path.ends_with("my-server"));
        assert!(found.version.is_none());
    }

    #[tokio::test]
    async fn invalid_override_falls_through_to_local_search() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib");
        std::fs::create_dir_all(lib.join("ltex-ls-9.1.0")).unwrap();

        let settings = Settings {
            server_path: Some("/not/a/real/override".to_string()),
            library_dir: Some(lib.clone()),
            ..Settings::default()
        };
        let found = controller(settings).resolve_server().await.unwrap();
        assert_eq!(found.path, lib.join("ltex-ls-9.1.0"));
    }

    #[tokio::test]
    async fn failed_download_exhausts_the_server_ladder() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            library_dir: Some(dir.path().join("lib")),
            ..Settings::default()
        };
        let err = controller(settings).resolve_server().await.unwrap_err();
        assert!(
            matches!(err, ResolveError::Exhausted { dependency } if dependency == "server bundle"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn mac_without_force_skips_the_ambient_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            library_dir: Some(dir.path().join("lib")),
            ..Settings::default()
        };
        let platform = Platform {
            os: Os::Mac,
            arch: Arch::Aarch64,
        };
        let controller = FallbackController::with_specs(
            settings,
            platform,
            dead_spec("ltex-ls"),
            dead_spec("jre"),
        );
        let outcome = controller
            .run_runtime_attempt(RuntimeStrategy::OverrideOrAmbient)
            .await;
        assert!(matches!(outcome, RuntimeOutcome::Skip));
    }

    #[tokio::test]
    async fn local_search_attempt_skips_when_nothing_is_installed() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            library_dir: Some(dir.path().join("lib")),
            ..Settings::default()
        };
        let outcome = controller(settings)
            .run_runtime_attempt(RuntimeStrategy::LocalSearch)
            .await;
        assert!(matches!(outcome, RuntimeOutcome::Skip));
    }
}

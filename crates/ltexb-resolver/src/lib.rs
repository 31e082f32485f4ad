//! Acquisition, verification, and activation of the ltex-ls server bundle
//! and the Java runtime it needs.
//!
//! Resolution is layered: explicit configuration wins, then an
//! already-installed copy under the library directory, then a fresh
//! download; the resolved pair is confirmed by running it with
//! `--version` before it is handed to the launch layer.

pub mod digest;
pub mod download;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod install;
pub mod launch;
pub mod locate;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod selftest;
pub mod settings;

pub use error::ResolveError;
pub use fallback::{FallbackController, ResolvedDependencies};
pub use launch::ExecutableSpec;
pub use locate::InstalledLocation;
pub use platform::{DependencySpec, Platform};
pub use progress::{FnListener, NullListener, ProgressListener, ProgressStack};
pub use selftest::SelfTestResult;
pub use settings::Settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use ltexb_resolver::fallback::ListenerFactory;
use ltexb_resolver::progress::FnListener;
use ltexb_resolver::{FallbackController, ResolveError, Settings};

const OFFLINE_GUIDE_URL: &str =
    "https://valentjn.github.io/ltex/advanced-usage.html#offline-installation";

#[derive(Parser)]
#[command(name = "ltexb", version, about = "Acquire and activate ltex-ls and its Java runtime")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve both bundles, self-test them, and print the launch command
    Resolve(CommonArgs),
    /// Download and install the pinned server bundle
    InstallServer(CommonArgs),
    /// Download and install the pinned Java runtime
    InstallRuntime(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Library directory holding installed bundles
    #[arg(long)]
    library_dir: Option<PathBuf>,
    /// Use this server bundle instead of searching or downloading
    #[arg(long)]
    server_path: Option<String>,
    /// Use this Java runtime home instead of searching or downloading
    #[arg(long)]
    java_path: Option<String>,
    /// Probe the system-wide Java even on macOS
    #[arg(long)]
    force_system_java: bool,
    /// Initial Java heap size in MB
    #[arg(long)]
    initial_heap: Option<u32>,
    /// Maximum Java heap size in MB
    #[arg(long)]
    max_heap: Option<u32>,
}

impl CommonArgs {
    fn settings(&self) -> Settings {
        Settings {
            server_path: self.server_path.clone(),
            java_path: self.java_path.clone(),
            force_try_system_wide_java: self.force_system_java,
            initial_java_heap_mb: self.initial_heap,
            maximum_java_heap_mb: self.max_heap,
            library_dir: self.library_dir.clone(),
        }
    }
}

fn stderr_progress() -> ListenerFactory {
    Box::new(|| {
        Box::new(FnListener(|fraction: f64, label: &str| {
            eprint!("\r{label}: {:3.0}%", fraction * 100.0);
            if fraction >= 1.0 {
                eprintln!();
            }
        }))
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = ltexb_util::init_tracing() {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    let result = match cli.cmd {
        Cmd::Resolve(args) => resolve(args).await,
        Cmd::InstallServer(args) => install(args, Component::Server).await,
        Cmd::InstallRuntime(args) => install(args, Component::Runtime).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            if matches!(e, ResolveError::Exhausted { .. }) {
                eprintln!();
                eprintln!("Automatic installation failed. You can either run this command");
                eprintln!("again to retry, or install the bundles manually:");
                eprintln!("  {OFFLINE_GUIDE_URL}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn resolve(args: CommonArgs) -> Result<(), ResolveError> {
    let mut controller =
        FallbackController::new(args.settings())?.with_listener_factory(stderr_progress());
    let resolved = controller.resolve().await?;

    println!("command={}", resolved.executable.command.display());
    for (key, value) in &resolved.executable.env {
        println!("env.{key}={value}");
    }
    if let Some(version) = &resolved.self_test.bundle_version {
        println!("server_version={version}");
    }
    if let Some(version) = &resolved.self_test.runtime_version {
        println!("runtime_version={version}");
    }
    if let Some(home) = &resolved.runtime_home {
        println!("runtime_home={}", home.display());
    }
    Ok(())
}

enum Component {
    Server,
    Runtime,
}

async fn install(args: CommonArgs, component: Component) -> Result<(), ResolveError> {
    let settings = args.settings();
    let library_dir = settings.library_dir();
    let platform = ltexb_resolver::Platform::detect()?;
    let spec = match component {
        Component::Server => ltexb_resolver::platform::server_spec()?,
        Component::Runtime => ltexb_resolver::platform::runtime_spec(platform)?,
    };

    let mut progress = ltexb_resolver::ProgressStack::new(
        format!("Installing {} {}", spec.name, spec.version),
        (stderr_progress())(),
    );
    let installed = ltexb_resolver::install::install(&spec, &library_dir, &mut progress).await?;
    println!("installed={}", installed.path.display());
    Ok(())
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::platform::Os;
use crate::settings::Settings;

/// Everything the process-launch layer needs to start the server.
#[derive(Clone, Debug)]
pub struct ExecutableSpec {
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

/// Builds the launch spec for a resolved server bundle.
///
/// The startup script reads `JAVA_HOME` to pick its runtime and
/// `LTEX_LS_OPTS` for JVM options; heap hints become `-Xms`/`-Xmx`.
pub fn server_executable(
    server_dir: &Path,
    runtime_home: Option<&Path>,
    settings: &Settings,
    os: Os,
) -> ExecutableSpec {
    let script = if os == Os::Windows {
        "ltex-ls.bat"
    } else {
        "ltex-ls"
    };

    let mut env = HashMap::new();
    if let Some(home) = runtime_home {
        env.insert("JAVA_HOME".to_string(), home.display().to_string());
    }

    let mut opts = Vec::new();
    if let Some(mb) = settings.initial_java_heap_mb {
        opts.push(format!("-Xms{mb}m"));
    }
    if let Some(mb) = settings.maximum_java_heap_mb {
        opts.push(format!("-Xmx{mb}m"));
    }
    if !opts.is_empty() {
        env.insert("LTEX_LS_OPTS".to_string(), opts.join(" "));
    }

    ExecutableSpec {
        command: server_dir.join("bin").join(script),
        args: Vec::new(),
        env,
        working_dir: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_hints_become_jvm_options() {
        let settings = Settings {
            initial_java_heap_mb: Some(64),
            maximum_java_heap_mb: Some(2048),
            ..Settings::default()
        };
        let spec = server_executable(
            Path::new("/lib/ltex-ls-15.2.0"),
            Some(Path::new("/lib/jdk-11.0.12+7-jre")),
            &settings,
            Os::Linux,
        );
        assert_eq!(spec.command, PathBuf::from("/lib/ltex-ls-15.2.0/bin/ltex-ls"));
        assert_eq!(spec.env["JAVA_HOME"], "/lib/jdk-11.0.12+7-jre");
        assert_eq!(spec.env["LTEX_LS_OPTS"], "-Xms64m -Xmx2048m");
    }

    #[test]
    fn windows_uses_the_batch_script_and_ambient_runtime_sets_no_home() {
        let spec = server_executable(
            Path::new("C:/lib/ltex-ls-15.2.0"),
            None,
            &Settings::default(),
            Os::Windows,
        );
        assert!(spec.command.ends_with("ltex-ls.bat"));
        assert!(!spec.env.contains_key("JAVA_HOME"));
        assert!(!spec.env.contains_key("LTEX_LS_OPTS"));
    }
}

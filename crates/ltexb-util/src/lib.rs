use std::path::PathBuf;

pub fn data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/ltex-bootstrap")
    } else {
        PathBuf::from("/tmp/ltex-bootstrap")
    }
}

/// Default library root holding installed server and runtime bundles.
pub fn library_dir() -> PathBuf {
    data_dir().join("lib")
}

pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let rest = path.strip_prefix("~/").unwrap_or("");
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_user_replaces_tilde_prefix() {
        std::env::set_var("HOME", "/home/probe");
        assert_eq!(expand_user("~/lib"), PathBuf::from("/home/probe/lib"));
        assert_eq!(expand_user("/opt/lib"), PathBuf::from("/opt/lib"));
    }
}

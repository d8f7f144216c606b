use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Installs a file-backed subscriber. The terminal belongs to the UI, so
/// without `log.file` nothing is installed and events are discarded.
pub fn init(cfg: &LogConfig) -> Result<bool> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(false);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("log: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("log: open {}", path.display()))?;

    let filter = EnvFilter::try_new(&cfg.filter)
        .with_context(|| format!("log: invalid filter {:?}", cfg.filter))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("log: install subscriber: {err}"))?;

    tracing::info!(version = crate::VERSION, "HobbyHub starting");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disabled_without_file() {
        assert!(!init(&LogConfig::default()).unwrap());
    }

    #[test]
    fn invalid_filter_is_reported() {
        let dir = tempdir().unwrap();
        let cfg = LogConfig {
            file: Some(dir.path().join("logs").join("hobbyhub.log")),
            filter: "hobbyhub=loud".into(),
        };
        assert!(init(&cfg).is_err());
        assert!(dir.path().join("logs").join("hobbyhub.log").exists());
    }
}

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::feed::{self, SortKey};

const DEFAULT_ENV_PREFIX: &str = "HOBBYHUB";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: UIConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub submit: SubmitConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
        }
    }
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_sort: default_sort(),
        }
    }
}

impl FeedConfig {
    pub fn sort_key(&self) -> SortKey {
        feed::sort_key_from_str(&self.default_sort)
    }
}

fn default_sort() -> String {
    SortKey::CreatedAt.as_key().into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitConfig {
    /// Artificial latency applied before a new post lands in the store.
    #[serde(default = "default_submit_delay", with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            delay: default_submit_delay(),
        }
    }
}

fn default_submit_delay() -> Duration {
    Duration::from_millis(800)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "hobbyhub=info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let path = options.config_file.or_else(default_config_path);
    let mut cfg = match path {
        Some(path) if path.exists() => read_config_file(&path)?,
        _ => Config::default(),
    };

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Collects `PREFIX_SECTION__KEY` variables as `section.key` pairs. Only the
/// keys present in the environment are returned, so each one overrides the
/// file even when it restates a default.
fn load_env(prefix: &str) -> HashMap<String, String> {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    env::vars()
        .filter_map(|(key, value)| {
            key.strip_prefix(&upper_prefix)
                .map(|stripped| (stripped.to_ascii_lowercase().replace("__", "."), value))
        })
        .collect()
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "ui.theme" => cfg.ui.theme = value,
        "feed.default_sort" => cfg.feed.default_sort = value,
        "submit.delay" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.submit.delay = duration;
            }
        }
        "upload.max_bytes" => {
            if let Ok(parsed) = value.parse::<u64>() {
                cfg.upload.max_bytes = parsed;
            }
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        "log.filter" => cfg.log.filter = value,
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("hobbyhub").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    fn isolated(dir: &Path, prefix: &str) -> LoadOptions {
        LoadOptions {
            config_file: Some(dir.join("config.yaml")),
            env_prefix: Some(prefix.into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated(dir.path(), "HOBBYHUB_TEST_DEFAULTS")).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.submit.delay, Duration::from_millis(800));
        assert_eq!(cfg.feed.sort_key(), SortKey::CreatedAt);
        assert!(cfg.log.file.is_none());
    }

    #[test]
    fn file_values_are_applied() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "feed:\n  default_sort: upvotes\nsubmit:\n  delay: 2s\nupload:\n  max_bytes: 2048\n",
        )
        .unwrap();
        let cfg = load(isolated(dir.path(), "HOBBYHUB_TEST_FILE")).unwrap();
        assert_eq!(cfg.feed.sort_key(), SortKey::Upvotes);
        assert_eq!(cfg.submit.delay, Duration::from_secs(2));
        assert_eq!(cfg.upload.max_bytes, 2048);
        assert_eq!(cfg.ui.theme, "default");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "submit: [not, a, map]\n").unwrap();
        assert!(load(isolated(dir.path(), "HOBBYHUB_TEST_BAD")).is_err());
    }

    #[test]
    fn env_overrides() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "submit:\n  delay: 2s\n").unwrap();
        env::set_var("HOBBYHUB_TEST_ENV_SUBMIT__DELAY", "50ms");
        env::set_var("HOBBYHUB_TEST_ENV_UI__THEME", "dracula");
        let cfg = load(isolated(dir.path(), "HOBBYHUB_TEST_ENV")).unwrap();
        assert_eq!(cfg.submit.delay, Duration::from_millis(50));
        assert_eq!(cfg.ui.theme, "dracula");
        env::remove_var("HOBBYHUB_TEST_ENV_SUBMIT__DELAY");
        env::remove_var("HOBBYHUB_TEST_ENV_UI__THEME");
    }

    #[test]
    fn env_can_restore_defaults_over_file() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "feed:\n  default_sort: upvotes\nsubmit:\n  delay: 2s\nupload:\n  max_bytes: 2048\n",
        )
        .unwrap();
        env::set_var("HOBBYHUB_TEST_RESTORE_FEED__DEFAULT_SORT", "createdAt");
        env::set_var("HOBBYHUB_TEST_RESTORE_SUBMIT__DELAY", "800ms");
        env::set_var("HOBBYHUB_TEST_RESTORE_UPLOAD__MAX_BYTES", "10485760");
        let cfg = load(isolated(dir.path(), "HOBBYHUB_TEST_RESTORE")).unwrap();
        assert_eq!(cfg.feed.sort_key(), SortKey::CreatedAt);
        assert_eq!(cfg.submit.delay, Duration::from_millis(800));
        assert_eq!(cfg.upload.max_bytes, default_max_upload_bytes());
        env::remove_var("HOBBYHUB_TEST_RESTORE_FEED__DEFAULT_SORT");
        env::remove_var("HOBBYHUB_TEST_RESTORE_SUBMIT__DELAY");
        env::remove_var("HOBBYHUB_TEST_RESTORE_UPLOAD__MAX_BYTES");
    }

    #[test]
    fn explicit_file_values_equal_to_defaults_are_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.yaml"), "upload:\n  max_bytes: 0\n").unwrap();
        let cfg = load(isolated(dir.path(), "HOBBYHUB_TEST_ZERO")).unwrap();
        assert_eq!(cfg.upload.max_bytes, 0);
        assert_eq!(cfg.submit.delay, Duration::from_millis(800));
    }
}

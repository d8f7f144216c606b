use anyhow::{Context, Result};

use crate::config;
use crate::logging;
use crate::store::PostStore;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    logging::init(&cfg.log).context("init logging")?;

    let config_path = friendly_path(config::default_path().as_ref());
    tracing::debug!(config = %config_path, delay = ?cfg.submit.delay, "configuration loaded");

    let options = ui::Options {
        status_message: format!(
            "Welcome to HobbyHub. Press n to write a post, q to quit. Config: {config_path}"
        ),
        default_sort: cfg.feed.sort_key(),
        submit_delay: cfg.submit.delay,
        max_upload_bytes: cfg.upload.max_bytes,
        palette: ui::Palette::from_theme(&cfg.ui.theme),
    };

    let mut model = ui::Model::new(PostStore::new(), options);
    model.run()?;

    tracing::info!(posts = model.store().len(), "HobbyHub exiting; posts are discarded");
    Ok(())
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/hobbyhub/config.yaml".to_string()
    }
}

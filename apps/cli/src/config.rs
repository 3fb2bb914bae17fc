//! Settings resolution: defaults, then settings file, then flags/env

use anyhow::{anyhow, Context, Result};
use grab_types::Settings;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `<config dir>/grab/settings.json`, used when no file is given explicitly
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("grab").join("settings.json"))
}

pub async fn resolve_settings(
    explicit: Option<&Path>,
    save_dir: Option<PathBuf>,
) -> Result<Settings> {
    let mut settings = match explicit {
        Some(path) => grab_core::load_settings(path)
            .await
            .with_context(|| format!("cannot read settings file {}", path.display()))?,
        None => match default_settings_path().filter(|p| p.is_file()) {
            Some(path) => {
                debug!("Using settings file {}", path.display());
                grab_core::load_settings(&path)
                    .await
                    .with_context(|| format!("cannot read settings file {}", path.display()))?
            }
            None => Settings::default(),
        },
    };

    if let Some(dir) = save_dir {
        settings.save_dir = dir;
    }

    settings
        .validate()
        .map_err(|e| anyhow!("invalid settings: {}", e))?;
    Ok(settings)
}

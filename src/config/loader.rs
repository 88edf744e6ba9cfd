use std::fs;
use std::path::Path;

use anyhow::{bail, Result};

use crate::config::settings::KeeperSettings;

/// Load and validate settings from a YAML file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<KeeperSettings> {
    let raw = fs::read_to_string(path)?;
    let settings: KeeperSettings = serde_yaml::from_str(&raw)?;

    if !(settings.expiration_refresh_ratio > 0.0 && settings.expiration_refresh_ratio < 1.0) {
        bail!(
            "expiration_refresh_ratio must be within (0, 1), got {}",
            settings.expiration_refresh_ratio
        );
    }

    if let Some(logging) = &settings.logging {
        match logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            level => bail!("Unsupported log level '{}'", level),
        }
    }

    Ok(settings)
}

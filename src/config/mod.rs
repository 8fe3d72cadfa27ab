mod types;

pub use types::*;

use anyhow::{Context, Result};
use audioprobe_av::probe::OutputParser;
use std::collections::HashSet;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./audioprobe.toml",
        "~/.config/audioprobe/config.toml",
        "/etc/audioprobe/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    OutputParser::new()
        .with_encodings(config.probe.encodings.as_slice())
        .context("Invalid [probe] encodings")?;

    if config.batch.jobs == 0 {
        anyhow::bail!("Batch jobs cannot be 0");
    }

    let table = config.tools.version_table();
    let mut seen = HashSet::new();
    for entry in &table {
        if !seen.insert(entry.id.as_str()) {
            anyhow::bail!("Duplicate ffmpeg version id '{}'", entry.id);
        }
    }

    if !seen.contains(config.tools.default_version.as_str()) {
        anyhow::bail!(
            "Default ffmpeg version '{}' is not in the version table",
            config.tools.default_version
        );
    }

    if let Some(ref preferred) = config.tools.preferred_version {
        if !seen.contains(preferred.as_str()) {
            tracing::warn!("Preferred ffmpeg version '{}' is not in the version table", preferred);
        }
    }

    if let Some(ref url) = config.service.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Service base_url must be an http(s) URL: {}", url);
        }
    }

    Ok(())
}

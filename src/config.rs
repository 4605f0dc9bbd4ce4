use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("FACEDEX_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    match ProjectDirs::from("", "", "facedex") {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("/usr/local/etc/facedex/config.toml"),
    }
});

pub static STORE_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("FACEDEX_STORE_DIR") {
        return PathBuf::from(path);
    }
    match ProjectDirs::from("", "", "facedex") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("/usr/local/etc/facedex/gallery"),
    }
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cosine-distance cutoff for the matcher.
    pub threshold: f32,
    /// External extractor command; receives image bytes on stdin and
    /// replies with face JSON on stdout.
    pub extractor: String,
    /// Gallery directory.
    pub store_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: crate::matcher::DEFAULT_THRESHOLD,
            extractor: "facedex-extractor".to_owned(),
            store_dir: STORE_DIR.clone(),
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "GIFTWRAP";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogConfig {
    /// Path to a YAML or JSON gift catalog; the built-in sample is used when
    /// unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Directory that path-style media references resolve against.
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaConfig {
    /// Page origin used to derive absolute candidate URLs, e.g.
    /// `https://example.com`.
    #[serde(default)]
    pub origin: String,
    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,
    #[serde(default = "default_overall_timeout", with = "humantime_serde")]
    pub overall_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            probe_timeout: default_probe_timeout(),
            overall_timeout: default_overall_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_probe_timeout() -> Duration {
    Duration::from_millis(3500)
}

fn default_overall_timeout() -> Duration {
    Duration::from_secs(12)
}

fn default_user_agent() -> String {
    format!(
        "giftwrap/{} (+https://github.com/danielmerja/giftwrap)",
        crate::VERSION
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_search_url_base")]
    pub url_base: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url_base: default_search_url_base(),
        }
    }
}

fn default_search_url_base() -> String {
    crate::resolver::DEFAULT_SEARCH_URL_BASE.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Skip the envelope intro and land on the grid directly.
    #[serde(default)]
    pub skip_intro: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            skip_intro: false,
        }
    }
}

fn default_theme() -> String {
    "festive".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if other.catalog.path.is_some() {
        base.catalog.path = other.catalog.path;
    }
    if other.catalog.asset_root.is_some() {
        base.catalog.asset_root = other.catalog.asset_root;
    }

    if !other.media.origin.is_empty() {
        base.media.origin = other.media.origin;
    }
    if other.media.probe_timeout != default_probe_timeout() {
        base.media.probe_timeout = other.media.probe_timeout;
    }
    if other.media.overall_timeout != default_overall_timeout() {
        base.media.overall_timeout = other.media.overall_timeout;
    }
    if !other.media.user_agent.is_empty() && other.media.user_agent != default_user_agent() {
        base.media.user_agent = other.media.user_agent;
    }

    if !other.search.url_base.is_empty() && other.search.url_base != default_search_url_base() {
        base.search.url_base = other.search.url_base;
    }

    if !other.ui.theme.is_empty() && other.ui.theme != default_theme() {
        base.ui.theme = other.ui.theme;
    }
    if other.ui.skip_intro {
        base.ui.skip_intro = true;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "catalog.path" => cfg.catalog.path = Some(PathBuf::from(value)),
        "catalog.asset_root" => cfg.catalog.asset_root = Some(PathBuf::from(value)),
        "media.origin" => cfg.media.origin = value,
        "media.probe_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.media.probe_timeout = duration;
            }
        }
        "media.overall_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.media.overall_timeout = duration;
            }
        }
        "media.user_agent" => cfg.media.user_agent = value,
        "search.url_base" => cfg.search.url_base = value,
        "ui.theme" => cfg.ui.theme = value,
        "ui.skip_intro" => {
            cfg.ui.skip_intro = matches!(value.as_str(), "1" | "true" | "TRUE" | "True");
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("giftwrap").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(LoadOptions {
            env_prefix: Some("GIFTWRAP_TEST_NONE".into()),
            ..LoadOptions::default()
        })
        .unwrap();
        assert_eq!(cfg.ui.theme, "festive");
        assert_eq!(cfg.media.probe_timeout, Duration::from_millis(3500));
        assert_eq!(cfg.media.overall_timeout, Duration::from_secs(12));
        assert!(cfg.catalog.path.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "media:\n  origin: https://example.com\n  probe_timeout: 2s\ncatalog:\n  path: /tmp/gifts.yaml\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("GIFTWRAP_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.media.origin, "https://example.com");
        assert_eq!(cfg.media.probe_timeout, Duration::from_secs(2));
        assert_eq!(cfg.catalog.path, Some(PathBuf::from("/tmp/gifts.yaml")));
    }

    #[test]
    fn env_overrides() {
        env::set_var("GIFTWRAP_MEDIA__ORIGIN", "https://gifts.test");
        env::set_var("GIFTWRAP_MEDIA__PROBE_TIMEOUT", "1500ms");
        let cfg = load(LoadOptions::default()).unwrap();
        assert_eq!(cfg.media.origin, "https://gifts.test");
        assert_eq!(cfg.media.probe_timeout, Duration::from_millis(1500));
        env::remove_var("GIFTWRAP_MEDIA__ORIGIN");
        env::remove_var("GIFTWRAP_MEDIA__PROBE_TIMEOUT");
    }
}

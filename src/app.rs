use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use url::Url;

use crate::catalog;
use crate::config;
use crate::probe::{HttpProbe, HttpProbeConfig};
use crate::resolver;
use crate::ui;

pub fn run() -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let catalog = catalog::load_or_default(cfg.catalog.path.as_deref()).context("load catalog")?;

    let origin = parse_origin(&cfg.media.origin)?;

    let probe = HttpProbe::new(HttpProbeConfig {
        timeout: cfg.media.probe_timeout,
        user_agent: cfg.media.user_agent.clone(),
        http_client: None,
        asset_root: cfg.catalog.asset_root.clone(),
    })
    .context("build media probe")?;
    let resolver_manager = resolver::Manager::new(Arc::new(probe), resolver::Config::default());
    let resolver_handle = Some(resolver_manager.handle());

    let external_client = Client::builder()
        .timeout(Duration::from_secs(8))
        .build()
        .context("build external-open HTTP client")?;

    let status = format!(
        "Loaded {} gift(s). Press any key to open the envelope.",
        catalog.gifts.len()
    );

    let options = ui::Options {
        status_message: status,
        catalog,
        resolver_handle,
        origin,
        overall_timeout: cfg.media.overall_timeout,
        user_agent: cfg.media.user_agent.clone(),
        search_url_base: cfg.search.url_base.clone(),
        external_client,
        config_path: display_path,
        skip_intro: cfg.ui.skip_intro,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    drop(resolver_manager);

    Ok(())
}

fn parse_origin(raw: &str) -> Result<Option<Url>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let url = Url::parse(raw).with_context(|| format!("parse media.origin {raw:?}"))?;
    Ok(Some(url))
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
        "~/.config/giftwrap/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_is_none() {
        assert!(parse_origin("").unwrap().is_none());
        assert!(parse_origin("   ").unwrap().is_none());
    }

    #[test]
    fn invalid_origin_is_an_error() {
        assert!(parse_origin("not a url").is_err());
    }

    #[test]
    fn valid_origin_parses() {
        let origin = parse_origin("https://example.com").unwrap().unwrap();
        assert_eq!(origin.as_str(), "https://example.com/");
    }
}

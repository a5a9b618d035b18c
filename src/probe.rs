use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, RANGE, USER_AGENT};
use reqwest::StatusCode;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(3500);

/// Best-effort check that a candidate URL points at playable media.
///
/// Implementations answer with a plain bool; a probe that errors out, times
/// out, or is refused counts as "not playable" and never surfaces an error.
pub trait Probe: Send + Sync {
    fn is_playable(&self, candidate: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct HttpProbeConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub http_client: Option<Client>,
    /// Directory that path-style candidates resolve against, the way a web
    /// host would serve them from its static root.
    pub asset_root: Option<PathBuf>,
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            user_agent: format!("giftwrap/{} (media-probe)", crate::VERSION),
            http_client: None,
            asset_root: None,
        }
    }
}

pub struct HttpProbe {
    http: Client,
    user_agent: String,
    asset_root: Option<PathBuf>,
}

impl HttpProbe {
    pub fn new(config: HttpProbeConfig) -> Result<Self> {
        let http = match config.http_client {
            Some(client) => client,
            None => Client::builder()
                .timeout(config.timeout)
                .build()
                .context("build media probe HTTP client")?,
        };
        Ok(Self {
            http,
            user_agent: config.user_agent,
            asset_root: config.asset_root,
        })
    }

    fn local_file_exists(&self, candidate: &str) -> bool {
        let Some(root) = &self.asset_root else {
            return false;
        };
        let trimmed = candidate.trim_start_matches("./").trim_start_matches('/');
        if trimmed.is_empty() {
            return false;
        }
        root.join(trimmed).is_file()
    }

    fn head(&self, candidate: &str) -> Result<(StatusCode, Option<String>), reqwest::Error> {
        let response = self
            .http
            .head(candidate)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        let content_type = header_value(&response, CONTENT_TYPE);
        Ok((response.status(), content_type))
    }

    fn ranged_get(&self, candidate: &str) -> Result<(StatusCode, Option<String>), reqwest::Error> {
        let response = self
            .http
            .get(candidate)
            .header(USER_AGENT, &self.user_agent)
            .header(RANGE, "bytes=0-0")
            .send()?;
        let content_type = header_value(&response, CONTENT_TYPE);
        Ok((response.status(), content_type))
    }
}

impl Probe for HttpProbe {
    fn is_playable(&self, candidate: &str) -> bool {
        if !candidate.starts_with("http://") && !candidate.starts_with("https://") {
            return self.local_file_exists(candidate);
        }

        match self.head(candidate) {
            Ok((status, content_type)) if usable_response(status, content_type.as_deref()) => true,
            // Some servers reject HEAD outright; retry with a one-byte range.
            Ok((status, _))
                if matches!(
                    status,
                    StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED
                ) =>
            {
                matches!(
                    self.ranged_get(candidate),
                    Ok((status, content_type)) if usable_response(status, content_type.as_deref())
                )
            }
            _ => false,
        }
    }
}

fn usable_response(status: StatusCode, content_type: Option<&str>) -> bool {
    if !status.is_success() {
        return false;
    }
    // SPA hosts answer unknown paths with 200 + the index page; an HTML body
    // where video bytes should be means the candidate does not exist.
    match content_type {
        Some(value) => !value.trim_start().to_ascii_lowercase().starts_with("text/html"),
        None => true,
    }
}

fn header_value(
    response: &reqwest::blocking::Response,
    name: reqwest::header::HeaderName,
) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|val| val.to_str().ok())
        .map(|s| s.to_string())
}

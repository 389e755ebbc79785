//! Source retrieval for `invrecon join` / `invrecon rollup`.
//!
//! A locator is an `http(s)://` URL, a `file://` URL or a plain local path.
//! One attempt per source, no retries: any transport error, non-2xx status
//! or unreadable file aborts the run with `RunError::Fetch` attributed to
//! that source. Bodies are decoded as UTF-8 with lossy replacement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use invoice_recon::normalize::decode_text;
use invoice_recon::{RunError, SourceRole};

// ── Constants ───────────────────────────────────────────────────────

const USER_AGENT: &str = concat!("invrecon/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ── Locators ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Locator {
    Http(Url),
    Path(PathBuf),
}

impl Locator {
    pub(crate) fn parse(raw: &str, source: SourceRole) -> Result<Self, RunError> {
        let raw = raw.trim();
        match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Http(url)),
                "file" => url.to_file_path().map(Self::Path).map_err(|_| RunError::Fetch {
                    source,
                    message: format!("invalid file URL: {raw}"),
                }),
                // Windows drive letters parse as one-letter schemes.
                s if s.len() == 1 => Ok(Self::Path(PathBuf::from(raw))),
                other => Err(RunError::Fetch {
                    source,
                    message: format!("unsupported URL scheme \"{other}\" in {raw}"),
                }),
            },
            Err(_) => Ok(Self::Path(PathBuf::from(raw))),
        }
    }
}

// ── Fetch ───────────────────────────────────────────────────────────

/// Retrieve one source as text.
pub(crate) fn fetch_text(locator: &str, source: SourceRole) -> Result<String, RunError> {
    match Locator::parse(locator, source)? {
        Locator::Http(url) => fetch_http(&url, source),
        Locator::Path(path) => read_path(&path, source),
    }
}

fn fetch_http(url: &Url, source: SourceRole) -> Result<String, RunError> {
    let fetch_err = |message: String| RunError::Fetch { source, message };

    log::info!("Downloading {source} CSV from {url}");
    let http = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| fetch_err(format!("cannot build HTTP client: {e}")))?;

    let resp = http
        .get(url.clone())
        .send()
        .map_err(|e| fetch_err(format!("request to {url} failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(fetch_err(format!("HTTP {} from {url}", status.as_u16())));
    }

    let body = resp
        .bytes()
        .map_err(|e| fetch_err(format!("reading body from {url} failed: {e}")))?;
    log::debug!("{source}: {} bytes", body.len());
    Ok(decode_text(&body))
}

fn read_path(path: &Path, source: SourceRole) -> Result<String, RunError> {
    log::info!("Reading {source} CSV from {}", path.display());
    let bytes = std::fs::read(path).map_err(|e| RunError::Fetch {
        source,
        message: format!("cannot read {}: {e}", path.display()),
    })?;
    Ok(decode_text(&bytes))
}

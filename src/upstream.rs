//! Blocking upstream client for the arrivals endpoint.
//!
//! The upstream is a Google Apps Script web app; the configured value may be
//! either the full `/exec` URL or a bare deployment id. Fetch failures never
//! surface to the render path: the client logs and returns the fallback
//! payload so the board always has something to draw.

use core::fmt;
use std::time::Duration;

use log::warn;

use crate::payload::{ArrivalPayload, StopCodes};

/// Default upstream request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Error from an explicit upstream probe.
#[derive(Debug)]
pub enum UpstreamError {
    /// Client construction or transport failure.
    Transport(reqwest::Error),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "upstream transport: {}", err),
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

/// Raw upstream response sample for the `/probe` diagnostic endpoint.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ProbeReport {
    pub status: u16,
    pub content_type: Option<String>,
    /// First bytes of the response body, for eyeballing what came back.
    pub sample: String,
    pub url: String,
}

/// Blocking client for the arrivals upstream.
#[derive(Debug)]
pub struct UpstreamClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl UpstreamClient {
    const SAMPLE_LIMIT: usize = 500;

    /// Build a client from a deployment id or full `/exec` URL.
    pub fn new(deployment: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url_from(deployment),
            http,
        })
    }

    /// Resolved base URL (no query string).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the arrivals payload for three stop codes.
    ///
    /// Infallible by design: transport errors, bad statuses, and undecodable
    /// bodies all log a warning and yield [`ArrivalPayload::fallback`].
    pub fn fetch(&self, codes: &StopCodes) -> ArrivalPayload {
        match self.try_fetch(codes) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("upstream fetch failed, serving fallback payload: {}", err);
                ArrivalPayload::fallback(codes)
            }
        }
    }

    fn try_fetch(&self, codes: &StopCodes) -> Result<ArrivalPayload, Box<dyn std::error::Error>> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("stop_a", codes.a.as_str()),
                ("stop_b", codes.b.as_str()),
                ("stop_c", codes.c.as_str()),
            ])
            .send()?
            .error_for_status()?;
        let body = response.bytes()?;
        Ok(ArrivalPayload::from_json(&body)?)
    }

    /// Fetch a raw response sample without decoding, for diagnostics.
    pub fn probe(&self, codes: &StopCodes) -> Result<ProbeReport, UpstreamError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("stop_a", codes.a.as_str()),
                ("stop_b", codes.b.as_str()),
                ("stop_c", codes.c.as_str()),
            ])
            .send()?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let url = response.url().to_string();
        let body = response.text().unwrap_or_default();
        let sample = body.chars().take(Self::SAMPLE_LIMIT).collect();
        Ok(ProbeReport {
            status,
            content_type,
            sample,
            url,
        })
    }
}

/// Compose the upstream base URL from a full URL or a bare deployment id.
///
/// A pasted full URL may carry a stale query string; strip it.
pub fn base_url_from(deployment: &str) -> String {
    let trimmed = deployment.trim();
    if trimmed.starts_with("http") {
        trimmed
            .split('?')
            .next()
            .unwrap_or(trimmed)
            .to_string()
    } else {
        format!("https://script.google.com/macros/s/{}/exec", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::base_url_from;

    #[test]
    fn full_url_keeps_path_and_drops_query() {
        assert_eq!(
            base_url_from("https://script.google.com/macros/s/KEY/exec?stop_a=1"),
            "https://script.google.com/macros/s/KEY/exec"
        );
    }

    #[test]
    fn bare_deployment_id_composes_exec_url() {
        assert_eq!(
            base_url_from("AKfycb123"),
            "https://script.google.com/macros/s/AKfycb123/exec"
        );
    }
}

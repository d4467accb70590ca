//! `reqwest`-backed [`Transport`].

use super::{HttpResponse, Transport, TransportError};
use crate::config::ScholarConfig;
use crate::cookies::CookieManager;
use crate::error::{Result, ScholarError};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

/// Sends browser-like GET requests with the configured timeout, proxy and
/// session cookies.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    cookie_header: String,
}

impl ReqwestTransport {
    /// Build the HTTP client described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid proxy URL, and an I/O or JSON
    /// error when the configured cookie file cannot be read.
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                ScholarError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ScholarError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let cookie_header = match &config.cookie_file {
            Some(path) => {
                let base = Url::parse(&config.base_url).map_err(|e| {
                    ScholarError::Config(format!("Invalid base URL '{}': {}", config.base_url, e))
                })?;
                let host = base.host_str().unwrap_or_default();
                let header = CookieManager::with_path(path.clone()).cookie_header(host)?;
                if header.is_empty() {
                    warn!(path = ?path, host, "No usable cookies for Scholar host");
                } else {
                    info!(path = ?path, "Sending stored Scholar cookies");
                }
                header
            }
            None => String::new(),
        };

        Ok(Self {
            client,
            cookie_header,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> std::result::Result<HttpResponse, TransportError> {
        let mut request = self
            .client
            .get(url.as_str())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .header("Upgrade-Insecure-Requests", "1");

        if !self.cookie_header.is_empty() {
            request = request.header("Cookie", &self.cookie_header);
        }

        let response = request.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        debug!(url = %url, status, bytes = body.len(), "Received response");

        Ok(HttpResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

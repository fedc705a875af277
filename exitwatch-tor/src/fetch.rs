//! Exit address directory fetcher
//!
//! Downloads the raw directory text. Parsing happens in `exitwatch-core`.

use async_trait::async_trait;
use reqwest::{redirect, Client, Proxy};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use exitwatch_core::DEFAULT_SOURCE_URL;

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory URL (default: the Tor Project bulk exit list)
    pub source_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with the request
    pub user_agent: String,
    /// Optional proxy, e.g. `socks5h://127.0.0.1:9050` to fetch through Tor
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            timeout_secs: 30,
            user_agent: concat!("exitwatch/", env!("CARGO_PKG_VERSION")).to_string(),
            proxy: None,
        }
    }
}

impl FetchConfig {
    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }
}

/// Errors from fetching the directory
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory returned status {0}")]
    Status(u16),

    #[error("Directory returned no content")]
    EmptyBody,
}

impl FetchError {
    /// Whether the transport gave up waiting
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Request(e) if e.is_timeout())
    }
}

/// Maximum redirects followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Something that can produce raw exit directory text
#[async_trait]
pub trait ExitListSource: Send + Sync {
    /// Fetch the raw directory body
    async fn fetch(&self) -> Result<String, FetchError>;

    /// Human-readable origin, for logs
    fn describe(&self) -> &str;
}

/// Create the HTTP client used for directory downloads
pub fn create_client(config: &FetchConfig) -> Result<Client, FetchError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .user_agent(config.user_agent.as_str());

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy).map_err(|e| FetchError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| FetchError::ClientBuild(e.to_string()))
}

/// Directory source backed by an HTTP GET
pub struct HttpExitListSource {
    client: Client,
    config: FetchConfig,
}

impl HttpExitListSource {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = create_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl ExitListSource for HttpExitListSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        debug!("Fetching exit list from {}", self.config.source_url);

        let response = self.client.get(&self.config.source_url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(FetchError::EmptyBody);
        }

        debug!("Fetched {} bytes of exit list", body.len());
        Ok(body)
    }

    fn describe(&self) -> &str {
        &self.config.source_url
    }
}

//! HTTP transport implementation.
//!
//! This module provides HTTP/1.1 and HTTP/2 transport using reqwest.

use std::{sync::LazyLock, time::Duration};

use reqwest::{Client, Proxy, header::CONTENT_TYPE};
use tracing::{debug, instrument};
use url::Url;

use super::{
    FORM_CONTENT_TYPE, Transport, TransportResponse,
    config::{HttpConfig, HttpVersion},
};
use crate::error::{GatewayError, Result};

/// Default HTTP client with connection pooling enabled.
///
/// Shared by every transport built with [`HttpTransport::new`] so they share
/// one connection pool.
static DEFAULT_HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(16)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to create default HTTP client")
});

/// Rejects anything but an absolute HTTPS URL.
///
/// Card data and the merchant signature travel in the body.
fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| GatewayError::TransportFailure(format!("invalid gateway URL: {e}")))?;

    if url.scheme() != "https" {
        return Err(GatewayError::TransportFailure("Only HTTPS URLs are allowed".to_owned()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(GatewayError::TransportFailure(format!("URL missing host: {raw}")));
    }

    Ok(url)
}

/// HTTP/1.1 and HTTP/2 transport using reqwest.
///
/// Supports automatic connection pooling, keep-alive and an optional proxy.
///
/// # Examples
///
/// ```rust,no_run
/// use threeds_gateway::transport::{HttpConfig, HttpTransport, Transport};
///
/// # async fn example() -> threeds_gateway::error::Result<()> {
/// let config = HttpConfig { timeout_secs: 60, ..HttpConfig::default() };
/// let transport = HttpTransport::with_config(&config)?;
///
/// let response = transport
///     .post_form("https://gateway.example.com/direct/", b"action=QUERY")
///     .await?;
/// println!("Status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    http_version: HttpVersion,
}

impl HttpTransport {
    /// Creates a new HTTP transport with default settings.
    ///
    /// Uses a shared singleton client for connection pooling efficiency.
    ///
    /// Default configuration:
    /// - Pool max idle per host: 16
    /// - Timeout: 30 seconds
    /// - Connect timeout: 10 seconds
    /// - HTTP version: Auto (prefer HTTP/2)
    ///
    /// # Errors
    ///
    /// This method is infallible but returns `Result` for API consistency.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::transport::HttpTransport;
    ///
    /// let transport = HttpTransport::new().unwrap();
    /// ```
    pub fn new() -> Result<Self> {
        Ok(Self { client: DEFAULT_HTTP_CLIENT.clone(), http_version: HttpVersion::Auto })
    }

    /// Creates HTTP transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is out of bounds, the proxy URL is
    /// rejected, or HTTP client creation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_gateway::transport::{HttpConfig, HttpTransport, HttpVersion};
    ///
    /// let config = HttpConfig { http_version: HttpVersion::Http1, ..HttpConfig::default() };
    /// let transport = HttpTransport::with_config(&config).unwrap();
    /// ```
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout());

        builder = match config.http_version {
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
            HttpVersion::Auto => builder,
        };

        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(Proxy::all(proxy_url).map_err(GatewayError::HttpError)?);
        }

        let client = builder.build().map_err(GatewayError::HttpError)?;

        Ok(Self { client, http_version: config.http_version })
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self, body), fields(body_len = body.len(), protocol = self.protocol_name()))]
    async fn post_form<'a>(&'a self, url: &'a str, body: &'a [u8]) -> Result<TransportResponse> {
        let url = validate_url(url)?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status().as_u16();

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_owned()))
            .collect();

        if !response.status().is_success() {
            return Err(GatewayError::TransportFailure(format!(
                "gateway returned status {status}"
            )));
        }

        let response_body = response.bytes().await.map_err(GatewayError::HttpError)?.to_vec();
        debug!(status, body_len = response_body.len(), "gateway responded");

        Ok(TransportResponse { status, body: response_body, headers })
    }

    fn protocol_name(&self) -> &'static str {
        match self.http_version {
            HttpVersion::Http1 => "http/1.1",
            HttpVersion::Http2 => "http/2",
            HttpVersion::Auto => "http",
        }
    }
}

//! Authenticated HTTP client for the external panel
//!
//! Wraps `reqwest::Client` with bearer-token authentication and base URL
//! construction for the panel's application API. The client carries a
//! per-request timeout so a hung page fetch surfaces as an error instead
//! of blocking a sync run indefinitely.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use tracing::{debug, warn};

use panelsync_core::config::PanelConfig;

/// Default per-request timeout when none is configured
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for panel application API calls
///
/// Stateless between calls except for the credentials and base URL.
pub struct PanelClient {
    /// The underlying HTTP client (carries the request timeout)
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// Application API bearer token
    api_token: String,
}

impl PanelClient {
    /// Creates a new PanelClient
    ///
    /// # Arguments
    /// * `base_url` - Panel base URL, e.g. `https://panel.example.com`
    /// * `api_token` - Application API bearer token
    /// * `timeout` - Per-request timeout bounding a single page fetch
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            // Builder failure means TLS backend initialization problems;
            // the untimed default client is still better than no client.
            warn!(error = %e, "Falling back to default HTTP client configuration");
            Client::new()
        });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        }
    }

    /// Creates a client from the panel configuration section
    pub fn from_config(config: &PanelConfig) -> Self {
        let timeout = if config.request_timeout_secs > 0 {
            Duration::from_secs(config.request_timeout_secs)
        } else {
            DEFAULT_REQUEST_TIMEOUT
        };
        Self::new(&config.base_url, &config.api_token, timeout)
    }

    /// Returns the configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Updates the bearer token (e.g. after rotation)
    pub fn set_api_token(&mut self, token: impl Into<String>) {
        self.api_token = token.into();
        debug!("Updated panel API token");
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization and
    /// Accept headers.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. "/api/application/users")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
    }
}

//! Client configuration and per-request options.
//!
//! Based on Chromium's `net::URLRequestContext`, [`ClientConfig`] is the
//! central configuration point shared by every request of a client;
//! [`RequestOptions`] is the copy a single request may override.

use crate::http::orderedheaders::OrderedHeaderMap;
use crate::socket::proxy::ProxyChain;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Chromium's default redirect limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 20;

/// Configuration options shared by every request of a client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User-Agent string to use for requests.
    pub user_agent: String,

    /// Accept-Language header value.
    pub accept_language: Option<String>,

    /// Permanent headers sent with every request unless the request sets
    /// its own value.
    pub default_headers: OrderedHeaderMap,

    /// Maximum number of redirects followed by one request.
    pub max_redirects: usize,

    /// Carry temporary headers across redirects.
    pub keep_temporary_headers_on_redirect: bool,

    /// Follow redirects; when false a redirect response is returned as-is.
    pub allow_auto_redirect: bool,

    /// Proxy chain (None for direct connections).
    pub proxy: Option<ProxyChain>,

    /// Deadline for a whole request chain.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: Some("en-US,en;q=0.9".to_string()),
            default_headers: OrderedHeaderMap::new(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            keep_temporary_headers_on_redirect: true,
            allow_auto_redirect: true,
            proxy: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Headers every request starts from: User-Agent, Accept-Language and
    /// the configured defaults, in that order.
    pub fn base_headers(&self) -> OrderedHeaderMap {
        let mut headers = OrderedHeaderMap::new();
        if let Err(e) = headers.insert("User-Agent", &self.user_agent) {
            tracing::warn!(error = %e, "ignoring invalid User-Agent");
        }
        if let Some(lang) = &self.accept_language {
            if let Err(e) = headers.insert("Accept-Language", lang) {
                tracing::warn!(error = %e, "ignoring invalid Accept-Language");
            }
        }
        for (name, value, kind) in self.default_headers.iter() {
            headers.set(name.clone(), value.clone(), kind);
        }
        headers
    }
}

/// Options for one request chain.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub max_redirects: usize,
    pub keep_temporary_headers_on_redirect: bool,
    pub allow_auto_redirect: bool,
    pub proxy: ProxyChain,
    pub timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for RequestOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_redirects: config.max_redirects,
            keep_temporary_headers_on_redirect: config.keep_temporary_headers_on_redirect,
            allow_auto_redirect: config.allow_auto_redirect,
            proxy: config.proxy.clone().unwrap_or_default(),
            timeout: config.timeout,
            cancellation: CancellationToken::new(),
        }
    }
}

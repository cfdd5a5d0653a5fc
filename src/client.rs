//! HTTP Client with builder pattern.
//!
//! A [`Client`] owns the cookie jar and the connection layers shared by all
//! of its requests. Each request is described with a [`RequestBuilder`] and
//! runs its whole redirect chain on [`send`](RequestBuilder::send).
//!
//! # Example
//!
//! ```rust,no_run
//! use agentnet::{Client, ProxySettings};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), agentnet::NetError> {
//! let client = Client::builder()
//!     .user_agent("agentnet/0.1")
//!     .proxy(ProxySettings::parse("socks5://127.0.0.1:9050")?)
//!     .timeout(Duration::from_secs(30))
//!     .build();
//!
//! let resp = client
//!     .post("https://example.com/login")
//!     .form([("user", "alice"), ("pass", "secret")])
//!     .send()
//!     .await?;
//! println!("{} after {} redirects", resp.status(), resp.redirect_count());
//! # Ok(())
//! # }
//! ```

use crate::base::neterror::NetError;
use crate::cookies::jar::CookieJar;
use crate::http::multipart::Form;
use crate::http::orderedheaders::{HeaderKind, OrderedHeaderMap};
use crate::http::requestbody::RequestBody;
use crate::http::response::HttpResponse;
use crate::http::streamfactory::HttpStreamFactory;
use crate::socket::proxy::ProxyChain;
use crate::socket::stream::{TcpConnector, TlsLayer, TokioTcpConnector};
use crate::urlrequest::context::{ClientConfig, RequestOptions};
use crate::urlrequest::job::URLRequestHttpJob;
use crate::urlrequest::request::RequestDescriptor;
use http::header::REFERER;
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// HTTP Client for making requests.
///
/// Cloning is cheap; clones share the cookie jar and configuration.
#[derive(Clone)]
pub struct Client {
    factory: Arc<HttpStreamFactory>,
    cookie_store: Arc<CookieJar>,
    config: Arc<ClientConfig>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("cookies", &self.cookie_store.total_cookie_count())
            .finish()
    }
}

impl Client {
    /// Create a new client with default settings.
    pub fn new() -> Self {
        ClientBuilder::default().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The jar shared by every request of this client.
    pub fn cookie_jar(&self) -> &Arc<CookieJar> {
        &self.cookie_store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Options a request starts from before any per-request override.
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions::from(self.config.as_ref())
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a PUT request.
    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start building a DELETE request.
    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a HEAD request.
    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building a PATCH request.
    pub fn patch<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start building a request with custom method.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            method,
            url: url.as_ref().to_string(),
            headers: OrderedHeaderMap::new(),
            body: RequestBody::Empty,
            options: self.request_options(),
            error: None,
        }
    }

    /// Run `request` and its redirect chain with `options`.
    ///
    /// The client's base headers (User-Agent, Accept-Language, defaults) are
    /// laid under the request's own headers.
    pub async fn execute(
        &self,
        request: RequestDescriptor,
        options: RequestOptions,
    ) -> Result<HttpResponse, NetError> {
        let mut headers = self.config.base_headers();
        headers.overlay(&request.headers);
        let request = request.with_headers(headers);

        tracing::debug!(method = %request.method, url = %request.url, "starting request");

        let mut job = URLRequestHttpJob::new(
            Arc::clone(&self.factory),
            Arc::clone(&self.cookie_store),
            request.url.clone(),
            options,
        );
        job.start(request).await
    }
}

/// Builder for creating a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    cookie_store: Option<Arc<CookieJar>>,
    connector: Option<Arc<dyn TcpConnector>>,
    tls: Option<Arc<dyn TlsLayer>>,
}

impl ClientBuilder {
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the Accept-Language value; `None` stops sending the header.
    pub fn accept_language<S: Into<String>>(mut self, value: Option<S>) -> Self {
        self.config.accept_language = value.map(Into::into);
        self
    }

    /// Add a permanent header sent with every request. Invalid names or
    /// values are ignored with a warning.
    pub fn default_header(mut self, name: &str, value: &str) -> Self {
        if let Err(e) = self.config.default_headers.insert(name, value) {
            tracing::warn!(name, error = %e, "ignoring invalid default header");
        }
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    pub fn keep_temporary_headers_on_redirect(mut self, keep: bool) -> Self {
        self.config.keep_temporary_headers_on_redirect = keep;
        self
    }

    /// Follow redirects automatically (on by default).
    pub fn allow_auto_redirect(mut self, allow: bool) -> Self {
        self.config.allow_auto_redirect = allow;
        self
    }

    /// Route every request through `proxy`: a single [`ProxySettings`] or a
    /// [`ProxyChain`].
    ///
    /// [`ProxySettings`]: crate::socket::proxy::ProxySettings
    pub fn proxy<P: Into<ProxyChain>>(mut self, proxy: P) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    /// Set request timeout, covering the whole redirect chain.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Share an existing cookie jar.
    pub fn cookie_jar(mut self, jar: Arc<CookieJar>) -> Self {
        self.cookie_store = Some(jar);
        self
    }

    /// Use `tls` for `https` targets. Without one, `https` requests fail
    /// unless the `boring-tls` feature supplies a default.
    pub fn tls_layer<T: TlsLayer + 'static>(mut self, tls: T) -> Self {
        self.tls = Some(Arc::new(tls));
        self
    }

    /// Replace the TCP connector used to reach the first hop.
    pub fn tcp_connector<C: TcpConnector + 'static>(mut self, connector: C) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TokioTcpConnector));
        let tls = self.tls.or_else(default_tls_layer);

        Client {
            factory: Arc::new(HttpStreamFactory::new(connector, tls)),
            cookie_store: self.cookie_store.unwrap_or_default(),
            config: Arc::new(self.config),
        }
    }
}

#[cfg(feature = "boring-tls")]
fn default_tls_layer() -> Option<Arc<dyn TlsLayer>> {
    match crate::socket::tls::BoringTlsLayer::new() {
        Ok(tls) => Some(Arc::new(tls)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to initialize TLS, https disabled");
            None
        }
    }
}

#[cfg(not(feature = "boring-tls"))]
fn default_tls_layer() -> Option<Arc<dyn TlsLayer>> {
    None
}

/// Builder for a single request.
///
/// Invalid input (a bad header, an unserializable JSON body) is remembered
/// and reported by [`send`](Self::send).
pub struct RequestBuilder {
    client: Client,
    method: Method,
    url: String,
    headers: OrderedHeaderMap,
    body: RequestBody,
    options: RequestOptions,
    error: Option<NetError>,
}

impl RequestBuilder {
    /// Add a permanent header.
    pub fn header(self, name: &str, value: &str) -> Self {
        self.header_with_kind(name, value, HeaderKind::Permanent)
    }

    /// Add a header for the first hop only (unless temporary headers are
    /// kept on redirect).
    pub fn temporary_header(self, name: &str, value: &str) -> Self {
        self.header_with_kind(name, value, HeaderKind::Temporary)
    }

    fn header_with_kind(mut self, name: &str, value: &str, kind: HeaderKind) -> Self {
        if let Err(e) = self.headers.insert_with_kind(name, value, kind) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Set the `Referer` header. It is a temporary header.
    pub fn referer(self, referer: &str) -> Self {
        self.header_with_kind(REFERER.as_str(), referer, HeaderKind::Temporary)
    }

    /// Set request body.
    pub fn body<B: Into<RequestBody>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Set a url-encoded form body.
    pub fn form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.body = RequestBody::form(pairs);
        self
    }

    /// Set a multipart/form-data body.
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = form.into();
        self
    }

    /// Set JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize + ?Sized>(mut self, json: &T) -> Self {
        match RequestBody::json(json) {
            Ok(body) => self.body = body,
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    pub fn max_redirects(mut self, max: usize) -> Self {
        self.options.max_redirects = max;
        self
    }

    pub fn allow_auto_redirect(mut self, allow: bool) -> Self {
        self.options.allow_auto_redirect = allow;
        self
    }

    pub fn keep_temporary_headers_on_redirect(mut self, keep: bool) -> Self {
        self.options.keep_temporary_headers_on_redirect = keep;
        self
    }

    /// Override the client's proxy for this request.
    pub fn proxy<P: Into<ProxyChain>>(mut self, proxy: P) -> Self {
        self.options.proxy = proxy.into();
        self
    }

    /// Override the client's timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Abort the request when `token` is cancelled.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.options.cancellation = token;
        self
    }

    /// Validate the builder into a descriptor and its options.
    pub fn build(self) -> Result<(Client, RequestDescriptor, RequestOptions), NetError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let url = Url::parse(&self.url).map_err(|_| NetError::InvalidUrl)?;
        let request = RequestDescriptor::new(self.method, url)
            .with_headers(self.headers)
            .with_body(self.body);
        Ok((self.client, request, self.options))
    }

    /// Send the request.
    pub async fn send(self) -> Result<HttpResponse, NetError> {
        let (client, request, options) = self.build()?;
        client.execute(request, options).await
    }
}

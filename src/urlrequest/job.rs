use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::cookies::jar::CookieJar;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::redirect::{is_redirect, RedirectInfo};
use crate::http::response::HttpResponse;
use crate::http::streamfactory::{ConnectionKey, HttpStream, HttpStreamFactory};
use crate::http::transaction::HttpNetworkTransaction;
use crate::urlrequest::context::RequestOptions;
use crate::urlrequest::request::RequestDescriptor;
use bytes::Bytes;
use http::header::{CONNECTION, LOCATION};
use http::{Response, Version};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// Outcome of one hop.
#[derive(Debug)]
pub enum Step {
    /// A redirect was accepted; this is the next hop.
    Continue(RequestDescriptor),
    /// Terminal response.
    Done(HttpResponse),
    Failed(NetError),
}

/// Progress of one request chain.
#[derive(Debug, Clone)]
pub struct RedirectState {
    /// Redirects followed so far.
    pub hops_taken: usize,
    pub current_url: Url,
    /// Headers of the hop currently in flight.
    pub retained_headers: OrderedHeaderMap,
    /// `Set-Cookie` lines the jar accepted over the whole chain.
    pub cookies_collected: usize,
}

/// Drives a request through its redirect chain.
///
/// Each hop runs as one [`step`](Self::step); [`start`](Self::start) loops
/// over steps, racing each against the cancellation token and the request
/// deadline. The HTTP connection (with any proxy tunnel under it) is kept
/// between hops to the same scheme, host and port.
pub struct URLRequestHttpJob {
    factory: Arc<HttpStreamFactory>,
    cookie_store: Arc<CookieJar>,
    options: RequestOptions,
    state: RedirectState,
    stream: Option<HttpStream>,
    load_state: LoadState,
    connections_opened: usize,
}

impl URLRequestHttpJob {
    pub fn new(
        factory: Arc<HttpStreamFactory>,
        cookie_store: Arc<CookieJar>,
        url: Url,
        options: RequestOptions,
    ) -> Self {
        Self {
            factory,
            cookie_store,
            options,
            state: RedirectState {
                hops_taken: 0,
                current_url: url,
                retained_headers: OrderedHeaderMap::new(),
                cookies_collected: 0,
            },
            stream: None,
            load_state: LoadState::Idle,
            connections_opened: 0,
        }
    }

    pub fn redirect_state(&self) -> &RedirectState {
        &self.state
    }

    pub fn get_load_state(&self) -> LoadState {
        self.load_state
    }

    /// Connections opened so far (a reused connection is not counted again).
    pub fn connections_opened(&self) -> usize {
        self.connections_opened
    }

    /// Run `request` and every redirect after it.
    pub async fn start(&mut self, request: RequestDescriptor) -> Result<HttpResponse, NetError> {
        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        let cancel = self.options.cancellation.clone();
        let mut current = request;

        loop {
            if cancel.is_cancelled() {
                self.release();
                return Err(NetError::Cancelled);
            }

            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Step::Failed(NetError::Cancelled),
                step = with_deadline(deadline, self.step(&current)) => step,
            };

            match step {
                Step::Continue(next) => current = next,
                Step::Done(response) => {
                    self.load_state = LoadState::Idle;
                    return Ok(response);
                }
                Step::Failed(e) => {
                    tracing::debug!(url = %self.state.current_url, hop = self.state.hops_taken, error = %e, "request failed");
                    self.release();
                    return Err(e);
                }
            }
        }
    }

    /// Run one hop: connect (or reuse), send, read, then decide.
    pub async fn step(&mut self, request: &RequestDescriptor) -> Step {
        let hop = self.state.hops_taken;
        self.state.current_url = request.url.clone();
        self.state.retained_headers = request.headers.clone();

        let response = match self.exchange(request, hop).await {
            Ok(response) => response,
            Err(e) => return Step::Failed(e),
        };

        if !keeps_alive(&response) {
            self.stream = None;
        }

        let status = response.status();
        tracing::debug!(url = %request.url, hop, status = status.as_u16(), "received response");

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let location = match location {
            Some(location) if self.options.allow_auto_redirect && is_redirect(status) => location,
            _ => return Step::Done(HttpResponse::new(response, request.url.clone(), hop)),
        };

        if hop >= self.options.max_redirects {
            tracing::warn!(url = %request.url, max = self.options.max_redirects, "redirect limit reached");
            return Step::Failed(NetError::TooManyRedirects);
        }

        let info = match RedirectInfo::compute(&request.method, &request.url, status, &location) {
            Ok(info) => info,
            Err(e) => return Step::Failed(e),
        };

        self.state.hops_taken += 1;
        self.load_state = LoadState::FollowingRedirect;
        tracing::debug!(
            from = %request.url,
            to = %info.new_url,
            hop = self.state.hops_taken,
            status = status.as_u16(),
            method = %info.new_method,
            "following redirect"
        );

        Step::Continue(request.redirected(&info, self.options.keep_temporary_headers_on_redirect))
    }

    /// Send `request` and read the full response. A reused connection that
    /// turns out to be dead is replaced once.
    async fn exchange(
        &mut self,
        request: &RequestDescriptor,
        hop: usize,
    ) -> Result<Response<Bytes>, NetError> {
        let cookie_store = Arc::clone(&self.cookie_store);
        let mut replaced_stale = false;

        loop {
            self.ensure_stream(&request.url)
                .await
                .map_err(|e| e.at_hop(hop))?;
            let Some(stream) = self.stream.as_mut() else {
                return Err(NetError::ConnectionClosed);
            };
            let reused = stream.is_reused();

            self.load_state = LoadState::SendingRequest;
            let mut transaction = HttpNetworkTransaction::new(request, &cookie_store);
            let result = transaction.start(stream).await;
            self.state.cookies_collected += transaction.cookies_stored();

            match result {
                Ok(response) => return Ok(response),
                Err(NetError::ConnectionClosed | NetError::EmptyResponse)
                    if reused && !replaced_stale =>
                {
                    tracing::debug!(url = %request.url, "reused connection was closed, reconnecting");
                    self.stream = None;
                    replaced_stale = true;
                }
                Err(e) => {
                    self.stream = None;
                    return Err(e);
                }
            }
        }
    }

    /// Make sure `self.stream` is an open connection to the origin of `url`.
    async fn ensure_stream(&mut self, url: &Url) -> Result<(), NetError> {
        let key = ConnectionKey::from_url(url)?;
        if let Some(stream) = &self.stream {
            if *stream.key() == key && !stream.is_closed() {
                tracing::debug!(host = %key.host, port = key.port, "reusing connection");
                return Ok(());
            }
        }

        // Release the previous connection and its tunnel first.
        self.stream = None;
        self.load_state = if self.options.proxy.is_direct() {
            LoadState::Connecting
        } else {
            LoadState::EstablishingProxyTunnel
        };

        let stream = self.factory.create_stream(url, &self.options.proxy).await?;
        self.connections_opened += 1;
        self.stream = Some(stream);
        Ok(())
    }

    fn release(&mut self) {
        self.stream = None;
        self.load_state = LoadState::Idle;
    }
}

/// Whether the connection may carry another request after `response`.
fn keeps_alive(response: &Response<Bytes>) -> bool {
    let connection = response
        .headers()
        .get(CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase());

    match connection.as_deref() {
        Some(v) if v.contains("close") => false,
        Some(v) if v.contains("keep-alive") => true,
        _ => response.version() != Version::HTTP_10,
    }
}

async fn with_deadline<F>(deadline: Option<Instant>, fut: F) -> Step
where
    F: Future<Output = Step>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .unwrap_or(Step::Failed(NetError::Timeout)),
        None => fut.await,
    }
}

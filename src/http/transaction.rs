use crate::base::loadstate::LoadState;
use crate::base::neterror::NetError;
use crate::cookies::jar::CookieJar;
use crate::http::streamfactory::HttpStream;
use crate::urlrequest::request::RequestDescriptor;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST, SET_COOKIE};
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use std::collections::HashSet;
use url::{Position, Url};

/// Internal state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    SendRequest,
    ReadBody,
    Done,
}

impl State {
    /// Map internal state to public LoadState.
    fn to_load_state(self) -> LoadState {
        match self {
            State::Idle => LoadState::Idle,
            State::SendRequest => LoadState::SendingRequest,
            State::ReadBody => LoadState::ReadingResponse,
            State::Done => LoadState::Idle,
        }
    }
}

/// One hop of a request chain: send the request on a connection and read
/// the full response.
///
/// The outgoing `Cookie` header is computed from the jar for this hop's URL,
/// and every `Set-Cookie` line of the response is offered back to the jar.
pub struct HttpNetworkTransaction<'a> {
    request: &'a RequestDescriptor,
    cookie_store: &'a CookieJar,
    state: State,
    response: Option<Response<Incoming>>,
    cookies_stored: usize,
}

impl<'a> HttpNetworkTransaction<'a> {
    pub fn new(request: &'a RequestDescriptor, cookie_store: &'a CookieJar) -> Self {
        Self {
            request,
            cookie_store,
            state: State::Idle,
            response: None,
            cookies_stored: 0,
        }
    }

    /// Get the current load state (for progress reporting).
    pub fn get_load_state(&self) -> LoadState {
        self.state.to_load_state()
    }

    /// Number of `Set-Cookie` lines the jar accepted.
    pub fn cookies_stored(&self) -> usize {
        self.cookies_stored
    }

    /// Run the transaction on `stream`.
    pub async fn start(&mut self, stream: &mut HttpStream) -> Result<Response<Bytes>, NetError> {
        self.state = State::SendRequest;

        loop {
            match self.state {
                State::Idle | State::Done => return Err(NetError::InvalidResponse),
                State::SendRequest => {
                    let req = self.build_request()?;
                    let resp = stream.send_request(req).await?;

                    for val in resp.headers().get_all(SET_COOKIE) {
                        match val.to_str() {
                            Ok(line) => {
                                if self.cookie_store.store(&self.request.url, line) {
                                    self.cookies_stored += 1;
                                }
                            }
                            Err(_) => {
                                tracing::debug!(url = %self.request.url, "ignoring non-ASCII Set-Cookie");
                            }
                        }
                    }

                    self.response = Some(resp);
                    self.state = State::ReadBody;
                }
                State::ReadBody => {
                    let resp = self.response.take().ok_or(NetError::EmptyResponse)?;
                    let (parts, body) = resp.into_parts();
                    let body = body
                        .collect()
                        .await
                        .map_err(|_| NetError::HttpBodyError)?
                        .to_bytes();

                    self.state = State::Done;
                    return Ok(Response::from_parts(parts, body));
                }
            }
        }
    }

    /// Build the wire request: origin-form target, `Host`, merged `Cookie`,
    /// body with its entity headers.
    pub fn build_request(&self) -> Result<Request<Full<Bytes>>, NetError> {
        let url = &self.request.url;
        let mut headers = self.request.headers.clone();

        let host = &url[Position::BeforeHost..Position::AfterPort];
        if host.is_empty() {
            return Err(NetError::InvalidUrl);
        }
        headers.insert(HOST.as_str(), host)?;

        let explicit = headers
            .get(COOKIE.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        headers.remove(COOKIE.as_str());
        if let Some(cookie) = merge_cookie_header(self.cookie_store, url, explicit.as_deref()) {
            headers.insert(COOKIE.as_str(), &cookie)?;
        }

        let body = &self.request.body;
        if body.is_empty() {
            headers.remove(CONTENT_LENGTH.as_str());
            if matches!(self.request.method, Method::POST | Method::PUT | Method::PATCH) {
                headers.insert(CONTENT_LENGTH.as_str(), "0")?;
            }
        } else {
            if !headers.contains(CONTENT_TYPE.as_str()) {
                if let Some(content_type) = body.content_type() {
                    headers.insert(CONTENT_TYPE.as_str(), content_type)?;
                }
            }
            headers.insert(CONTENT_LENGTH.as_str(), &body.len().to_string())?;
        }

        let target = &url[Position::BeforePath..Position::AfterQuery];
        let mut req = Request::builder()
            .method(self.request.method.clone())
            .uri(target)
            .body(Full::new(body.data()))
            .map_err(|_| NetError::InvalidUrl)?;
        *req.headers_mut() = headers.to_header_map();

        Ok(req)
    }
}

/// Merge the jar's cookies for `url` with a caller-supplied `Cookie` value.
///
/// Jar cookies come first (most specific path first). A caller cookie
/// replaces a jar cookie of the same name. Output is de-duplicated by name.
pub fn merge_cookie_header(jar: &CookieJar, url: &Url, explicit: Option<&str>) -> Option<String> {
    let explicit_pairs: Vec<(&str, &str)> = explicit
        .map(|value| {
            value
                .split(';')
                .map(str::trim)
                .filter(|pair| !pair.is_empty())
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .collect()
        })
        .unwrap_or_default();

    let mut seen: HashSet<String> = explicit_pairs.iter().map(|(n, _)| n.to_string()).collect();
    let mut pairs: Vec<String> = jar
        .matches(url)
        .into_iter()
        .filter(|c| seen.insert(c.name.clone()))
        .map(|c| c.pair())
        .collect();

    let mut explicit_seen = HashSet::new();
    pairs.extend(
        explicit_pairs
            .into_iter()
            .filter(|(n, _)| explicit_seen.insert(*n))
            .map(|(n, v)| format!("{}={}", n, v)),
    );

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

//! HTTP Response with body access.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http::header::{LOCATION, SET_COOKIE};
use http::{HeaderMap, StatusCode, Version};
use url::Url;

/// Final response of a request chain.
///
/// The body has been read in full by the time the response is returned, so
/// every accessor is synchronous.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    url: Url,
    redirect_count: usize,
    body: Bytes,
}

impl HttpResponse {
    /// Build from a fully read hop response.
    pub fn new(response: http::Response<Bytes>, url: Url, redirect_count: usize) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            version: parts.version,
            headers: parts.headers,
            url,
            redirect_count,
            body,
        }
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of `name` as a string, if present and valid.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// URL of the hop that produced this response.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Number of redirects followed to get here.
    pub fn redirect_count(&self) -> usize {
        self.redirect_count
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `Location` of a redirect response returned as-is (auto redirect off).
    pub fn location(&self) -> Option<&str> {
        self.header(LOCATION.as_str())
    }

    /// `Set-Cookie` lines of the final hop.
    pub fn cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Borrow the body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning the body.
    pub fn bytes(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.to_vec()).map_err(|_| NetError::InvalidUtf8)
    }

    /// Body deserialized from JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.body).map_err(|_| NetError::JsonParseError)
    }
}

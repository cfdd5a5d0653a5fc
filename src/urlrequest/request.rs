use crate::base::neterror::NetError;
use crate::http::orderedheaders::OrderedHeaderMap;
use crate::http::redirect::RedirectInfo;
use crate::http::requestbody::RequestBody;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, PROXY_AUTHORIZATION};
use http::Method;
use url::Url;

/// Immutable description of one hop: method, URL, headers, body.
///
/// The engine never mutates a descriptor; the next hop of a redirect is a
/// new one built by [`redirected`](Self::redirected).
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: OrderedHeaderMap,
    pub body: RequestBody,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: OrderedHeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Parse `url` and build a descriptor with no headers and no body.
    pub fn parse(method: Method, url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|_| NetError::InvalidUrl)?;
        Ok(Self::new(method, url))
    }

    pub fn with_headers(mut self, headers: OrderedHeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Descriptor for the hop after `redirect`.
    ///
    /// Temporary headers are kept only with `keep_temporary_headers`.
    /// A coerced method loses the body and its entity headers. A host change
    /// loses credentials and any explicit `Cookie` header.
    pub fn redirected(&self, redirect: &RedirectInfo, keep_temporary_headers: bool) -> Self {
        let mut headers = self.headers.clone();
        if !keep_temporary_headers {
            headers.drop_temporary();
        }

        let body = if redirect.drop_body {
            headers.remove(CONTENT_TYPE.as_str());
            headers.remove(CONTENT_LENGTH.as_str());
            RequestBody::Empty
        } else {
            self.body.clone()
        };

        if redirect.host_changed {
            headers.remove(AUTHORIZATION.as_str());
            headers.remove(PROXY_AUTHORIZATION.as_str());
            headers.remove(COOKIE.as_str());
        }

        Self {
            method: redirect.new_method.clone(),
            url: redirect.new_url.clone(),
            headers,
            body,
        }
    }
}

//! Redirect decisions.
//!
//! Pure functions computing what the next hop of a chain looks like.
//! Mirrors Chromium's `net::RedirectInfo`.

use crate::base::neterror::NetError;
use http::{Method, StatusCode};
use url::Url;

/// Whether `status` is a redirect the engine follows.
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Method to use after a redirect with `status`.
///
/// 303 turns everything but HEAD into GET. 301 and 302 turn POST into GET
/// (what browsers do, despite RFC 7231). 307 and 308 keep the method.
pub fn method_for_redirect(method: &Method, status: StatusCode) -> Method {
    match status.as_u16() {
        303 if *method != Method::HEAD => Method::GET,
        301 | 302 if *method == Method::POST => Method::GET,
        _ => method.clone(),
    }
}

/// Everything the engine needs to build the next hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectInfo {
    pub status_code: StatusCode,
    pub new_method: Method,
    pub new_url: Url,
    /// Body and its entity headers must go: the method was coerced.
    pub drop_body: bool,
    /// Target host differs from the current one.
    pub host_changed: bool,
}

impl RedirectInfo {
    /// Compute the redirect for a `status` response with `location` received
    /// for `method current_url`.
    ///
    /// `location` is resolved against `current_url`; the result must be an
    /// http(s) URL. A target without a fragment inherits the current one.
    pub fn compute(
        method: &Method,
        current_url: &Url,
        status: StatusCode,
        location: &str,
    ) -> Result<Self, NetError> {
        let mut new_url = current_url
            .join(location.trim())
            .map_err(|_| NetError::InvalidRedirect)?;
        if !matches!(new_url.scheme(), "http" | "https") || new_url.host_str().is_none() {
            return Err(NetError::InvalidRedirect);
        }
        if new_url.fragment().is_none() {
            new_url.set_fragment(current_url.fragment());
        }

        let new_method = method_for_redirect(method, status);
        let drop_body = new_method != *method;
        let host_changed = new_url.host_str() != current_url.host_str();

        Ok(Self {
            status_code: status,
            new_method,
            new_url,
            drop_body,
            host_changed,
        })
    }
}

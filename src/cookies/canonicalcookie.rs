use time::OffsetDateTime;

/// Represents a stored cookie.
/// Modeled after Chromium's `net::CanonicalCookie`.
///
/// `domain` is the normalized domain (lowercase). A leading dot marks a
/// wildcard cookie that also applies to subdomains; without it the cookie is
/// host-only and matches its exact host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub creation_time: OffsetDateTime,
    pub expiration_time: Option<OffsetDateTime>,
    pub secure: bool,
    pub http_only: bool,
    pub host_only: bool,
}

impl CanonicalCookie {
    /// Build a cookie. `host_only` is derived from the domain: a leading dot
    /// makes it a wildcard cookie.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
        expiration_time: Option<OffsetDateTime>,
    ) -> Self {
        let domain = domain.into().to_ascii_lowercase();
        let mut path = path.into();
        if !path.starts_with('/') {
            path = "/".to_string();
        }
        Self {
            name: name.into(),
            value: value.into(),
            host_only: !domain.starts_with('.'),
            domain,
            path,
            creation_time: OffsetDateTime::now_utc(),
            expiration_time,
            secure: false,
            http_only: false,
        }
    }

    pub fn is_expired(&self, current_time: OffsetDateTime) -> bool {
        // Session cookies never expire on their own.
        self.expiration_time
            .is_some_and(|expiry| expiry <= current_time)
    }

    /// Check if the cookie applies to `request_host`.
    ///
    /// Host-only cookies need an exact (case-insensitive) match. Wildcard
    /// cookies (`.google.com`) match the bare domain and any subdomain at a
    /// label boundary.
    pub fn domain_matches(&self, request_host: &str) -> bool {
        if self.host_only {
            return self.domain.eq_ignore_ascii_case(request_host);
        }

        let bare = &self.domain[1..];
        if request_host.eq_ignore_ascii_case(bare) {
            return true;
        }

        // Compare the ".google.com" suffix including its dot, so that
        // "evilgoogle.com" does not match.
        request_host.len() > self.domain.len()
            && request_host.is_char_boundary(request_host.len() - self.domain.len())
            && request_host[request_host.len() - self.domain.len()..]
                .eq_ignore_ascii_case(&self.domain)
    }

    /// Check if the cookie path applies to `request_path` (RFC 6265 5.1.4).
    pub fn path_matches(&self, request_path: &str) -> bool {
        let cookie_path = self.path.as_str();
        if request_path == cookie_path {
            return true;
        }

        if let Some(rest) = request_path.strip_prefix(cookie_path) {
            return cookie_path.ends_with('/') || rest.starts_with('/');
        }

        false
    }

    /// `name=value` as sent in a `Cookie` header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

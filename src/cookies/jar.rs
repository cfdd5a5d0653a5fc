use crate::cookies::canonicalcookie::CanonicalCookie;
use crate::cookies::filter::{filter_cookie, filter_domain};
use dashmap::DashMap;
use std::collections::HashSet;
use time::OffsetDateTime;
use url::{Host, Url};

/// Maximum cookies per domain (Chromium default).
const MAX_COOKIES_PER_DOMAIN: usize = 50;

/// Maximum total cookies.
const MAX_COOKIES_TOTAL: usize = 3000;

/// Per-client cookie store.
///
/// Cookies are keyed by `(domain, path, name)`. The domain key keeps the
/// leading dot of wildcard cookies, so `example.com` (host-only) and
/// `.example.com` (wildcard) live side by side.
///
/// Every insert runs under the write lock of one `DashMap` shard, so a
/// concurrent [`matches`](Self::matches) sees either the old or the new
/// cookie, never a partial one.
pub struct CookieJar {
    store: DashMap<String, Vec<CanonicalCookie>>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieJar")
            .field("domains", &self.store.len())
            .field("cookies", &self.total_cookie_count())
            .finish()
    }
}

impl CookieJar {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Store one `Set-Cookie` line received from `url`.
    ///
    /// The line goes through [`filter_cookie`] and its domain through
    /// [`filter_domain`]. Lines that fail to parse, carry an invalid domain,
    /// or name a domain the responding host does not belong to are dropped.
    /// Returns whether the line was accepted. An already-expired cookie is
    /// accepted as a deletion of the stored one.
    pub fn store(&self, url: &Url, set_cookie_line: &str) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };

        let filtered = filter_cookie(set_cookie_line);
        let parsed = match cookie::Cookie::parse(filtered.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "dropping malformed Set-Cookie");
                return false;
            }
        };

        let Some(domain) = Self::cookie_domain(url, host, &filtered) else {
            tracing::debug!(url = %url, line = %filtered, "dropping cookie with invalid domain");
            return false;
        };

        let now = OffsetDateTime::now_utc();
        let expiration_time = match parsed.max_age() {
            Some(max_age) if max_age <= time::Duration::ZERO => Some(now),
            // Out-of-range lifetimes saturate to the latest representable instant.
            Some(max_age) => Some(now.checked_add(max_age).unwrap_or_else(far_future)),
            None => parsed.expires_datetime(),
        };

        let mut cookie = CanonicalCookie::new(
            parsed.name(),
            parsed.value(),
            domain,
            parsed.path().unwrap_or("/"),
            expiration_time,
        );
        cookie.secure = parsed.secure().unwrap_or(false);
        cookie.http_only = parsed.http_only().unwrap_or(false);

        if cookie.is_expired(now) {
            self.delete(&cookie.domain, &cookie.path, &cookie.name);
        } else {
            self.set_canonical_cookie(cookie);
        }
        true
    }

    /// Resolve the normalized domain a cookie from `host` is stored under.
    ///
    /// Without a `Domain` attribute the cookie is host-only. With one, the
    /// filtered domain must cover the responding host; a multi-level
    /// domain is stored in wildcard form. A single-label domain can only be
    /// host-only, so it must name the responding host itself.
    fn cookie_domain(url: &Url, host: &str, line: &str) -> Option<String> {
        let host = host.to_ascii_lowercase();
        let Some(attribute) = raw_attribute(line, "domain") else {
            return filter_domain(Some(&host));
        };

        let domain = filter_domain(Some(attribute))?.to_ascii_lowercase();
        let bare = domain.trim_start_matches('.');

        if matches!(url.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_))) {
            return (bare == host).then_some(host);
        }

        let covers_host = host == bare
            || (host.len() > bare.len()
                && host.ends_with(bare)
                && host.as_bytes()[host.len() - bare.len() - 1] == b'.');
        if !covers_host {
            return None;
        }

        if !bare.contains('.') {
            (bare == host).then_some(host)
        } else if domain.starts_with('.') {
            Some(domain)
        } else {
            Some(format!(".{}", domain))
        }
    }

    /// Insert or overwrite a cookie keyed by `(domain, path, name)`.
    pub fn set_canonical_cookie(&self, cookie: CanonicalCookie) {
        let mut entry = self.store.entry(cookie.domain.clone()).or_default();

        // Remove existing if name/domain/path match
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);

        // Enforce per-domain limit with LRU eviction
        while entry.len() >= MAX_COOKIES_PER_DOMAIN {
            if let Some(oldest_idx) = entry
                .iter()
                .enumerate()
                .min_by_key(|(_, c)| c.creation_time)
                .map(|(i, _)| i)
            {
                entry.remove(oldest_idx);
            } else {
                break;
            }
        }

        entry.push(cookie);
        drop(entry); // Release lock before checking global count

        self.enforce_global_limit();
    }

    /// Remove the cookie stored under `(domain, path, name)`, if any.
    pub fn delete(&self, domain: &str, path: &str, name: &str) -> bool {
        let Some(mut entry) = self.store.get_mut(domain) else {
            return false;
        };
        let before = entry.len();
        entry.retain(|c| c.name != name || c.path != path);
        before != entry.len()
    }

    /// Enforce the global cookie limit by evicting oldest cookies.
    fn enforce_global_limit(&self) {
        while self.total_cookie_count() > MAX_COOKIES_TOTAL {
            let mut oldest: Option<(String, usize, OffsetDateTime)> = None;

            for entry in self.store.iter() {
                for (idx, cookie) in entry.value().iter().enumerate() {
                    let older = oldest
                        .as_ref()
                        .map_or(true, |(_, _, t)| cookie.creation_time < *t);
                    if older {
                        oldest = Some((entry.key().clone(), idx, cookie.creation_time));
                    }
                }
            }

            let Some((domain, idx, _)) = oldest else {
                break;
            };
            if let Some(mut entry) = self.store.get_mut(&domain) {
                if idx < entry.len() {
                    entry.remove(idx);
                }
            }
        }
    }

    /// Get the cookies that apply to `url`.
    ///
    /// Sorted by path length (longest first), then creation time (oldest
    /// first). Expired cookies are skipped whether or not they have been
    /// evicted yet.
    pub fn matches(&self, url: &Url) -> Vec<CanonicalCookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let host = host.to_ascii_lowercase();
        let is_ip = matches!(url.host(), Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)));
        let now = OffsetDateTime::now_utc();
        let mut result = Vec::new();

        for key in Self::candidate_keys(&host, is_ip) {
            let Some(entry) = self.store.get(&key) else {
                continue;
            };
            for cookie in entry.iter() {
                if !cookie.domain_matches(&host)
                    || !cookie.path_matches(url.path())
                    || (cookie.secure && url.scheme() != "https")
                    || cookie.is_expired(now)
                {
                    continue;
                }
                result.push(cookie.clone());
            }
        }

        result.sort_by(|a, b| {
            b.path
                .len()
                .cmp(&a.path.len())
                .then_with(|| a.creation_time.cmp(&b.creation_time))
        });

        result
    }

    /// Store keys that may hold cookies for `host`: the host itself and the
    /// wildcard form of the host and each parent domain.
    ///
    /// For "maps.google.com": "maps.google.com", ".maps.google.com",
    /// ".google.com", ".com".
    fn candidate_keys(host: &str, is_ip: bool) -> Vec<String> {
        let mut keys = vec![host.to_string()];
        if is_ip {
            return keys;
        }

        let mut rest = host;
        loop {
            keys.push(format!(".{}", rest));
            match rest.split_once('.') {
                Some((_, parent)) if !parent.is_empty() => rest = parent,
                _ => break,
            }
        }
        keys
    }

    /// Build the `Cookie` header value for `url`.
    ///
    /// Cookies are de-duplicated by name: the first one in
    /// [`matches`](Self::matches) order (most specific path) wins.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let mut seen = HashSet::new();
        let pairs: Vec<String> = self
            .matches(url)
            .into_iter()
            .filter(|c| seen.insert(c.name.clone()))
            .map(|c| c.pair())
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Remove every expired cookie. Returns how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let mut evicted = 0;
        self.store.retain(|_, cookies| {
            let before = cookies.len();
            cookies.retain(|c| !c.is_expired(now));
            evicted += before - cookies.len();
            !cookies.is_empty()
        });
        evicted
    }

    /// Get total cookie count.
    pub fn total_cookie_count(&self) -> usize {
        self.store.iter().map(|e| e.value().len()).sum()
    }

    /// Clear all cookies.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Iterate over all cookies (for export).
    pub fn iter_all_cookies(&self) -> impl Iterator<Item = CanonicalCookie> + '_ {
        self.store.iter().flat_map(|entry| entry.value().clone())
    }

    /// Export cookies to Netscape cookie format.
    ///
    /// The Netscape format is widely used by curl, wget, and other tools.
    /// Each line has the format:
    /// `domain\tinclude_subdomains\tpath\tsecure\texpiry\tname\tvalue`
    pub fn export_netscape(&self, domain_filter: Option<&str>) -> String {
        let mut lines = vec![
            "# Netscape HTTP Cookie File".to_string(),
            "# https://curl.se/docs/http-cookies.html".to_string(),
            String::new(),
        ];

        for cookie in self.iter_all_cookies() {
            if let Some(filter) = domain_filter {
                if !cookie.domain.contains(filter) {
                    continue;
                }
            }

            let include_subdomains = if cookie.host_only { "FALSE" } else { "TRUE" };
            let secure = if cookie.secure { "TRUE" } else { "FALSE" };
            let expiry = cookie
                .expiration_time
                .map(|t| t.unix_timestamp())
                .unwrap_or(0);

            lines.push(format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                cookie.domain,
                include_subdomains,
                cookie.path,
                secure,
                expiry,
                cookie.name,
                cookie.value
            ));
        }

        lines.join("\n")
    }

    /// Import cookies from Netscape format file content.
    ///
    /// Domains go through [`filter_domain`] like any received cookie; lines
    /// with an invalid domain are skipped. Returns the number imported.
    pub fn import_netscape(&self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 7 {
                continue;
            }

            let Some(filtered) = filter_domain(Some(parts[0])) else {
                continue;
            };
            let bare = filtered.trim_start_matches('.');
            let domain = if parts[1].eq_ignore_ascii_case("TRUE") && bare.contains('.') {
                format!(".{}", bare)
            } else {
                bare.to_string()
            };

            let expiry: i64 = parts[4].parse().unwrap_or(0);
            let expiration_time = if expiry > 0 {
                OffsetDateTime::from_unix_timestamp(expiry).ok()
            } else {
                None
            };

            let mut cookie =
                CanonicalCookie::new(parts[5], parts[6], domain, parts[2], expiration_time);
            cookie.secure = parts[3].eq_ignore_ascii_case("TRUE");

            self.set_canonical_cookie(cookie);
            count += 1;
        }

        count
    }
}

/// Expiry used when `Max-Age` overflows the calendar: 9999-12-31T23:59:59Z.
fn far_future() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(253_402_300_799).unwrap_or(OffsetDateTime::now_utc())
}

/// Value of the first attribute named `name` (case-insensitive) in a
/// `Set-Cookie` line, as written by the server.
fn raw_attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    line.split(';')
        .skip(1)
        .filter_map(|segment| segment.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim())
}

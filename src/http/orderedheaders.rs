use crate::base::neterror::NetError;
use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;
use std::str::FromStr;

/// Lifetime of a request header across a redirect chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderKind {
    /// Sent on every hop.
    #[default]
    Permanent,
    /// Meant for the first hop; dropped on redirect unless the request keeps
    /// temporary headers.
    Temporary,
}

/// A header map that strictly preserves insertion order.
///
/// Each entry carries a [`HeaderKind`] so the redirect engine can decide
/// which headers survive the next hop.
#[derive(Debug, Clone, Default)]
pub struct OrderedHeaderMap {
    headers: Vec<(HeaderName, HeaderValue, HeaderKind)>,
}

impl OrderedHeaderMap {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Set a permanent header, replacing any existing value.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        self.insert_with_kind(name, value, HeaderKind::Permanent)
    }

    /// Set a temporary header, replacing any existing value.
    pub fn insert_temporary(&mut self, name: &str, value: &str) -> Result<(), NetError> {
        self.insert_with_kind(name, value, HeaderKind::Temporary)
    }

    pub fn insert_with_kind(
        &mut self,
        name: &str,
        value: &str,
        kind: HeaderKind,
    ) -> Result<(), NetError> {
        let name_header = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
        let value_header = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
        self.set(name_header, value_header, kind);
        Ok(())
    }

    /// Chromium behavior: update the first entry in place (keeping its
    /// position), drop any duplicates, else append.
    pub fn set(&mut self, name: HeaderName, value: HeaderValue, kind: HeaderKind) {
        if let Some(pos) = self.headers.iter().position(|(n, _, _)| *n == name) {
            self.headers[pos].1 = value;
            self.headers[pos].2 = kind;
            let mut idx = 0;
            self.headers.retain(|(n, _, _)| {
                let keep = idx <= pos || *n != name;
                idx += 1;
                keep
            });
        } else {
            self.headers.push((name, value, kind));
        }
    }

    /// Add a value without replacing existing ones.
    pub fn append(&mut self, name: &str, value: &str, kind: HeaderKind) -> Result<(), NetError> {
        let name_header = HeaderName::from_str(name).map_err(|_| NetError::InvalidHeader)?;
        let value_header = HeaderValue::from_str(value).map_err(|_| NetError::InvalidHeader)?;
        self.headers.push((name_header, value_header, kind));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) {
        if let Ok(target) = HeaderName::from_str(name) {
            self.headers.retain(|(n, _, _)| *n != target);
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _, _)| *n == target)
            .map(|(_, v, _)| v)
    }

    pub fn kind(&self, name: &str) -> Option<HeaderKind> {
        let target = HeaderName::from_str(name).ok()?;
        self.headers
            .iter()
            .find(|(n, _, _)| *n == target)
            .map(|(_, _, k)| *k)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue, HeaderKind)> {
        self.headers.iter().map(|(n, v, k)| (n, v, *k))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Remove every temporary header.
    pub fn drop_temporary(&mut self) {
        self.headers.retain(|(_, _, k)| *k == HeaderKind::Permanent);
    }

    /// Lay `other` over this map. A name present in both keeps its position
    /// here but takes `other`'s values; new names are appended in order.
    pub fn overlay(&mut self, other: &OrderedHeaderMap) {
        let mut merged: Vec<(HeaderName, HeaderValue, HeaderKind)> =
            Vec::with_capacity(self.headers.len() + other.headers.len());
        for (name, value, kind) in self.headers.drain(..) {
            if other.headers.iter().any(|(n, _, _)| *n == name) {
                if !merged.iter().any(|(n, _, _)| *n == name) {
                    merged.extend(other.headers.iter().filter(|(n, _, _)| *n == name).cloned());
                }
            } else {
                merged.push((name, value, kind));
            }
        }
        for entry in other.headers.iter() {
            if !merged.iter().any(|(n, _, _)| *n == entry.0) {
                merged.extend(other.headers.iter().filter(|(n, _, _)| *n == entry.0).cloned());
            }
        }
        self.headers = merged;
    }

    /// Consumes the map and returns a standard http::HeaderMap.
    /// Note: http::HeaderMap preserves insertion order.
    pub fn to_header_map(self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value, _) in self.headers {
            map.append(name, value);
        }
        map
    }
}

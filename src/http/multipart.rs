//! Multipart form data support.
//!
//! Provides RFC 7578 `multipart/form-data` encoding of ordered
//! `(field, content)` pairs.
//!
//! # Example
//! ```
//! use agentnet::http::multipart::{Form, Part};
//!
//! let form = Form::new()
//!     .text("username", "user123")
//!     .part("file", Part::bytes(&b"file content"[..]).file_name("doc.txt"));
//!
//! assert!(form.content_type().starts_with("multipart/form-data; boundary="));
//! let body = form.into_body();
//! assert!(body.ends_with(b"--\r\n"));
//! ```

use bytes::Bytes;
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};

static BOUNDARY_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// An ordered multipart form.
#[derive(Debug)]
pub struct Form {
    boundary: String,
    fields: Vec<(Cow<'static, str>, Part)>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            fields: Vec::new(),
        }
    }

    /// Get the boundary string.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Add a text field.
    pub fn text<N, V>(self, name: N, value: V) -> Self
    where
        N: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        self.part(name, Part::text(value))
    }

    /// Add a custom part.
    pub fn part<N>(mut self, name: N, part: Part) -> Self
    where
        N: Into<Cow<'static, str>>,
    {
        self.fields.push((name.into(), part));
        self
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Exact encoded length.
    pub fn content_length(&self) -> usize {
        if self.fields.is_empty() {
            return 0;
        }

        let parts: usize = self
            .fields
            .iter()
            .map(|(name, part)| {
                // --boundary\r\n headers \r\n\r\n data \r\n
                2 + self.boundary.len() + 2 + part.format_headers(name).len() + 4 + part.data.len() + 2
            })
            .sum();

        // --boundary--\r\n
        parts + 2 + self.boundary.len() + 4
    }

    /// Encode the form into body bytes.
    pub fn into_body(self) -> Bytes {
        if self.fields.is_empty() {
            return Bytes::new();
        }

        let mut output = Vec::with_capacity(self.content_length());

        for (name, part) in &self.fields {
            output.extend_from_slice(b"--");
            output.extend_from_slice(self.boundary.as_bytes());
            output.extend_from_slice(b"\r\n");

            output.extend_from_slice(part.format_headers(name).as_bytes());
            output.extend_from_slice(b"\r\n\r\n");

            output.extend_from_slice(&part.data);
            output.extend_from_slice(b"\r\n");
        }

        output.extend_from_slice(b"--");
        output.extend_from_slice(self.boundary.as_bytes());
        output.extend_from_slice(b"--\r\n");

        Bytes::from(output)
    }
}

/// A part of a multipart form.
#[derive(Debug, Clone)]
pub struct Part {
    data: Bytes,
    content_type: Option<String>,
    file_name: Option<Cow<'static, str>>,
}

impl Part {
    /// Create a text part.
    pub fn text<V>(value: V) -> Self
    where
        V: Into<Cow<'static, str>>,
    {
        Self {
            data: Bytes::from(value.into().into_owned()),
            content_type: None,
            file_name: None,
        }
    }

    /// Create a part from bytes.
    pub fn bytes<B>(data: B) -> Self
    where
        B: Into<Bytes>,
    {
        Self {
            data: data.into(),
            content_type: Some("application/octet-stream".to_string()),
            file_name: None,
        }
    }

    /// Set the content type.
    pub fn content_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.content_type = Some(mime.into());
        self
    }

    /// Set the file name.
    pub fn file_name<S>(mut self, name: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.file_name = Some(name.into());
        self
    }

    fn format_headers(&self, name: &str) -> String {
        let mut header = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quotes(name)
        );

        if let Some(ref filename) = self.file_name {
            header.push_str(&format!("; filename=\"{}\"", escape_quotes(filename)));
        }

        if let Some(ref mime) = self.content_type {
            header.push_str(&format!("\r\nContent-Type: {}", mime));
        }

        header
    }

    /// Get the data length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if part is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Escape quotes, backslashes and line breaks in a parameter value.
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains(['"', '\\', '\r', '\n']) {
        Cow::Owned(
            s.replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\r', "\\r")
                .replace('\n', "\\n"),
        )
    } else {
        Cow::Borrowed(s)
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = BOUNDARY_COUNTER.fetch_add(1, Ordering::Relaxed);

    format!(
        "----agentnet-boundary-{:016x}{:08x}{:04x}",
        nanos,
        std::process::id(),
        seq & 0xffff
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_form() {
        let form = Form::new();
        assert!(form.is_empty());
        assert_eq!(form.content_length(), 0);
        assert!(form.into_body().is_empty());
    }

    #[test]
    fn test_text_field() {
        let body = Form::new().text("name", "value").into_body();

        let body_str = String::from_utf8_lossy(&body);
        assert!(body_str.contains("Content-Disposition: form-data; name=\"name\"\r\n\r\nvalue\r\n"));
    }

    #[test]
    fn test_file_part() {
        let part = Part::bytes(b"file data".as_slice())
            .file_name("test.txt")
            .content_type("text/plain");

        let body = Form::new().part("upload", part).into_body();

        let body_str = String::from_utf8_lossy(&body);
        assert!(body_str.contains("filename=\"test.txt\""));
        assert!(body_str.contains("Content-Type: text/plain"));
        assert!(body_str.contains("file data"));
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = Form::new();
        let b = Form::new();
        assert!(a.boundary().starts_with("----agentnet-boundary-"));
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_content_length_matches_body() {
        let form = Form::new()
            .text("key", "value")
            .part("f", Part::bytes(vec![0u8; 100]).file_name("a.bin"));

        let length = form.content_length();
        assert_eq!(length, form.into_body().len());
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes("normal"), "normal");
        assert_eq!(escape_quotes("with\"quote"), "with\\\"quote");
        assert_eq!(escape_quotes("with\\slash"), "with\\\\slash");
    }

    #[test]
    fn test_parts_keep_order() {
        let form = Form::new()
            .text("field1", "value1")
            .text("field2", "value2");
        let boundary = form.boundary().to_string();
        let body = String::from_utf8(form.into_body().to_vec()).unwrap();

        let first = body.find("field1").unwrap();
        let second = body.find("field2").unwrap();
        assert!(first < second);
        assert!(body.starts_with(&format!("--{}\r\n", boundary)));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }
}

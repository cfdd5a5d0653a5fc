//! Request body for POST/PUT operations.

use crate::base::neterror::NetError;
use crate::http::multipart::Form;
use bytes::Bytes;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const APPLICATION_JSON: &str = "application/json";

/// Request body for HTTP methods that send data.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body (GET, HEAD, DELETE).
    #[default]
    Empty,
    /// Body with raw bytes; the caller supplies any `Content-Type`.
    Bytes(Bytes),
    /// `application/x-www-form-urlencoded` parameters.
    Form(Bytes),
    /// `application/json` document.
    Json(Bytes),
    /// Encoded `multipart/form-data`.
    Multipart { data: Bytes, content_type: String },
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl From<Form> for RequestBody {
    fn from(form: Form) -> Self {
        let content_type = form.content_type();
        RequestBody::Multipart {
            data: form.into_body(),
            content_type,
        }
    }
}

impl RequestBody {
    /// Url-encode ordered `(name, value)` pairs.
    ///
    /// ```
    /// use agentnet::http::RequestBody;
    ///
    /// let body = RequestBody::form([("q", "rust lang"), ("page", "2")]);
    /// assert_eq!(body.data().as_ref(), b"q=rust+lang&page=2");
    /// assert_eq!(body.content_type(), Some("application/x-www-form-urlencoded"));
    /// ```
    pub fn form<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        RequestBody::Form(Bytes::from(encoded))
    }

    /// Serialize `value` as JSON.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self, NetError> {
        serde_json::to_vec(value)
            .map(|v| RequestBody::Json(Bytes::from(v)))
            .map_err(|_| NetError::InvalidRequestBody)
    }

    /// `Content-Type` implied by the body kind, if any.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            RequestBody::Empty | RequestBody::Bytes(_) => None,
            RequestBody::Form(_) => Some(FORM_URLENCODED),
            RequestBody::Json(_) => Some(APPLICATION_JSON),
            RequestBody::Multipart { content_type, .. } => Some(content_type),
        }
    }

    /// The encoded bytes. Cheap: `Bytes` is reference counted.
    pub fn data(&self) -> Bytes {
        match self {
            RequestBody::Empty => Bytes::new(),
            RequestBody::Bytes(b) | RequestBody::Form(b) | RequestBody::Json(b) => b.clone(),
            RequestBody::Multipart { data, .. } => data.clone(),
        }
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Get the length of the body in bytes.
    pub fn len(&self) -> usize {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Bytes(b) | RequestBody::Form(b) | RequestBody::Json(b) => b.len(),
            RequestBody::Multipart { data, .. } => data.len(),
        }
    }
}

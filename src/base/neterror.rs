use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum NetError {
    // Generic
    #[error("Request cancelled")]
    Cancelled,
    #[error("Request timed out")]
    Timeout,

    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Name not resolved")]
    NameNotResolved,
    #[error("SSL protocol error")]
    SslProtocolError,

    // Proxy Errors
    #[error("Proxy unreachable: {address}")]
    ProxyUnreachable { address: String },
    #[error("Proxy rejected credentials")]
    ProxyAuthRejected,
    #[error("Tunnel refused: {reason}")]
    TunnelRefused { reason: String },

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Unknown URL scheme")]
    UnknownUrlScheme,
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Invalid redirect")]
    InvalidRedirect,
    #[error("Too many redirects")]
    TooManyRedirects,
    #[error("Invalid response")]
    InvalidResponse,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Error reading response body")]
    HttpBodyError,
    #[error("Response body is not valid UTF-8")]
    InvalidUtf8,
    #[error("Response body is not valid JSON")]
    JsonParseError,
    #[error("Request body could not be encoded")]
    InvalidRequestBody,

    /// Wraps an error raised while connecting for the given hop of a
    /// redirect chain (0 is the initial request).
    #[error("{source} (hop {hop})")]
    AtHop { hop: usize, source: Box<NetError> },
}

impl NetError {
    pub fn proxy_unreachable(address: impl Into<String>) -> Self {
        NetError::ProxyUnreachable {
            address: address.into(),
        }
    }

    pub fn tunnel_refused(reason: impl Into<String>) -> Self {
        NetError::TunnelRefused {
            reason: reason.into(),
        }
    }

    /// Attach a hop index. Already-tagged errors keep their original index.
    pub fn at_hop(self, hop: usize) -> Self {
        match self {
            NetError::AtHop { .. } => self,
            other => NetError::AtHop {
                hop,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any hop tagging removed.
    pub fn root(&self) -> &NetError {
        match self {
            NetError::AtHop { source, .. } => source.root(),
            other => other,
        }
    }

    /// Hop index at which the error occurred, if known.
    pub fn hop(&self) -> Option<usize> {
        match self {
            NetError::AtHop { hop, .. } => Some(*hop),
            _ => None,
        }
    }

    /// True for the failures a proxy hop can produce.
    pub fn is_proxy_error(&self) -> bool {
        matches!(
            self.root(),
            NetError::ProxyUnreachable { .. }
                | NetError::ProxyAuthRejected
                | NetError::TunnelRefused { .. }
        )
    }

    /// Chromium `net_error_list.h` code for this error.
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::Cancelled => -3,
            NetError::Timeout => -7,
            NetError::ConnectionClosed => -100,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionFailed => -104,
            NetError::NameNotResolved => -105,
            NetError::SslProtocolError => -107,
            NetError::TunnelRefused { .. } => -111,
            NetError::ProxyAuthRejected => -127,
            NetError::ProxyUnreachable { .. } => -130,
            NetError::InvalidUrl => -300,
            NetError::UnknownUrlScheme => -302,
            NetError::InvalidRedirect => -303,
            NetError::TooManyRedirects => -310,
            NetError::InvalidResponse => -320,
            NetError::EmptyResponse => -324,
            NetError::InvalidHeader => -376,
            // Crate specific codes
            NetError::HttpBodyError => -10001,
            NetError::InvalidUtf8 => -10002,
            NetError::JsonParseError => -10003,
            NetError::InvalidRequestBody => -10004,
            NetError::AtHop { source, .. } => source.as_i32(),
        }
    }
}

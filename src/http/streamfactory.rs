use crate::base::neterror::NetError;
use crate::socket::connectjob::ConnectJob;
use crate::socket::proxy::ProxyChain;
use crate::socket::stream::{TcpConnector, TlsLayer, TokioTcpConnector};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Identity of a reusable connection: scheme, host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ConnectionKey {
    pub fn from_url(url: &Url) -> Result<Self, NetError> {
        Ok(Self {
            scheme: url.scheme().to_string(),
            host: url.host_str().ok_or(NetError::InvalidUrl)?.to_ascii_lowercase(),
            port: url.port_or_known_default().ok_or(NetError::InvalidUrl)?,
        })
    }
}

/// An HTTP/1.1 connection, possibly running through proxy tunnels.
/// Equivalent to net::HttpStream.
///
/// Dropping the stream aborts the hyper connection task, which closes the
/// socket and every tunnel under it.
pub struct HttpStream {
    sender: http1::SendRequest<Full<Bytes>>,
    driver: JoinHandle<()>,
    key: ConnectionKey,
    requests_sent: usize,
}

impl HttpStream {
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// True once the peer closed the connection or hyper gave up on it.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed() || self.driver.is_finished()
    }

    /// True if a request has already gone over this connection.
    pub fn is_reused(&self) -> bool {
        self.requests_sent > 0
    }

    pub async fn send_request(
        &mut self,
        req: Request<Full<Bytes>>,
    ) -> Result<Response<Incoming>, NetError> {
        self.sender
            .ready()
            .await
            .map_err(|_| NetError::ConnectionClosed)?;

        let response = self.sender.send_request(req).await.map_err(|e| {
            tracing::debug!(error = %e, "request failed on connection");
            if e.is_parse() {
                NetError::InvalidResponse
            } else if e.is_incomplete_message() {
                NetError::EmptyResponse
            } else {
                NetError::ConnectionClosed
            }
        })?;
        self.requests_sent += 1;
        Ok(response)
    }
}

impl Drop for HttpStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

impl std::fmt::Debug for HttpStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStream")
            .field("key", &self.key)
            .field("requests_sent", &self.requests_sent)
            .finish()
    }
}

/// Creates [`HttpStream`]s over the configured TCP and TLS layers.
pub struct HttpStreamFactory {
    connector: Arc<dyn TcpConnector>,
    tls: Option<Arc<dyn TlsLayer>>,
}

impl Default for HttpStreamFactory {
    fn default() -> Self {
        Self::new(Arc::new(TokioTcpConnector), None)
    }
}

impl HttpStreamFactory {
    pub fn new(connector: Arc<dyn TcpConnector>, tls: Option<Arc<dyn TlsLayer>>) -> Self {
        Self { connector, tls }
    }

    /// Connect to the origin of `url` through `chain` and run the HTTP/1.1
    /// handshake.
    pub async fn create_stream(&self, url: &Url, chain: &ProxyChain) -> Result<HttpStream, NetError> {
        let key = ConnectionKey::from_url(url)?;

        let socket = ConnectJob::new(chain, self.connector.as_ref(), self.tls.as_deref())
            .connect(url)
            .await?;

        let (sender, conn) = http1::handshake(TokioIo::new(socket))
            .await
            .map_err(|_| NetError::ConnectionFailed)?;

        let driver = tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection closed with error");
            }
        });

        tracing::debug!(host = %key.host, port = key.port, proxies = chain.len(), "opened connection");

        Ok(HttpStream {
            sender,
            driver,
            key,
            requests_sent: 0,
        })
    }
}

impl std::fmt::Debug for HttpStreamFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStreamFactory")
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

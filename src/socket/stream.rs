//! Socket abstraction for tunnelled and polymorphic socket handling.
//!
//! A connection may be plain TCP, TCP through one or more proxy tunnels, or
//! any of those wrapped in TLS by a [`TlsLayer`]. [`BoxedSocket`] erases the
//! concrete type so the HTTP layer sees one byte stream.
//!
//! Based on Chromium's `StreamSocket` interface which provides polymorphism
//! for `TcpClientSocket`, `SSLClientSocket`, and nested tunnel sockets.

use crate::base::neterror::NetError;
use futures::future::BoxFuture;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// A trait for any socket that supports async read/write operations.
///
/// Chromium equivalent: `net::StreamSocket`
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> StreamSocket for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// A boxed dynamic [`StreamSocket`].
pub struct BoxedSocket {
    inner: Pin<Box<dyn StreamSocket>>,
}

impl BoxedSocket {
    /// Create a new BoxedSocket from any StreamSocket.
    pub fn new<S: StreamSocket>(socket: S) -> Self {
        Self {
            inner: Box::pin(socket),
        }
    }
}

impl std::fmt::Debug for BoxedSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoxedSocket")
    }
}

impl AsyncRead for BoxedSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_read(cx, buf)
    }
}

impl AsyncWrite for BoxedSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.inner.as_mut().poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.inner.as_mut().poll_shutdown(cx)
    }
}

/// Opens raw TCP connections.
///
/// Chromium equivalent: `net::ClientSocketFactory`
pub trait TcpConnector: Send + Sync + 'static {
    /// Connect to `host:port`. `host` is a hostname or an IP literal
    /// without brackets.
    fn connect<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, Result<BoxedSocket, NetError>>;
}

/// Default connector: system resolver plus `tokio::net::TcpStream`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTcpConnector;

impl TcpConnector for TokioTcpConnector {
    fn connect<'a>(&'a self, host: &'a str, port: u16) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host, port))
                .await
                .map_err(|_| NetError::NameNotResolved)?;

            let mut last_error = NetError::NameNotResolved;
            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => {
                        let _ = stream.set_nodelay(true);
                        return Ok(BoxedSocket::new(stream));
                    }
                    Err(e) => {
                        tracing::debug!(%addr, error = %e, "tcp connect attempt failed");
                        last_error = match e.kind() {
                            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
                            _ => NetError::ConnectionFailed,
                        };
                    }
                }
            }
            Err(last_error)
        })
    }
}

/// Wraps an established (possibly tunnelled) socket in TLS for `https`
/// targets.
///
/// Chromium equivalent: `net::SSLClientSocket`
pub trait TlsLayer: Send + Sync + 'static {
    fn wrap<'a>(
        &'a self,
        socket: BoxedSocket,
        server_name: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>>;
}

//! BoringSSL-backed [`TlsLayer`], enabled with the `boring-tls` feature.
//!
//! Chromium equivalent: `net::SSLClientSocketImpl`

use crate::base::neterror::NetError;
use crate::socket::stream::{BoxedSocket, TlsLayer};
use boring::ssl::{SslConnector, SslMethod, SslVersion};
use futures::future::BoxFuture;

/// TLS client on top of BoringSSL with system roots and hostname checks.
///
/// Only `http/1.1` is offered over ALPN.
#[derive(Clone)]
pub struct BoringTlsLayer {
    connector: SslConnector,
}

impl std::fmt::Debug for BoringTlsLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoringTlsLayer")
    }
}

impl BoringTlsLayer {
    pub fn new() -> Result<Self, NetError> {
        let mut builder =
            SslConnector::builder(SslMethod::tls()).map_err(|_| NetError::SslProtocolError)?;
        builder
            .set_alpn_protos(b"\x08http/1.1")
            .map_err(|_| NetError::SslProtocolError)?;
        builder
            .set_min_proto_version(Some(SslVersion::TLS1_2))
            .map_err(|_| NetError::SslProtocolError)?;

        Ok(Self {
            connector: builder.build(),
        })
    }
}

impl TlsLayer for BoringTlsLayer {
    fn wrap<'a>(
        &'a self,
        socket: BoxedSocket,
        server_name: &'a str,
    ) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            let config = self
                .connector
                .configure()
                .map_err(|_| NetError::SslProtocolError)?;

            let stream = tokio_boring::connect(config, server_name, socket)
                .await
                .map_err(|e| {
                    tracing::debug!(server_name, error = ?e, "tls handshake failed");
                    NetError::SslProtocolError
                })?;

            Ok(BoxedSocket::new(stream))
        })
    }
}

use crate::base::neterror::NetError;
use crate::socket::proxy::{ProxyChain, ProxyKind, ProxySettings};
use crate::socket::stream::{BoxedSocket, TcpConnector, TlsLayer};
use crate::socket::{httptunnel, socks};
use url::{Host, Url};

/// Manages the connection process: TCP -> proxy tunnels -> TLS.
/// Roughly equivalent to net::ConnectJob.
pub struct ConnectJob<'a> {
    chain: &'a ProxyChain,
    connector: &'a dyn TcpConnector,
    tls: Option<&'a dyn TlsLayer>,
}

impl<'a> ConnectJob<'a> {
    pub fn new(
        chain: &'a ProxyChain,
        connector: &'a dyn TcpConnector,
        tls: Option<&'a dyn TlsLayer>,
    ) -> Self {
        Self {
            chain,
            connector,
            tls,
        }
    }

    /// Open a byte stream to the origin of `url`.
    ///
    /// TLS, if the scheme asks for it, always happens after every tunnel is
    /// established.
    pub async fn connect(&self, url: &Url) -> Result<BoxedSocket, NetError> {
        let is_https = match url.scheme() {
            "http" => false,
            "https" => true,
            _ => return Err(NetError::UnknownUrlScheme),
        };
        let host = target_host(url)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;

        let socket = self.connect_tunnel(&host, port).await?;

        if !is_https {
            return Ok(socket);
        }
        let Some(tls) = self.tls else {
            tracing::warn!(url = %url, "https requested without a TLS layer");
            return Err(NetError::SslProtocolError);
        };
        tls.wrap(socket, &host).await
    }

    /// Walk the proxy chain and return a stream to `host:port`.
    pub async fn connect_tunnel(&self, host: &str, port: u16) -> Result<BoxedSocket, NetError> {
        let hops = self.chain.hops();
        let Some(first) = hops.first() else {
            return self.connector.connect(host, port).await;
        };

        let mut socket = self
            .connector
            .connect(&first.host, first.port)
            .await
            .map_err(|e| {
                tracing::warn!(proxy = %first.address(), error = %e, "proxy unreachable");
                NetError::proxy_unreachable(first.address())
            })?;

        for (idx, hop) in hops.iter().enumerate() {
            let (next_host, next_port) = match hops.get(idx + 1) {
                Some(next) => (next.host.as_str(), next.port),
                None => (host, port),
            };
            tunnel(&mut socket, hop, next_host, next_port).await?;
        }

        Ok(socket)
    }
}

async fn tunnel(
    socket: &mut BoxedSocket,
    hop: &ProxySettings,
    host: &str,
    port: u16,
) -> Result<(), NetError> {
    match hop.kind {
        ProxyKind::Http => httptunnel::establish(socket, hop, host, port).await,
        ProxyKind::Socks5 => socks::socks5_connect(socket, hop, host, port).await,
        ProxyKind::Socks4 => socks::socks4_connect(socket, hop, host, port, false).await,
        ProxyKind::Socks4a => socks::socks4_connect(socket, hop, host, port, true).await,
    }
}

/// Host of `url` as a connectable name: IPv6 without brackets.
fn target_host(url: &Url) -> Result<String, NetError> {
    match url.host().ok_or(NetError::InvalidUrl)? {
        Host::Domain(d) => Ok(d.to_string()),
        Host::Ipv4(ip) => Ok(ip.to_string()),
        Host::Ipv6(ip) => Ok(ip.to_string()),
    }
}

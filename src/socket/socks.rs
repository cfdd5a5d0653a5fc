//! SOCKS4, SOCKS4a and SOCKS5 client handshakes.
//!
//! Chromium equivalent: `net::SOCKSClientSocket`, `net::SOCKS5ClientSocket`

use crate::base::neterror::NetError;
use crate::socket::proxy::ProxySettings;
use std::net::{IpAddr, Ipv4Addr};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const SOCKS5_VERSION: u8 = 0x05;
const SOCKS5_AUTH_NONE: u8 = 0x00;
const SOCKS5_AUTH_USER_PASS: u8 = 0x02;
const SOCKS5_NO_ACCEPTABLE_METHOD: u8 = 0xFF;
const SOCKS5_CMD_CONNECT: u8 = 0x01;
const SOCKS5_ATYP_IPV4: u8 = 0x01;
const SOCKS5_ATYP_DOMAIN: u8 = 0x03;
const SOCKS5_ATYP_IPV6: u8 = 0x04;

const SOCKS4_VERSION: u8 = 0x04;
const SOCKS4_CMD_CONNECT: u8 = 0x01;
const SOCKS4_GRANTED: u8 = 0x5A;
const SOCKS4_REJECTED: u8 = 0x5B;
const SOCKS4_NO_IDENTD: u8 = 0x5C;
const SOCKS4_IDENTD_MISMATCH: u8 = 0x5D;

fn io_err(e: std::io::Error) -> NetError {
    NetError::tunnel_refused(e.to_string())
}

/// SOCKS5 handshake (RFC 1928) with optional username/password
/// sub-negotiation (RFC 1929).
pub async fn socks5_connect<S>(
    socket: &mut S,
    proxy: &ProxySettings,
    host: &str,
    port: u16,
) -> Result<(), NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let auth = proxy.get_socks_auth();

    // Method negotiation
    let greeting: &[u8] = if auth.is_some() {
        &[SOCKS5_VERSION, 2, SOCKS5_AUTH_NONE, SOCKS5_AUTH_USER_PASS]
    } else {
        &[SOCKS5_VERSION, 1, SOCKS5_AUTH_NONE]
    };
    socket.write_all(greeting).await.map_err(io_err)?;

    let mut choice = [0u8; 2];
    socket.read_exact(&mut choice).await.map_err(io_err)?;
    if choice[0] != SOCKS5_VERSION {
        return Err(NetError::tunnel_refused("invalid SOCKS5 server version"));
    }

    match (choice[1], auth) {
        (SOCKS5_AUTH_NONE, _) => {}
        (SOCKS5_AUTH_USER_PASS, Some((user, pass))) => {
            if user.len() > 255 || pass.len() > 255 {
                return Err(NetError::ProxyAuthRejected);
            }
            let mut req = Vec::with_capacity(3 + user.len() + pass.len());
            req.push(0x01);
            req.push(user.len() as u8);
            req.extend_from_slice(user.as_bytes());
            req.push(pass.len() as u8);
            req.extend_from_slice(pass.as_bytes());
            socket.write_all(&req).await.map_err(io_err)?;

            let mut status = [0u8; 2];
            socket.read_exact(&mut status).await.map_err(io_err)?;
            if status[1] != 0x00 {
                tracing::warn!(proxy = %proxy.address(), "SOCKS5 authentication failed");
                return Err(NetError::ProxyAuthRejected);
            }
        }
        (SOCKS5_NO_ACCEPTABLE_METHOD, _) | (SOCKS5_AUTH_USER_PASS, None) => {
            tracing::warn!(proxy = %proxy.address(), "SOCKS5 proxy refused authentication methods");
            return Err(NetError::ProxyAuthRejected);
        }
        (other, _) => {
            return Err(NetError::tunnel_refused(format!(
                "unsupported SOCKS5 method {:#04x}",
                other
            )));
        }
    }

    // CONNECT request
    let mut req = vec![SOCKS5_VERSION, SOCKS5_CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            req.push(SOCKS5_ATYP_IPV4);
            req.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            req.push(SOCKS5_ATYP_IPV6);
            req.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            if host.len() > 255 {
                return Err(NetError::InvalidUrl);
            }
            req.push(SOCKS5_ATYP_DOMAIN);
            req.push(host.len() as u8);
            req.extend_from_slice(host.as_bytes());
        }
    }
    req.extend_from_slice(&port.to_be_bytes());
    socket.write_all(&req).await.map_err(io_err)?;

    let mut reply = [0u8; 4];
    socket.read_exact(&mut reply).await.map_err(io_err)?;
    if reply[0] != SOCKS5_VERSION {
        return Err(NetError::tunnel_refused("invalid SOCKS5 server version"));
    }
    if reply[1] != 0x00 {
        let reason = socks5_reply_reason(reply[1]);
        tracing::warn!(proxy = %proxy.address(), %host, port, reason, "SOCKS5 connect refused");
        return Err(NetError::tunnel_refused(reason));
    }

    // Skip the bound address
    let remaining = match reply[3] {
        SOCKS5_ATYP_IPV4 => 4 + 2,
        SOCKS5_ATYP_IPV6 => 16 + 2,
        SOCKS5_ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            socket.read_exact(&mut len).await.map_err(io_err)?;
            len[0] as usize + 2
        }
        other => {
            return Err(NetError::tunnel_refused(format!(
                "invalid SOCKS5 address type {:#04x}",
                other
            )));
        }
    };
    let mut bound = vec![0u8; remaining];
    socket.read_exact(&mut bound).await.map_err(io_err)?;

    tracing::debug!(proxy = %proxy.address(), %host, port, "SOCKS5 tunnel established");
    Ok(())
}

fn socks5_reply_reason(code: u8) -> &'static str {
    match code {
        0x01 => "general SOCKS server failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown SOCKS5 error",
    }
}

/// SOCKS4 handshake. With `remote_dns` (SOCKS4a) a hostname target is sent
/// to the proxy; otherwise it is resolved locally to an IPv4 address.
pub async fn socks4_connect<S>(
    socket: &mut S,
    proxy: &ProxySettings,
    host: &str,
    port: u16,
    remote_dns: bool,
) -> Result<(), NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let user_id = proxy
        .credentials
        .as_ref()
        .map(|c| c.username.as_str())
        .unwrap_or("");

    let (ip, hostname) = match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => (ip, None),
        Ok(IpAddr::V6(_)) => {
            return Err(NetError::tunnel_refused("SOCKS4 does not support IPv6 targets"));
        }
        // 0.0.0.x with x != 0 tells a SOCKS4a proxy to resolve the name.
        Err(_) if remote_dns => (Ipv4Addr::new(0, 0, 0, 1), Some(host)),
        Err(_) => (resolve_ipv4(host, port).await?, None),
    };

    let mut req = vec![SOCKS4_VERSION, SOCKS4_CMD_CONNECT];
    req.extend_from_slice(&port.to_be_bytes());
    req.extend_from_slice(&ip.octets());
    req.extend_from_slice(user_id.as_bytes());
    req.push(0x00);
    if let Some(name) = hostname {
        req.extend_from_slice(name.as_bytes());
        req.push(0x00);
    }
    socket.write_all(&req).await.map_err(io_err)?;

    let mut reply = [0u8; 8];
    socket.read_exact(&mut reply).await.map_err(io_err)?;

    match reply[1] {
        SOCKS4_GRANTED => {
            tracing::debug!(proxy = %proxy.address(), %host, port, "SOCKS4 tunnel established");
            Ok(())
        }
        SOCKS4_NO_IDENTD | SOCKS4_IDENTD_MISMATCH => {
            tracing::warn!(proxy = %proxy.address(), "SOCKS4 identd check failed");
            Err(NetError::ProxyAuthRejected)
        }
        SOCKS4_REJECTED => Err(NetError::tunnel_refused("SOCKS4 request rejected or failed")),
        other => Err(NetError::tunnel_refused(format!(
            "unexpected SOCKS4 reply {:#04x}",
            other
        ))),
    }
}

async fn resolve_ipv4(host: &str, port: u16) -> Result<Ipv4Addr, NetError> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| NetError::NameNotResolved)?
        .find_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or(NetError::NameNotResolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::proxy::ProxyKind;

    #[tokio::test]
    async fn test_socks5_no_auth_domain() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let server_task = tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            server.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [5, 1, 0]);
            server.write_all(&[5, 0]).await.unwrap();

            let mut head = [0u8; 5];
            server.read_exact(&mut head).await.unwrap();
            assert_eq!(&head[..4], &[5, 1, 0, 3]);
            let mut rest = vec![0u8; head[4] as usize + 2];
            server.read_exact(&mut rest).await.unwrap();
            assert_eq!(&rest[..11], b"example.com");
            assert_eq!(&rest[11..], &80u16.to_be_bytes());

            server.write_all(&[5, 0, 0, 1, 127, 0, 0, 1, 0, 80]).await.unwrap();
        });

        let proxy = ProxySettings::new(ProxyKind::Socks5, "p", 1080);
        socks5_connect(&mut client, &proxy, "example.com", 80).await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks5_user_pass() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let server_task = tokio::spawn(async move {
            let mut greeting = [0u8; 4];
            server.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [5, 2, 0, 2]);
            server.write_all(&[5, 2]).await.unwrap();

            let mut auth = [0u8; 7];
            server.read_exact(&mut auth).await.unwrap();
            assert_eq!(&auth, &[1, 2, b'u', b'1', 2, b'p', b'1']);
            server.write_all(&[1, 0]).await.unwrap();

            let mut req = [0u8; 10];
            server.read_exact(&mut req).await.unwrap();
            assert_eq!(&req[3..8], &[1, 10, 0, 0, 5]);
            server.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await.unwrap();
        });

        let proxy = ProxySettings::new(ProxyKind::Socks5, "p", 1080).with_auth("u1", "p1");
        socks5_connect(&mut client, &proxy, "10.0.0.5", 443).await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks5_no_acceptable_method() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            server.read_exact(&mut greeting).await.unwrap();
            server.write_all(&[5, 0xFF]).await.unwrap();
        });

        let proxy = ProxySettings::new(ProxyKind::Socks5, "p", 1080);
        let err = socks5_connect(&mut client, &proxy, "example.com", 80).await.unwrap_err();
        assert_eq!(err, NetError::ProxyAuthRejected);
    }

    #[tokio::test]
    async fn test_socks5_bad_credentials() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut greeting = [0u8; 4];
            server.read_exact(&mut greeting).await.unwrap();
            server.write_all(&[5, 2]).await.unwrap();
            let mut auth = [0u8; 7];
            server.read_exact(&mut auth).await.unwrap();
            server.write_all(&[1, 1]).await.unwrap();
        });

        let proxy = ProxySettings::new(ProxyKind::Socks5, "p", 1080).with_auth("u1", "no");
        let err = socks5_connect(&mut client, &proxy, "example.com", 80).await.unwrap_err();
        assert_eq!(err, NetError::ProxyAuthRejected);
    }

    #[tokio::test]
    async fn test_socks5_connect_refused() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let mut greeting = [0u8; 3];
            server.read_exact(&mut greeting).await.unwrap();
            server.write_all(&[5, 0]).await.unwrap();
            let mut req = [0u8; 10];
            server.read_exact(&mut req).await.unwrap();
            server.write_all(&[5, 5, 0, 1, 0, 0, 0, 0, 0, 0]).await.unwrap();
        });

        let proxy = ProxySettings::new(ProxyKind::Socks5, "p", 1080);
        let err = socks5_connect(&mut client, &proxy, "10.1.1.1", 80).await.unwrap_err();
        assert!(matches!(err, NetError::TunnelRefused { reason } if reason == "connection refused"));
    }

    #[tokio::test]
    async fn test_socks4a_hostname() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let server_task = tokio::spawn(async move {
            let mut req = vec![0u8; 8 + 1 + "example.com".len() + 1];
            server.read_exact(&mut req).await.unwrap();
            assert_eq!(&req[..4], &[4, 1, 0, 80]);
            assert_eq!(&req[4..8], &[0, 0, 0, 1]);
            assert_eq!(req[8], 0);
            assert_eq!(&req[9..20], b"example.com");
            server.write_all(&[0, 0x5A, 0, 0, 0, 0, 0, 0]).await.unwrap();
        });

        let proxy = ProxySettings::new(ProxyKind::Socks4a, "p", 1080);
        socks4_connect(&mut client, &proxy, "example.com", 80, true).await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks4_rejected_and_identd() {
        for (code, expect_auth) in [(0x5B, false), (0x5C, true), (0x5D, true)] {
            let (mut client, mut server) = tokio::io::duplex(1024);
            tokio::spawn(async move {
                let mut req = [0u8; 9];
                server.read_exact(&mut req).await.unwrap();
                server.write_all(&[0, code, 0, 0, 0, 0, 0, 0]).await.unwrap();
            });

            let proxy = ProxySettings::new(ProxyKind::Socks4, "p", 1080);
            let err = socks4_connect(&mut client, &proxy, "192.168.1.1", 80, false)
                .await
                .unwrap_err();
            assert_eq!(err == NetError::ProxyAuthRejected, expect_auth);
            assert!(err.is_proxy_error());
        }
    }
}

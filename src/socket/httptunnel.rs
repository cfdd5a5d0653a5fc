//! HTTP `CONNECT` tunnel through a proxy hop.
//!
//! Chromium equivalent: `net::HttpProxyClientSocket`

use crate::base::neterror::NetError;
use crate::socket::proxy::{authority, ProxySettings};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on the proxy's response head.
const MAX_HEAD_SIZE: usize = 16 * 1024;

/// Ask `proxy` (already connected through `socket`) to open a tunnel to
/// `host:port`.
///
/// The response head is read byte by byte so nothing past the blank line is
/// consumed; after `Ok(())` the socket carries the tunnelled stream.
pub async fn establish<S>(
    socket: &mut S,
    proxy: &ProxySettings,
    host: &str,
    port: u16,
) -> Result<(), NetError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let target = authority(host, port);
    let mut request = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
    if let Some(auth) = proxy.get_auth_header() {
        request.push_str(&format!("Proxy-Authorization: {}\r\n", auth));
    }
    request.push_str("\r\n");

    socket
        .write_all(request.as_bytes())
        .await
        .map_err(|e| NetError::tunnel_refused(e.to_string()))?;
    socket
        .flush()
        .await
        .map_err(|e| NetError::tunnel_refused(e.to_string()))?;

    let head = read_head(socket).await?;
    let status_line = head.lines().next().unwrap_or_default().trim().to_string();

    match parse_status(&status_line) {
        Some(code) if (200..300).contains(&code) => {
            tracing::debug!(proxy = %proxy.address(), %target, "CONNECT tunnel established");
            Ok(())
        }
        Some(407) => {
            tracing::warn!(proxy = %proxy.address(), "proxy rejected credentials");
            Err(NetError::ProxyAuthRejected)
        }
        _ => {
            tracing::warn!(proxy = %proxy.address(), %target, status = %status_line, "CONNECT refused");
            Err(NetError::tunnel_refused(status_line))
        }
    }
}

/// Read up to and including the `\r\n\r\n` terminating the response head.
async fn read_head<S>(socket: &mut S) -> Result<String, NetError>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_HEAD_SIZE {
            return Err(NetError::tunnel_refused("proxy response head too large"));
        }
        let n = socket
            .read(&mut byte)
            .await
            .map_err(|e| NetError::tunnel_refused(e.to_string()))?;
        if n == 0 {
            return Err(NetError::tunnel_refused("proxy closed the connection"));
        }
        head.push(byte[0]);
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// Status code of an `HTTP/1.x NNN reason` line.
fn parse_status(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

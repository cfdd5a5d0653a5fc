//! Local servers shared by the integration tests.

#![allow(dead_code)]

use agentnet::socket::stream::{BoxedSocket, TcpConnector};
use agentnet::NetError;
use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Handler = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// An HTTP/1.1 origin that answers every request with `handler`.
///
/// Connections are kept open until a response carries `Connection: close`
/// or the client hangs up.
pub struct TestServer {
    pub addr: SocketAddr,
    pub connections: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let conn_count = connections.clone();
        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                conn_count.fetch_add(1, Ordering::SeqCst);
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    while let Some(request) = read_request(&mut socket).await {
                        log.lock().unwrap().push(request.clone());
                        let response = handler(&request);
                        if socket.write_all(response.as_bytes()).await.is_err() {
                            break;
                        }
                        if response.to_ascii_lowercase().contains("connection: close") {
                            break;
                        }
                    }
                });
            }
        });

        Self {
            addr,
            connections,
            requests,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Requests received so far, lowercased for header assertions.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.to_ascii_lowercase())
            .collect()
    }
}

/// Read one request (head plus `Content-Length` body). `None` on EOF.
pub async fn read_request<S: AsyncRead + Unpin>(socket: &mut S) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 2048];
    loop {
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let total = end + 4 + content_length(&head);
            while buf.len() < total {
                let n = socket.read(&mut chunk).await.ok()?;
                if n == 0 {
                    return None;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return Some(String::from_utf8_lossy(&buf[..total]).to_string());
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Value of header `name` in a lowercased request.
pub fn header<'a>(request: &'a str, name: &str) -> Option<&'a str> {
    request
        .split("\r\n\r\n")
        .next()?
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(n, _)| n.trim() == name)
        .map(|(_, v)| v.trim())
}

pub fn ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
}

pub fn redirect(status: u16, location: &str, extra: &str) -> String {
    format!(
        "HTTP/1.1 {} Redirect\r\nLocation: {}\r\n{}Content-Length: 0\r\n\r\n",
        status, location, extra
    )
}

/// Connects every host name to one local address, so several virtual
/// hosts can share a test server.
pub struct FixedConnector(pub SocketAddr);

impl TcpConnector for FixedConnector {
    fn connect<'a>(&'a self, _host: &'a str, _port: u16) -> BoxFuture<'a, Result<BoxedSocket, NetError>> {
        Box::pin(async move {
            TcpStream::connect(self.0)
                .await
                .map(BoxedSocket::new)
                .map_err(|_| NetError::ConnectionRefused)
        })
    }
}

/// Kinds of proxies [`spawn_proxy`] can emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockProxy {
    /// HTTP CONNECT accepting every target.
    Connect,
    /// HTTP CONNECT requiring this exact Proxy-Authorization value.
    ConnectWithAuth(&'static str),
    /// Answers CONNECT with the given status.
    ConnectStatus(u16),
    Socks5,
    Socks4,
}

/// A proxy that records the targets it was asked to reach.
pub struct ProxyServer {
    pub addr: SocketAddr,
    pub targets: Arc<Mutex<Vec<String>>>,
}

impl ProxyServer {
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

/// Start a mock proxy. Tunnels are relayed to the real target address,
/// with `localhost`-style names resolved by tokio.
pub async fn spawn_proxy(kind: MockProxy) -> ProxyServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let targets = Arc::new(Mutex::new(Vec::new()));

    let log = targets.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let log = log.clone();
            tokio::spawn(async move {
                let _ = match kind {
                    MockProxy::Connect => connect_proxy(socket, None, 200, log).await,
                    MockProxy::ConnectWithAuth(auth) => {
                        connect_proxy(socket, Some(auth), 200, log).await
                    }
                    MockProxy::ConnectStatus(status) => {
                        connect_proxy(socket, None, status, log).await
                    }
                    MockProxy::Socks5 => socks5_proxy(socket, log).await,
                    MockProxy::Socks4 => socks4_proxy(socket, log).await,
                };
            });
        }
    });

    ProxyServer { addr, targets }
}

async fn relay(mut client: TcpStream, target: &str) -> std::io::Result<()> {
    let mut upstream = TcpStream::connect(target).await?;
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}

async fn connect_proxy(
    mut socket: TcpStream,
    auth: Option<&str>,
    status: u16,
    log: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if socket.read(&mut byte).await? == 0 {
            return Ok(());
        }
        head.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&head).to_string();
    let target = head
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    log.lock().unwrap().push(target.clone());

    if let Some(expected) = auth {
        let sent = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(n, _)| n.trim().eq_ignore_ascii_case("proxy-authorization"))
            .map(|(_, v)| v.trim().to_string());
        if sent.as_deref() != Some(expected) {
            socket
                .write_all(b"HTTP/1.1 407 Proxy Authentication Required\r\nContent-Length: 0\r\n\r\n")
                .await?;
            return Ok(());
        }
    }

    if status != 200 {
        let reply = format!("HTTP/1.1 {} Refused\r\nContent-Length: 0\r\n\r\n", status);
        socket.write_all(reply.as_bytes()).await?;
        return Ok(());
    }

    socket
        .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
        .await?;
    relay(socket, &target).await
}

async fn socks5_proxy(mut socket: TcpStream, log: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    socket.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    socket.read_exact(&mut methods).await?;
    socket.write_all(&[0x05, 0x00]).await?;

    let mut req = [0u8; 4];
    socket.read_exact(&mut req).await?;
    let host = match req[3] {
        0x01 => {
            let mut ip = [0u8; 4];
            socket.read_exact(&mut ip).await?;
            std::net::Ipv4Addr::from(ip).to_string()
        }
        0x03 => {
            let mut len = [0u8; 1];
            socket.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            socket.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).to_string()
        }
        _ => return Ok(()),
    };
    let mut port = [0u8; 2];
    socket.read_exact(&mut port).await?;
    let target = format!("{}:{}", host, u16::from_be_bytes(port));
    log.lock().unwrap().push(target.clone());

    socket
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await?;
    relay(socket, &target).await
}

async fn socks4_proxy(mut socket: TcpStream, log: Arc<Mutex<Vec<String>>>) -> std::io::Result<()> {
    let mut req = [0u8; 8];
    socket.read_exact(&mut req).await?;
    let port = u16::from_be_bytes([req[2], req[3]]);
    let ip = std::net::Ipv4Addr::new(req[4], req[5], req[6], req[7]);

    read_cstring(&mut socket).await?;
    let host = if ip.octets()[..3] == [0, 0, 0] && ip.octets()[3] != 0 {
        read_cstring(&mut socket).await?
    } else {
        ip.to_string()
    };
    let target = format!("{}:{}", host, port);
    log.lock().unwrap().push(target.clone());

    socket.write_all(&[0x00, 0x5A, 0, 0, 0, 0, 0, 0]).await?;
    relay(socket, &target).await
}

async fn read_cstring(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        socket.read_exact(&mut byte).await?;
        if byte[0] == 0 {
            return Ok(String::from_utf8_lossy(&out).to_string());
        }
        out.push(byte[0]);
    }
}

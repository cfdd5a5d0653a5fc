//! Socket and connection management.
//!
//! Provides connection setup mirroring Chromium's `net/socket/`:
//! - [`connectjob`]: TCP → proxy tunnels → TLS connection flow
//! - [`proxy`]: proxy hops and chains (HTTP, SOCKS4/4a, SOCKS5)
//! - [`httptunnel`], [`socks`]: per-hop tunnel handshakes
//! - [`stream`]: type-erased sockets and the pluggable TCP/TLS layers
//! - `tls`: BoringSSL [`TlsLayer`](stream::TlsLayer) (feature `boring-tls`)

pub mod connectjob;
pub mod httptunnel;
pub mod proxy;
pub mod socks;
pub mod stream;
#[cfg(feature = "boring-tls")]
pub mod tls;

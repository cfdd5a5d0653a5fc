//! # agentnet
//!
//! A user-agent style HTTP/1.1 client for Rust.
//!
//! `agentnet` behaves like a small browser session: it keeps cookies across
//! requests, follows redirects the way browsers do, and can reach the target
//! through a chain of HTTP CONNECT and SOCKS proxies.
//!
//! ## Features
//!
//! - **Cookie Jar**: Set-Cookie value and domain normalization, host-only
//!   and domain cookies, per-request `Cookie` header merging
//! - **Redirect Engine**: 301/302/303/307/308 method rules, temporary
//!   headers, credential stripping on host change, redirect limit
//! - **Proxy Chaining**: HTTP CONNECT, SOCKS4, SOCKS4a and SOCKS5 hops,
//!   each tunnelled through the previous one
//! - **Connection Reuse**: keep-alive connections are kept across hops to
//!   the same origin
//! - **Deadlines**: one timeout and one cancellation token per request chain
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentnet::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), agentnet::NetError> {
//!     let client = Client::new();
//!     let response = client.get("http://example.com/").send().await?;
//!     println!("Status: {}", response.status());
//!     for cookie in client.cookie_jar().iter_all_cookies() {
//!         println!("{}={} ({})", cookie.name, cookie.value, cookie.domain);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes and load states
//! - [`cookies`] - Cookie filters, canonical cookies and the jar
//! - [`http`] - Ordered headers, bodies, transactions and responses
//! - [`socket`] - TCP connector, TLS seam, proxy chain and tunnels
//! - [`urlrequest`] - Request descriptors, options and the redirect-driving job

pub mod base;
pub mod client;
pub mod cookies;
pub mod http;
pub mod socket;
pub mod urlrequest;

pub use base::loadstate::LoadState;
pub use base::neterror::NetError;
pub use client::{Client, ClientBuilder, RequestBuilder};
pub use cookies::jar::CookieJar;
pub use http::multipart::{Form, Part};
pub use http::{HeaderKind, HttpResponse, RequestBody};
pub use socket::proxy::{ProxyChain, ProxyKind, ProxySettings};

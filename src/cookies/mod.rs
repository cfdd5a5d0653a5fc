//! Cookie filtering and storage.
//!
//! | Chromium (C++) | agentnet (Rust) | Responsibility |
//! |----------------|-----------------|----------------|
//! | `net::CookieMonster` | [`CookieJar`](jar::CookieJar) | Per-client store with LRU eviction |
//! | `net::CanonicalCookie` | [`CanonicalCookie`](canonicalcookie::CanonicalCookie) | Single cookie representation |
//! | n/a | [`filter`] | Repairs malformed `Set-Cookie` lines before storage |
//!
//! # Export to Netscape Format (curl/wget compatible)
//!
//! ```rust,no_run
//! use agentnet::cookies::jar::CookieJar;
//!
//! let jar = CookieJar::new();
//! // ... add cookies ...
//! let netscape = jar.export_netscape(None);
//! std::fs::write("cookies.txt", netscape)?;
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod canonicalcookie;
pub mod filter;
pub mod jar;

mod common;

use agentnet::{Client, NetError};
use common::{header, ok, redirect, FixedConnector, TestServer};
use http::StatusCode;

#[tokio::test]
async fn test_redirect_limit() {
    let server = TestServer::start(|_| redirect(302, "/loop", "")).await;
    let client = Client::builder().max_redirects(3).build();

    let err = client.get(server.url("/start")).send().await.unwrap_err();
    assert_eq!(err, NetError::TooManyRedirects);
    // The first request plus three followed redirects; the fourth Location
    // is never requested.
    assert_eq!(server.requests().len(), 4);
}

#[tokio::test]
async fn test_zero_redirects_allowed() {
    let server = TestServer::start(|_| redirect(301, "/moved", "")).await;
    let client = Client::new();

    let err = client
        .get(server.url("/"))
        .max_redirects(0)
        .send()
        .await
        .unwrap_err();
    assert_eq!(err, NetError::TooManyRedirects);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_redirect_chain_reports_final_url() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /a ") {
            redirect(302, "/b", "")
        } else if req.starts_with("GET /b ") {
            redirect(301, "/c#section", "")
        } else {
            ok("done")
        }
    })
    .await;

    let resp = Client::new().get(server.url("/a")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.redirect_count(), 2);
    assert_eq!(resp.url().path(), "/c");
    assert_eq!(resp.url().fragment(), Some("section"));
    assert_eq!(resp.text().unwrap(), "done");
}

#[tokio::test]
async fn test_auto_redirect_disabled() {
    let server = TestServer::start(|_| redirect(302, "/elsewhere", "")).await;
    let client = Client::builder().allow_auto_redirect(false).build();

    let resp = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.location(), Some("/elsewhere"));
    assert_eq!(resp.redirect_count(), 0);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_see_other_turns_post_into_get() {
    let server = TestServer::start(|req| {
        if req.starts_with("POST /login ") {
            redirect(303, "/home", "")
        } else {
            ok("home")
        }
    })
    .await;

    let resp = Client::new()
        .post(server.url("/login"))
        .form([("user", "alice")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let requests = server.requests();
    assert!(requests[0].starts_with("post /login "));
    assert!(requests[0].ends_with("user=alice"));
    assert!(requests[1].starts_with("get /home "));
    assert!(header(&requests[1], "content-type").is_none());
    assert!(requests[1].ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_found_turns_post_into_get() {
    let server = TestServer::start(|req| {
        if req.starts_with("POST ") {
            redirect(302, "/next", "")
        } else {
            ok("")
        }
    })
    .await;

    Client::new()
        .post(server.url("/form"))
        .body("raw")
        .send()
        .await
        .unwrap();
    assert!(server.requests()[1].starts_with("get /next "));
}

#[tokio::test]
async fn test_temporary_redirect_keeps_method_and_body() {
    let server = TestServer::start(|req| {
        if req.starts_with("POST /submit ") {
            redirect(307, "/retry", "")
        } else {
            ok("stored")
        }
    })
    .await;

    Client::new()
        .post(server.url("/submit"))
        .form([("a", "1")])
        .send()
        .await
        .unwrap();

    let requests = server.requests();
    assert!(requests[1].starts_with("post /retry "));
    assert_eq!(
        header(&requests[1], "content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert!(requests[1].ends_with("a=1"));
}

#[tokio::test]
async fn test_temporary_headers_dropped_on_redirect() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /first ") {
            redirect(302, "/second", "")
        } else {
            ok("")
        }
    })
    .await;

    Client::new()
        .get(server.url("/first"))
        .header("X-Always", "1")
        .temporary_header("X-Once", "1")
        .referer("http://ref.example/")
        .keep_temporary_headers_on_redirect(false)
        .send()
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(header(&requests[0], "x-once"), Some("1"));
    assert_eq!(header(&requests[0], "referer"), Some("http://ref.example/"));
    assert_eq!(header(&requests[1], "x-once"), None);
    assert_eq!(header(&requests[1], "referer"), None);
    assert_eq!(header(&requests[1], "x-always"), Some("1"));
}

#[tokio::test]
async fn test_temporary_headers_kept_by_default() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /first ") {
            redirect(302, "/second", "")
        } else {
            ok("")
        }
    })
    .await;

    Client::new()
        .get(server.url("/first"))
        .temporary_header("X-Once", "1")
        .send()
        .await
        .unwrap();

    assert_eq!(header(&server.requests()[1], "x-once"), Some("1"));
}

#[tokio::test]
async fn test_cross_host_redirect_strips_credentials() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /start ") {
            redirect(302, "/same-host", "")
        } else if req.starts_with("GET /same-host ") {
            redirect(302, "http://b.test/landing", "")
        } else {
            ok("")
        }
    })
    .await;
    let client = Client::builder()
        .tcp_connector(FixedConnector(server.addr))
        .build();

    client
        .get("http://a.test/start")
        .header("Authorization", "Bearer secret")
        .header("Cookie", "manual=1")
        .send()
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(header(&requests[1], "host"), Some("a.test"));
    assert_eq!(header(&requests[1], "authorization"), Some("bearer secret"));
    assert_eq!(header(&requests[1], "cookie"), Some("manual=1"));

    assert_eq!(header(&requests[2], "host"), Some("b.test"));
    assert_eq!(header(&requests[2], "authorization"), None);
    assert_eq!(header(&requests[2], "cookie"), None);
}

#[tokio::test]
async fn test_cookies_requeried_per_hop() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /start ") {
            redirect(302, "http://b.test/next", "Set-Cookie: a=1\r\n")
        } else if req.starts_with("GET /next ") {
            redirect(302, "http://a.test/final", "Set-Cookie: b=2\r\n")
        } else {
            ok("")
        }
    })
    .await;
    let client = Client::builder()
        .tcp_connector(FixedConnector(server.addr))
        .build();

    let resp = client.get("http://a.test/start").send().await.unwrap();
    assert_eq!(resp.redirect_count(), 2);
    assert_eq!(resp.url().as_str(), "http://a.test/final");

    let requests = server.requests();
    assert_eq!(header(&requests[0], "cookie"), None);
    assert_eq!(header(&requests[1], "cookie"), None);
    assert_eq!(header(&requests[2], "cookie"), Some("a=1"));
    assert_eq!(client.cookie_jar().total_cookie_count(), 2);
}

#[tokio::test]
async fn test_connection_reused_across_same_origin_hops() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /a ") {
            redirect(302, "/b", "")
        } else if req.starts_with("GET /b ") {
            redirect(302, "/c", "")
        } else {
            ok("")
        }
    })
    .await;

    Client::new().get(server.url("/a")).send().await.unwrap();
    assert_eq!(server.requests().len(), 3);
    assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_connection_close_forces_new_connection() {
    let server = TestServer::start(|req| {
        if req.starts_with("GET /a ") {
            redirect(302, "/b", "Connection: close\r\n")
        } else {
            ok("")
        }
    })
    .await;

    Client::new().get(server.url("/a")).send().await.unwrap();
    assert_eq!(server.connection_count(), 2);
}

#[tokio::test]
async fn test_redirect_to_unsupported_scheme() {
    let server = TestServer::start(|_| redirect(302, "ftp://files.example/", "")).await;
    let err = Client::new().get(server.url("/")).send().await.unwrap_err();
    assert_eq!(err, NetError::InvalidRedirect);
}

use agentnet::cookies::filter::{filter_cookie, filter_domain};
use agentnet::cookies::jar::CookieJar;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use url::Url;

fn benchmark_filters(c: &mut Criterion) {
    let raw = "MS_LOGIN_COOKIE_10151=-1,R,L,null,; Expires=Sun, 30-Dec-18 16:57:13 GMT; Path=/RemovedPath";

    c.bench_function("filter_cookie", |b| {
        b.iter(|| black_box(filter_cookie(black_box(raw))))
    });
    c.bench_function("filter_domain", |b| {
        b.iter(|| black_box(filter_domain(black_box(Some("  .maps.google.com")))))
    });
}

fn benchmark_cookie_store(c: &mut Criterion) {
    let jar = CookieJar::new();
    let url = Url::parse("https://www.example.com").unwrap();

    c.bench_function("cookie_store", |b| {
        b.iter(|| {
            jar.store(black_box(&url), black_box("foo=bar; Path=/; Domain=example.com; Secure"));
        })
    });
}

fn benchmark_cookie_header(c: &mut Criterion) {
    let jar = CookieJar::new();
    let url = Url::parse("https://a.b.example.com/foo/bar").unwrap();
    // Pre-populate host-only and domain cookies
    for i in 0..40 {
        jar.store(&url, &format!("host{}=val; Path=/foo", i));
        jar.store(&url, &format!("wide{}=val; Domain=example.com", i));
    }

    c.bench_function("cookie_header_for_url", |b| {
        b.iter(|| black_box(jar.cookie_header(black_box(&url))))
    });
}

criterion_group!(
    benches,
    benchmark_filters,
    benchmark_cookie_store,
    benchmark_cookie_header
);
criterion_main!(benches);

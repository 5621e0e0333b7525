//! Integration tests for the mirrorer
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! into tempfile content roots, checking what lands on disk and which URLs
//! were (never) fetched.

use kagami::config::CrawlConfig;
use kagami::crawler::{CrawlEngine, CrawlSummary};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a 200 HTML response
fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(body.as_bytes().to_vec())
        .insert_header("content-type", "text/html")
}

/// Builds a 200 HEAD response advertising the given content-type
fn head_with_type(content_type: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header("content-type", content_type)
}

/// Runs a crawl against the given base/entry into `root`
async fn run_crawl(
    base_url: &str,
    entry_url: &str,
    workers: usize,
    max_depth: u32,
    root: &Path,
) -> CrawlSummary {
    let mut config = CrawlConfig::new(base_url, entry_url)
        .expect("config")
        .with_content_root(root);
    config.workers = workers;
    config.max_depth = max_depth;

    let engine = Arc::new(CrawlEngine::new(config).expect("engine"));
    engine.run().await.expect("crawl failed")
}

/// Returns the single file in a directory
fn single_file(dir: &Path) -> std::path::PathBuf {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .expect("read_dir")
        .map(|e| e.expect("entry").path())
        .collect();
    assert_eq!(entries.len(), 1, "expected exactly one file in {dir:?}");
    entries.pop().unwrap()
}

#[tokio::test]
async fn test_depth_one_mirror_with_external_stylesheet() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // Internal page /site/home links to an internal page (relative href)
    // and an external stylesheet (absolute URL outside the /site prefix).
    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(html_page(&format!(
            r#"<html><head>
            <link rel="stylesheet" href="{uri}/assets/style.css">
            </head><body>
            <a href="/site/about">About</a>
            </body></html>"#
        )))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/site/about"))
        .respond_with(head_with_type("text/html"))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/assets/style.css"))
        .respond_with(head_with_type("text/css"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/assets/style.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("body { color: red }")
                .insert_header("content-type", "text/css"),
        )
        .mount(&server)
        .await;

    // Depth is exhausted after the entry page: about is discovered (HEAD)
    // but never fetched.
    Mock::given(method("GET"))
        .and(path("/site/about"))
        .respond_with(html_page("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let summary = run_crawl(
        &format!("{uri}/site"),
        &format!("{uri}/site/home"),
        2,
        1,
        root.path(),
    )
    .await;

    assert_eq!(summary.pages_mirrored, 1);
    assert_eq!(summary.assets_mirrored, 1);

    // The entry page was written with both references rewritten.
    let home = std::fs::read_to_string(root.path().join("internal_content/home.html"))
        .expect("home.html missing");
    assert!(home.contains(r#"href="about.html""#), "about not rewritten: {home}");

    let css_path = single_file(&root.path().join("external_content"));
    let css_name = css_path.file_name().unwrap().to_str().unwrap();
    assert!(css_name.ends_with(".css"));
    assert!(
        home.contains(&format!(r#"href="../external_content/{css_name}""#)),
        "stylesheet not rewritten: {home}"
    );

    // The stylesheet bytes were saved.
    let css = std::fs::read_to_string(&css_path).unwrap();
    assert_eq!(css, "body { color: red }");

    // about.html was never written.
    assert!(!root.path().join("internal_content/about.html").exists());
}

#[tokio::test]
async fn test_depth_chain_mirrors_exactly_d_levels() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(html_page(r#"<a href="/site/l1">next</a>"#))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/site/l1"))
        .respond_with(html_page(r#"<a href="/site/l2">next</a>"#))
        .mount(&server)
        .await;

    for p in ["/site/l1", "/site/l2"] {
        Mock::given(method("HEAD"))
            .and(path(p))
            .respond_with(head_with_type("text/html"))
            .mount(&server)
            .await;
    }

    // With max_depth=2 the chain is mirrored two levels deep; l2 is
    // discovered as a reference but never fetched.
    Mock::given(method("GET"))
        .and(path("/site/l2"))
        .respond_with(html_page("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let summary = run_crawl(
        &format!("{uri}/site"),
        &format!("{uri}/site/home"),
        2,
        2,
        root.path(),
    )
    .await;

    assert_eq!(summary.pages_mirrored, 2);
    assert!(root.path().join("internal_content/home.html").exists());
    assert!(root.path().join("internal_content/l1.html").exists());
    assert!(!root.path().join("internal_content/l2.html").exists());

    // l1 still had its onward reference rewritten, pointing at the local
    // path the next level would have used.
    let l1 = std::fs::read_to_string(root.path().join("internal_content/l1.html")).unwrap();
    assert!(l1.contains(r#"href="l2.html""#));
}

#[tokio::test]
async fn test_missing_content_type_produces_nothing() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // 200 response with a body but no content-type header.
    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<a href=\"/site/x\">x</a>".to_vec()))
        .mount(&server)
        .await;

    // Nothing may be fetched beyond the entry.
    Mock::given(method("GET"))
        .and(path("/site/x"))
        .respond_with(html_page("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let summary = run_crawl(
        &format!("{uri}/site"),
        &format!("{uri}/site/home"),
        2,
        2,
        root.path(),
    )
    .await;

    assert_eq!(summary.pages_mirrored, 0);
    assert_eq!(summary.assets_mirrored, 0);
    assert_eq!(summary.skipped, 1);
    assert!(!root.path().join("internal_content").exists());
    assert!(!root.path().join("external_content").exists());
}

#[tokio::test]
async fn test_duplicate_references_processed_at_most_once() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // home references target twice (two textual forms, one canonical URL)
    // and also links other, which references target again.
    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(html_page(&format!(
            r#"<a href="/site/target">one</a>
               <a href="{uri}/site/target#section">two</a>
               <a href="/site/other">other</a>"#
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/site/other"))
        .respond_with(html_page(r#"<a href="/site/target">again</a>"#))
        .mount(&server)
        .await;

    for p in ["/site/target", "/site/other"] {
        Mock::given(method("HEAD"))
            .and(path(p))
            .respond_with(head_with_type("text/html"))
            .mount(&server)
            .await;
    }

    // Duplicate enqueues are tolerated; duplicate processing is not.
    Mock::given(method("GET"))
        .and(path("/site/target"))
        .respond_with(html_page("<html>leaf</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let summary = run_crawl(
        &format!("{uri}/site"),
        &format!("{uri}/site/home"),
        4,
        3,
        root.path(),
    )
    .await;

    assert_eq!(summary.pages_mirrored, 3);

    // Both textual forms of the reference were rewritten to the same local
    // path.
    let home = std::fs::read_to_string(root.path().join("internal_content/home.html")).unwrap();
    assert_eq!(home.matches(r#"href="target.html""#).count(), 2);
}

#[tokio::test]
async fn test_assets_saved_byte_identical() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // A patterned binary blob large enough to arrive in several chunks.
    let blob: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();

    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(html_page(&format!(
            r#"<img src="/site/img/logo.png">
               <a href="{uri}/blobs/data.bin">download</a>"#
        )))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/site/img/logo.png"))
        .respond_with(head_with_type("image/png"))
        .mount(&server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/blobs/data.bin"))
        .respond_with(head_with_type("application/octet-stream"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/site/img/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47])
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blobs/data.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(blob.clone())
                .insert_header("content-type", "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let summary = run_crawl(
        &format!("{uri}/site"),
        &format!("{uri}/site/home"),
        2,
        1,
        root.path(),
    )
    .await;

    assert_eq!(summary.pages_mirrored, 1);
    assert_eq!(summary.assets_mirrored, 2);

    // Internal assets mirror the site structure and keep their own names.
    let png = std::fs::read(root.path().join("internal_content/img/logo.png")).unwrap();
    assert_eq!(png, vec![0x89, 0x50, 0x4e, 0x47]);

    // External assets are flattened under a sanitized name, byte-identical.
    let bin_path = single_file(&root.path().join("external_content"));
    assert!(bin_path.file_name().unwrap().to_str().unwrap().ends_with(".bin"));
    let saved = std::fs::read(&bin_path).unwrap();
    assert_eq!(saved, blob);

    // The page points at both local copies.
    let home = std::fs::read_to_string(root.path().join("internal_content/home.html")).unwrap();
    assert!(home.contains(r#"src="img/logo.png""#));
    let bin_name = bin_path.file_name().unwrap().to_str().unwrap();
    assert!(home.contains(&format!(r#"href="../external_content/{bin_name}""#)));
}

#[tokio::test]
async fn test_pool_drains_for_any_worker_count() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(html_page(
            r#"<a href="/site/a">a</a><a href="/site/b">b</a><a href="/site/c">c</a>"#,
        ))
        .mount(&server)
        .await;

    for p in ["/site/a", "/site/b", "/site/c"] {
        Mock::given(method("HEAD"))
            .and(path(p))
            .respond_with(head_with_type("text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(html_page("<html>leaf</html>"))
            .mount(&server)
            .await;
    }

    for workers in [1, 8] {
        let root = TempDir::new().unwrap();
        let summary = run_crawl(
            &format!("{uri}/site"),
            &format!("{uri}/site/home"),
            workers,
            2,
            root.path(),
        )
        .await;

        assert_eq!(summary.pages_mirrored, 4, "workers={workers}");
        assert_eq!(summary.failures, 0, "workers={workers}");
    }
}

#[tokio::test]
async fn test_transport_failure_is_soft() {
    let server = MockServer::start().await;
    let uri = server.uri();

    // home links a page whose GET fails and a page that works; the crawl
    // carries on and still drains.
    Mock::given(method("GET"))
        .and(path("/site/home"))
        .respond_with(html_page(
            r#"<a href="/site/broken">broken</a><a href="/site/ok">ok</a>"#,
        ))
        .mount(&server)
        .await;

    for p in ["/site/broken", "/site/ok"] {
        Mock::given(method("HEAD"))
            .and(path(p))
            .respond_with(head_with_type("text/html"))
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/site/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/site/ok"))
        .respond_with(html_page("<html>fine</html>"))
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let summary = run_crawl(
        &format!("{uri}/site"),
        &format!("{uri}/site/home"),
        2,
        2,
        root.path(),
    )
    .await;

    assert_eq!(summary.pages_mirrored, 2);
    assert_eq!(summary.failures, 1);
    assert!(root.path().join("internal_content/ok.html").exists());
    assert!(!root.path().join("internal_content/broken.html").exists());
}

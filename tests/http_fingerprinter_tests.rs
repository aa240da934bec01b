//! HttpFingerprinter behavior against a mock web server: detection sources,
//! content-type enforcement, and error classification.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stackscan::config::HttpConfig;
use stackscan::fingerprint::{Fingerprinter, HttpFingerprinter, ScanError};
use stackscan::report::extract_detected_technologies;

fn http_config() -> HttpConfig {
    HttpConfig {
        user_agent: "stackscan-test/0.3".to_string(),
        request_timeout_secs: 2,
    }
}

async fn mock_site(body: &str, content_type: &str, server_header: Option<&str>) -> MockServer {
    let server = MockServer::start().await;

    // set_body_string forces content-type: text/plain at build time, overriding
    // insert_header; set_body_raw is the wiremock way to control the mime type.
    let mut template =
        ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_owned(), content_type);
    if let Some(value) = server_header {
        template = template.insert_header("server", value);
    }

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(template)
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn detects_from_server_header_and_body() {
    let html = r#"<html><head></head><body>
        <div data-reactroot></div>
        <script src="/static/jquery-3.7.1.min.js"></script>
    </body></html>"#;
    let server = mock_site(html, "text/html; charset=utf-8", Some("nginx/1.24.0")).await;

    let fingerprinter = HttpFingerprinter::new(&http_config()).unwrap();
    let report = fingerprinter.scan(&server.uri()).await.unwrap();

    assert_eq!(
        extract_detected_technologies(&report),
        "Nginx 1.24.0, React, jQuery"
    );
}

#[tokio::test]
async fn detects_meta_generator() {
    let html = r#"<html><head><meta name="generator" content="WordPress 6.4"></head></html>"#;
    let server = mock_site(html, "text/html", None).await;

    let fingerprinter = HttpFingerprinter::new(&http_config()).unwrap();
    let report = fingerprinter.scan(&server.uri()).await.unwrap();

    assert!(extract_detected_technologies(&report).contains("WordPress 6.4"));
}

#[tokio::test]
async fn empty_page_yields_report_with_no_technologies() {
    let server = mock_site("<html></html>", "text/html", None).await;

    let fingerprinter = HttpFingerprinter::new(&http_config()).unwrap();
    let report = fingerprinter.scan(&server.uri()).await.unwrap();

    assert_eq!(extract_detected_technologies(&report), "");
}

#[tokio::test]
async fn non_html_content_type_is_a_permanent_failure() {
    let server = mock_site("{}", "application/json", None).await;

    let fingerprinter = HttpFingerprinter::new(&http_config()).unwrap();
    let err = fingerprinter.scan(&server.uri()).await.unwrap_err();

    assert!(matches!(err, ScanError::WrongContentType(_)), "got {:?}", err);
}

#[tokio::test]
async fn refused_connection_classified_as_connection_error() {
    // Port 1 is unassigned and closed in practice
    let fingerprinter = HttpFingerprinter::new(&http_config()).unwrap();
    let err = fingerprinter.scan("http://127.0.0.1:1").await.unwrap_err();

    assert!(matches!(err, ScanError::Connection(_)), "got {:?}", err);
}

#[tokio::test]
async fn slow_server_times_out_as_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .insert_header("content-type", "text/html")
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fingerprinter = HttpFingerprinter::new(&http_config()).unwrap();
    let err = fingerprinter.scan(&server.uri()).await.unwrap_err();

    assert!(matches!(err, ScanError::Connection(_)), "got {:?}", err);
}

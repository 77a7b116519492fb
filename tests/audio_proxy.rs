//! Integration tests for `/api/audio/<host>/<path>`.
//!
//! The proxy is configured with the `http` scheme and private hosts allowed so
//! it can reach the wiremock server on 127.0.0.1.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{header as header_is, header_exists, method, path};
use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

use podcast_site::config::Config;
use podcast_site::server::{build_router, AppState};

const AUDIO: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00fake-mp3-frames";

fn app(allow_private: bool) -> Router {
    let config = Config {
        audio_upstream_scheme: "http".to_string(),
        audio_allow_private_hosts: allow_private,
        audio_timeout_secs: 2,
        ..Config::default()
    };
    build_router(AppState::from_config(&config).unwrap())
}

/// `/api/audio/127.0.0.1:<port><path>` for the given mock server.
fn proxied(server: &MockServer, upstream_path: &str) -> String {
    format!("/api/audio/{}{}", server.address(), upstream_path)
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

// ============================================================================
// GET
// ============================================================================

#[tokio::test]
async fn test_get_streams_full_body_with_cors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shows/ep1.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("accept-ranges", "bytes")
                .insert_header("set-cookie", "tracking=1")
                .set_body_bytes(AUDIO),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = app(true)
        .oneshot(request(Method::GET, &proxied(&server, "/shows/ep1.mp3")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, HEAD, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Range");
    assert!(!headers.contains_key(header::SET_COOKIE));

    assert_eq!(body_bytes(resp).await, AUDIO);
}

#[tokio::test]
async fn test_range_is_forwarded_and_206_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ep.mp3"))
        .and(header_is("range", "bytes=0-3"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("content-range", "bytes 0-3/26")
                .insert_header("accept-ranges", "bytes")
                .set_body_bytes(&AUDIO[..4]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let req = Request::builder()
        .uri(proxied(&server, "/ep.mp3"))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let resp = app(true).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()[header::CONTENT_RANGE], "bytes 0-3/26");
    assert_eq!(resp.headers()[header::CONTENT_LENGTH], "4");
    assert_eq!(body_bytes(resp).await, &AUDIO[..4]);
}

#[tokio::test]
async fn test_percent_encoding_is_preserved_and_query_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO))
        .expect(1)
        .mount(&server)
        .await;

    let uri = format!("{}?utm=1", proxied(&server, "/my%20show/ep%231.mp3"));
    let resp = app(true).oneshot(request(Method::GET, &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let received: Vec<MockRequest> = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].url.path(), "/my%20show/ep%231.mp3");
    assert_eq!(received[0].url.query(), None);
}

#[tokio::test]
async fn test_upstream_404_passes_status_with_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resp = app(true)
        .oneshot(request(Method::GET, &proxied(&server, "/missing.mp3")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body, serde_json::json!({"error": "Failed to fetch audio"}));
}

#[tokio::test]
async fn test_unreachable_host_returns_500() {
    // Nothing listens on the discard port.
    let resp = app(true)
        .oneshot(request(Method::GET, "/api/audio/127.0.0.1:9/ep.mp3"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "Failed to proxy audio");
}

#[tokio::test]
async fn test_slow_upstream_times_out_with_500() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let resp = app(true)
        .oneshot(request(Method::GET, &proxied(&server, "/slow.mp3")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// HEAD and OPTIONS
// ============================================================================

#[tokio::test]
async fn test_head_forwards_metadata_without_range() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/ep.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("content-length", "123456")
                .insert_header("accept-ranges", "bytes"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let req = Request::builder()
        .method(Method::HEAD)
        .uri(proxied(&server, "/ep.mp3"))
        .header(header::RANGE, "bytes=0-1")
        .body(Body::empty())
        .unwrap();
    let resp = app(true).oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(resp.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(body_bytes(resp).await.is_empty());

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("range").is_none());
}

#[tokio::test]
async fn test_options_preflight_does_not_contact_upstream() {
    let server = MockServer::start().await;
    Mock::given(header_exists("host"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resp = app(true)
        .oneshot(request(Method::OPTIONS, &proxied(&server, "/ep.mp3")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "Range");
}

// ============================================================================
// Target validation
// ============================================================================

#[tokio::test]
async fn test_private_target_rejected_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resp = app(false)
        .oneshot(request(Method::GET, &proxied(&server, "/ep.mp3")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(body["error"], "Invalid audio URL");
}

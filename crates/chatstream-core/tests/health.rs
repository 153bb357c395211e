//! Integration tests for the backend readiness probe.

use std::time::Duration;

use chatstream_core::{HealthClient, StreamErrorKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

async fn server_answering(response: ResponseTemplate) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(response)
        .mount(&mock_server)
        .await;
    mock_server
}

fn client_for(server: &MockServer) -> HealthClient {
    HealthClient::new(&server.uri(), "/health", Duration::from_secs(8))
}

#[tokio::test]
async fn test_ready_backend() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = server_answering(ResponseTemplate::new(200).set_body_string(
        r#"{"ok": true, "initialized": true, "model_loaded": true, "init_error": null}"#,
    ))
    .await;

    let health = client_for(&server).check().await.unwrap();
    assert!(health.is_ready());
    assert_eq!(health.init_error(), None);
}

#[tokio::test]
async fn test_degraded_backend_reports_init_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = server_answering(
        ResponseTemplate::new(200)
            .set_body_string(r#"{"status": "degraded", "error": "index missing"}"#),
    )
    .await;

    let health = client_for(&server).check().await.unwrap();
    assert!(!health.is_ready());
    assert_eq!(health.init_error(), Some("index missing"));
}

#[tokio::test]
async fn test_model_still_loading_is_not_ready() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = server_answering(ResponseTemplate::new(200).set_body_string(
        r#"{"ok": true, "initialized": true, "model_loaded": false}"#,
    ))
    .await;

    let health = client_for(&server).check().await.unwrap();
    assert!(!health.is_ready());
}

#[tokio::test]
async fn test_server_error_status() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = server_answering(
        ResponseTemplate::new(500).set_body_string(r#"{"detail": "Internal Server Error"}"#),
    )
    .await;

    let err = client_for(&server).check().await.unwrap_err();
    assert_eq!(err.kind, StreamErrorKind::HttpStatus);
    assert_eq!(err.message, "HTTP 500: Internal Server Error");
}

#[tokio::test]
async fn test_invalid_body_is_parse_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server =
        server_answering(ResponseTemplate::new(200).set_body_string("<html>proxy</html>")).await;

    let err = client_for(&server).check().await.unwrap_err();
    assert_eq!(err.kind, StreamErrorKind::Parse);
    assert_eq!(err.details.as_deref(), Some("<html>proxy</html>"));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = server_answering(
        ResponseTemplate::new(200)
            .set_body_string(r#"{"ok": true}"#)
            .set_delay(Duration::from_secs(5)),
    )
    .await;

    let client = HealthClient::new(&server.uri(), "/health", Duration::from_millis(100));
    let err = client.check().await.unwrap_err();
    assert_eq!(err.kind, StreamErrorKind::Timeout);
}

mod common;

use chrono::NaiveDate;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xscribe_social::relay::{RelayError, RelayOutcome, TweetRelay, UploadStats};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 20).unwrap()
}

fn tweets() -> serde_json::Value {
    json!([
        { "tweetUrl": "https://x.com/a/status/1", "fullText": "gm", "images": [], "videos": [] },
        { "tweetUrl": "https://x.com/b/status/2", "fullText": "gn", "images": [], "videos": [] }
    ])
}

#[tokio::test]
async fn uploads_daily_file_with_api_key() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/backend/api/tweets/upload"))
        .and(header("x-api-key", "secret-key"))
        .and(body_json(json!({
            "date": "2025-11-20",
            "source_file": "2025-11-20.json",
            "tweets": tweets(),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "total": 2, "new": 1, "duplicates": 1, "errors": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let relay = TweetRelay::new(
        &format!("{}/backend", server.uri()),
        "secret-key",
        dir.path(),
        Duration::from_secs(5),
    )
    .unwrap();
    std::fs::write(relay.file_for(day()), tweets().to_string()).unwrap();

    let outcome = relay.upload_for(day()).await.unwrap();
    assert_eq!(
        outcome,
        RelayOutcome::Uploaded(UploadStats {
            total: 2,
            new: 1,
            duplicates: 1,
            errors: 0,
        })
    );
}

#[tokio::test]
async fn server_side_failure_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tweets/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "database unavailable" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let relay = TweetRelay::new(&server.uri(), "k", dir.path(), Duration::from_secs(5)).unwrap();
    std::fs::write(relay.file_for(day()), tweets().to_string()).unwrap();

    let err = relay.upload_for(day()).await.unwrap_err();
    assert!(matches!(err, RelayError::Rejected(ref msg) if msg == "database unavailable"));
}

#[tokio::test]
async fn http_error_status_surfaces_as_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tweets/upload"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid api key" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let relay = TweetRelay::new(&server.uri(), "wrong", dir.path(), Duration::from_secs(5)).unwrap();
    std::fs::write(relay.file_for(day()), tweets().to_string()).unwrap();

    let err = relay.upload_for(day()).await.unwrap_err();
    match err {
        RelayError::Http(e) => {
            assert_eq!(e.status().map(|s| s.as_u16()), Some(401));
            assert!(e.to_string().contains("invalid api key"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_file_skips_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let relay = TweetRelay::new(&server.uri(), "k", dir.path(), Duration::from_secs(5)).unwrap();
    let outcome = relay.upload_for(day()).await.unwrap();
    assert!(matches!(outcome, RelayOutcome::Skipped { .. }));
}

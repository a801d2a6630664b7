mod common;

use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};
use xscribe_social::store::AccountStore;
use xscribe_social::twitter::client::WEB_BEARER;
use xscribe_social::twitter::{
    FollowingFetcher, FollowingSync, SessionError, SessionResolver, StopReason, TwitterApi,
    TwitterError,
};
use xscribe_social::twitter::fetcher::FollowingSource;
use xscribe_social::twitter::types::FollowingRequest;

const QUERY_ID: &str = "testQueryId";
const TOKEN: &str = "c6458d4841dc6d8289651c3b6e6b9c26d904b062";

/// Matches a GraphQL request by the `cursor` inside its `variables` parameter.
struct CursorIs(Option<&'static str>);

impl Match for CursorIs {
    fn matches(&self, request: &Request) -> bool {
        let variables = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "variables")
            .and_then(|(_, v)| serde_json::from_str::<Value>(&v).ok());
        match variables {
            Some(vars) => vars.get("cursor").and_then(Value::as_str) == self.0,
            None => false,
        }
    }
}

fn user_entry(rest_id: &str, screen_name: &str) -> Value {
    json!({
        "entryId": format!("user-{rest_id}"),
        "content": {
            "entryType": "TimelineTimelineItem",
            "__typename": "TimelineTimelineItem",
            "itemContent": {
                "itemType": "TimelineUser",
                "user_results": {
                    "result": {
                        "__typename": "User",
                        "rest_id": rest_id,
                        "legacy": { "screen_name": screen_name }
                    }
                }
            }
        }
    })
}

fn bottom_cursor(value: &str) -> Value {
    json!({
        "entryId": format!("cursor-bottom-{value}"),
        "content": {
            "entryType": "TimelineTimelineCursor",
            "value": value,
            "cursorType": "Bottom"
        }
    })
}

fn timeline(entries: Vec<Value>) -> Value {
    json!({
        "data": { "user": { "result": { "timeline": { "timeline": {
            "instructions": [{ "type": "TimelineAddEntries", "entries": entries }]
        }}}}}
    })
}

async fn mount_handshake(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .and(header("cookie", format!("auth_token={TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "ct0=csrf1; Path=/; Domain=.x.com; Secure")
                .append_header("set-cookie", "twid=u%3D4242; Path=/; Secure")
                .append_header("set-cookie", "auth_token=server-echo; Path=/; HttpOnly")
                .set_body_json(json!({ "name": "X" })),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn following_path() -> String {
    format!("/i/api/graphql/{QUERY_ID}/Following")
}

fn sync_for(
    server: &MockServer,
    dir: &std::path::Path,
) -> FollowingSync<TwitterApi> {
    let api = TwitterApi::new(&server.uri(), QUERY_ID, Duration::from_secs(5)).unwrap();
    let fetcher = FollowingFetcher::new(api).with_page_delay(Duration::ZERO);
    FollowingSync::new(fetcher, AccountStore::new(dir)).with_write_delay(Duration::ZERO)
}

#[tokio::test]
async fn handshake_then_two_pages_writes_every_account() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_handshake(&server).await;

    Mock::given(method("GET"))
        .and(path(following_path()))
        .and(header("authorization", format!("Bearer {WEB_BEARER}").as_str()))
        .and(header("x-csrf-token", "csrf1"))
        .and(header("x-twitter-auth-type", "OAuth2Session"))
        .and(CursorIs(None))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(vec![
            user_entry("1", "alice"),
            user_entry("2", "bob"),
            bottom_cursor("page-2"),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(following_path()))
        .and(CursorIs(Some("page-2")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(timeline(vec![user_entry("3", "carol")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = SessionResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let session = resolver.resolve(TOKEN).await.unwrap();
    assert_eq!(session.token(), TOKEN);
    assert_eq!(session.cookie("auth_token"), Some(TOKEN));
    assert_eq!(session.csrf_token(), Some("csrf1"));

    let dir = tempfile::tempdir().unwrap();
    let summary = sync_for(&server, dir.path()).run(&session).await.unwrap();

    assert_eq!(summary.stop, StopReason::Exhausted);
    assert_eq!((summary.new, summary.updated, summary.total, summary.pages), (3, 0, 3, 2));
    let stored: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("alice.json")).unwrap()).unwrap();
    assert_eq!(stored["rest_id"], "1");
    assert!(dir.path().join("bob.json").exists());
    assert!(dir.path().join("carol.json").exists());
}

#[tokio::test]
async fn rerun_reports_updates() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    Mock::given(method("GET"))
        .and(path(following_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(vec![
            user_entry("1", "alice"),
            user_entry("2", "bob"),
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let resolver = SessionResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let session = resolver.resolve(TOKEN).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let sync = sync_for(&server, dir.path());

    let first = sync.run(&session).await.unwrap();
    let before = std::fs::read(dir.path().join("alice.json")).unwrap();
    let second = sync.run(&session).await.unwrap();
    let after = std::fs::read(dir.path().join("alice.json")).unwrap();

    assert_eq!((first.new, first.updated), (2, 0));
    assert_eq!((second.new, second.updated), (0, 2));
    assert_eq!(before, after);
}

#[tokio::test]
async fn empty_token_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let resolver = SessionResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let err = resolver.resolve("").await.unwrap_err();
    assert!(matches!(err, SessionError::EmptyToken));
}

#[tokio::test]
async fn failing_second_page_keeps_first_page_accounts() {
    common::init_test_tracing();
    let server = MockServer::start().await;
    mount_handshake(&server).await;
    Mock::given(method("GET"))
        .and(path(following_path()))
        .and(CursorIs(None))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline(vec![
            user_entry("1", "alice"),
            bottom_cursor("page-2"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(following_path()))
        .and(CursorIs(Some("page-2")))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "errors": [{ "message": "Rate limit exceeded", "code": 88 }] })),
        )
        .mount(&server)
        .await;

    let resolver = SessionResolver::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let session = resolver.resolve(TOKEN).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let summary = sync_for(&server, dir.path()).run(&session).await.unwrap();

    assert!(summary.stop.is_failure());
    assert!(summary.stop.to_string().contains("Rate limit exceeded"));
    assert_eq!((summary.new, summary.pages), (1, 1));
    assert!(dir.path().join("alice.json").exists());
}

#[tokio::test]
async fn graphql_errors_without_data_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(following_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "errors": [{ "message": "User not found", "code": 50 }] })),
        )
        .mount(&server)
        .await;

    let api = TwitterApi::new(&server.uri(), QUERY_ID, Duration::from_secs(5)).unwrap();
    let session = xscribe_social::twitter::Session::from_cookies(TOKEN, Default::default());
    let request = FollowingRequest {
        user_id: "1".into(),
        count: 100,
        cursor: None,
    };
    let err = api.following_page(&session, &request).await.unwrap_err();
    assert!(matches!(err, TwitterError::Graphql(ref msg) if msg.contains("User not found")));
}

#[tokio::test]
async fn slow_handshake_is_reported_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let resolver = SessionResolver::new(&server.uri(), Duration::from_millis(200)).unwrap();
    let err = resolver.resolve(TOKEN).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout { .. }), "{err}");
    assert!(err.to_string().contains("hint"));
}

#[tokio::test]
async fn unreachable_host_is_a_connect_error() {
    let resolver = SessionResolver::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
    let err = resolver.resolve(TOKEN).await.unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }), "{err}");
}

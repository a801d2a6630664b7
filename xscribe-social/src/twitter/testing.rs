//! In-memory [`FollowingSource`] used by unit tests.
use crate::twitter::client::TwitterError;
use crate::twitter::fetcher::FollowingSource;
use crate::twitter::session::Session;
use crate::twitter::types::{CursorEntry, FollowingPage, FollowingRequest, PageCursors};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Replays canned responses in order and records every request it saw.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<FollowingPage, TwitterError>>>,
    seen: Mutex<Vec<FollowingRequest>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<FollowingPage, TwitterError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn cursors(&self) -> Vec<Option<String>> {
        self.seen.lock().unwrap().iter().map(|r| r.cursor.clone()).collect()
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|r| r.user_id.clone()).collect()
    }

    pub fn counts(&self) -> Vec<u32> {
        self.seen.lock().unwrap().iter().map(|r| r.count).collect()
    }
}

#[async_trait]
impl FollowingSource for ScriptedSource {
    async fn following_page(
        &self,
        _session: &Session,
        request: &FollowingRequest,
    ) -> Result<FollowingPage, TwitterError> {
        self.seen.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TwitterError::Shape("script exhausted".into())))
    }
}

/// A page of `{ "user": ... }` items with the given handles.
pub fn page(handles: &[&str], bottom: Option<&str>) -> FollowingPage {
    FollowingPage {
        data: handles
            .iter()
            .map(|h| json!({ "user": { "legacy": { "screenName": h } } }))
            .collect(),
        cursor: bottom.map(|value| PageCursors {
            top: None,
            bottom: Some(CursorEntry {
                value: value.to_string(),
            }),
        }),
    }
}

pub fn session() -> Session {
    let mut cookies = BTreeMap::new();
    cookies.insert("ct0".to_string(), "csrf".to_string());
    cookies.insert("twid".to_string(), "u%3D42".to_string());
    Session::from_cookies("test-token", cookies)
}

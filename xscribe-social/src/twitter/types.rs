use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request for a page of accounts the user follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowingRequest {
    pub user_id: String,
    pub count: u32,
    pub cursor: Option<String>,
}

/// A page of following relationships plus its pagination cursors.
///
/// Items are kept as raw JSON; [`crate::twitter::account::normalize`] decides what
/// counts as an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowingPage {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub cursor: Option<PageCursors>,
}

impl FollowingPage {
    /// The bottom cursor, if the server offered one. Empty values count as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor
            .as_ref()
            .and_then(|c| c.bottom.as_ref())
            .map(|b| b.value.as_str())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageCursors {
    #[serde(default)]
    pub top: Option<CursorEntry>,
    #[serde(default)]
    pub bottom: Option<CursorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorEntry {
    pub value: String,
}

// GraphQL envelope and timeline shapes. Everything is optional: the web API
// adds and drops fields without notice.

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphqlError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineInstruction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEntry {
    #[serde(rename = "entryId", default)]
    pub entry_id: String,
    pub content: EntryContent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryContent {
    #[serde(rename = "entryType", default)]
    pub entry_type: Option<String>,
    #[serde(rename = "__typename", default)]
    pub typename: Option<String>,
    #[serde(rename = "itemContent", default)]
    pub item_content: Option<ItemContent>,
    #[serde(rename = "cursorType", default)]
    pub cursor_type: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl EntryContent {
    /// `entryType`, falling back to `__typename` on responses that only carry the latter.
    pub fn kind(&self) -> Option<&str> {
        self.entry_type.as_deref().or(self.typename.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemContent {
    #[serde(rename = "itemType", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub user_results: Option<Value>,
}

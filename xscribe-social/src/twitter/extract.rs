//! Flatten GraphQL timeline responses into [`FollowingPage`]s.
//!
//! The `Following` operation answers with
//! `data.user.result.timeline.timeline.instructions[]`; user rows live in
//! `TimelineAddEntries` entries and the pagination cursors are entries of type
//! `TimelineTimelineCursor`. Each user row becomes an item shaped
//! `{ "raw": <user_results> }`, so its account payload sits at `raw.result`.
use crate::twitter::types::{
    CursorEntry, FollowingPage, PageCursors, TimelineEntry, TimelineInstruction,
};
use serde_json::{Value, json};

const INSTRUCTION_POINTERS: &[&str] = &[
    "/user/result/timeline/timeline/instructions",
    "/user/result/timeline_v2/timeline/instructions",
];

/// Locate and parse the timeline instructions under a GraphQL `data` object.
pub fn timeline_instructions(data: &Value) -> Option<Vec<TimelineInstruction>> {
    let raw = INSTRUCTION_POINTERS
        .iter()
        .find_map(|p| data.pointer(p))?
        .as_array()?;

    Some(
        raw.iter()
            .filter_map(|v| serde_json::from_value::<TimelineInstruction>(v.clone()).ok())
            .collect(),
    )
}

/// Build a page from a GraphQL `data` object. `None` when no timeline is present.
pub fn following_page(data: &Value) -> Option<FollowingPage> {
    let instructions = timeline_instructions(data)?;

    let mut page = FollowingPage::default();
    let mut cursors = PageCursors::default();

    for entry in instructions
        .into_iter()
        .filter(|i| i.kind == "TimelineAddEntries")
        .flat_map(|i| i.entries)
    {
        match classify(&entry) {
            EntryKind::User => {
                if let Some(results) = entry.content.item_content.and_then(|c| c.user_results) {
                    page.data.push(json!({ "raw": results }));
                }
            }
            EntryKind::Cursor(CursorSide::Bottom) => {
                cursors.bottom = entry.content.value.map(|value| CursorEntry { value });
            }
            EntryKind::Cursor(CursorSide::Top) => {
                cursors.top = entry.content.value.map(|value| CursorEntry { value });
            }
            EntryKind::Other => {}
        }
    }

    if cursors.top.is_some() || cursors.bottom.is_some() {
        page.cursor = Some(cursors);
    }
    Some(page)
}

enum CursorSide {
    Top,
    Bottom,
}

enum EntryKind {
    User,
    Cursor(CursorSide),
    Other,
}

fn classify(entry: &TimelineEntry) -> EntryKind {
    let content = &entry.content;
    let is_cursor = content.kind() == Some("TimelineTimelineCursor")
        || entry.entry_id.starts_with("cursor-");
    if is_cursor {
        let side = content
            .cursor_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| entry.entry_id.to_ascii_lowercase());
        return if side.contains("bottom") {
            EntryKind::Cursor(CursorSide::Bottom)
        } else if side.contains("top") {
            EntryKind::Cursor(CursorSide::Top)
        } else {
            EntryKind::Other
        };
    }
    if content
        .item_content
        .as_ref()
        .is_some_and(|c| c.user_results.is_some() || c.item_type.as_deref() == Some("TimelineUser"))
    {
        return EntryKind::User;
    }
    EntryKind::Other
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    pub fn user_entry(rest_id: &str, screen_name: &str) -> Value {
        json!({
            "entryId": format!("user-{rest_id}"),
            "sortIndex": "1",
            "content": {
                "entryType": "TimelineTimelineItem",
                "__typename": "TimelineTimelineItem",
                "itemContent": {
                    "itemType": "TimelineUser",
                    "__typename": "TimelineUser",
                    "user_results": {
                        "result": {
                            "__typename": "User",
                            "id": format!("VXNlcjo{rest_id}"),
                            "rest_id": rest_id,
                            "legacy": { "screen_name": screen_name, "name": screen_name.to_uppercase() }
                        }
                    },
                    "userDisplayType": "User"
                }
            }
        })
    }

    pub fn cursor_entry(side: &str, value: &str) -> Value {
        json!({
            "entryId": format!("cursor-{}-{value}", side.to_ascii_lowercase()),
            "sortIndex": "0",
            "content": {
                "entryType": "TimelineTimelineCursor",
                "__typename": "TimelineTimelineCursor",
                "value": value,
                "cursorType": side
            }
        })
    }

    /// A full `Following` GraphQL response body.
    pub fn following_response(entries: Vec<Value>) -> Value {
        json!({
            "data": {
                "user": {
                    "result": {
                        "__typename": "User",
                        "timeline": {
                            "timeline": {
                                "instructions": [
                                    { "type": "TimelineClearCache" },
                                    { "type": "TimelineTerminateTimeline", "direction": "Top" },
                                    { "type": "TimelineAddEntries", "entries": entries }
                                ]
                            }
                        }
                    }
                }
            }
        })
    }
}

//! Decide whether a fetched item is an account and, if so, under which handle it is stored.
use serde_json::Value;
use thiserror::Error;

/// An account payload ready to be written under its handle.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAccount {
    pub handle: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("item carries no account payload")]
    NoPayload,
    #[error("account payload has no screen name")]
    MissingHandle,
    #[error("screen name cannot be used as a file name")]
    UnsafeHandle,
}

/// Known places an account payload can sit inside an item, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PayloadShape {
    /// `{ "raw": { "result": <account> } }`
    RawResult,
    /// `{ "user": <account> }`
    UserField,
    /// The item is the account itself (`legacy` plus a rest id).
    Bare,
}

const SHAPE_PRIORITY: [PayloadShape; 3] = [
    PayloadShape::RawResult,
    PayloadShape::UserField,
    PayloadShape::Bare,
];

impl PayloadShape {
    fn locate(self, item: &Value) -> Option<&Value> {
        let candidate = match self {
            PayloadShape::RawResult => item.pointer("/raw/result"),
            PayloadShape::UserField => item.get("user"),
            PayloadShape::Bare => {
                let has_rest_id = item.get("restId").is_some() || item.get("rest_id").is_some();
                (item.get("legacy").is_some() && has_rest_id).then_some(item)
            }
        }?;
        candidate.is_object().then_some(candidate)
    }
}

/// Try each known shape in order and pull out the handle.
pub fn normalize(item: &Value) -> Result<NormalizedAccount, SkipReason> {
    let (shape, payload) = SHAPE_PRIORITY
        .iter()
        .find_map(|shape| shape.locate(item).map(|p| (*shape, p)))
        .ok_or(SkipReason::NoPayload)?;

    let handle = screen_name(payload)
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(SkipReason::MissingHandle)?;

    if !is_safe_file_stem(handle) {
        return Err(SkipReason::UnsafeHandle);
    }

    tracing::trace!(?shape, handle, "account.normalized");
    Ok(NormalizedAccount {
        handle: handle.to_string(),
        payload: payload.clone(),
    })
}

fn screen_name(payload: &Value) -> Option<&str> {
    ["/legacy/screenName", "/legacy/screen_name", "/core/screen_name"]
        .iter()
        .find_map(|p| payload.pointer(p).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

fn is_safe_file_stem(handle: &str) -> bool {
    handle != "."
        && handle != ".."
        && !handle
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}

//! Recover the caller's numeric account id from session cookies.
//!
//! X stores it in the `twid` cookie as `u=<id>`, usually URL-encoded as `u%3D<id>`.
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

pub const TWID_COOKIE: &str = "twid";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no session cookie carries an account id (expected `u=<digits>` or `u%3D<digits>` in `twid`)")]
    NotFound,
}

fn account_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"u(?:%3[dD]|=)(\d+)").expect("account id pattern compiles"))
}

/// Digits following `u=` / `u%3D` in a single cookie value.
pub fn account_id_from_value(value: &str) -> Option<&str> {
    account_id_pattern()
        .captures(value)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// The caller's account id: `twid` is checked first, then every other cookie in key order.
///
/// ```
/// use std::collections::BTreeMap;
/// use xscribe_social::twitter::identity::extract_user_id;
///
/// let mut cookies = BTreeMap::new();
/// cookies.insert("twid".to_string(), "u%3D958932716304531456".to_string());
/// assert_eq!(extract_user_id(&cookies).unwrap(), "958932716304531456");
/// ```
pub fn extract_user_id(cookies: &BTreeMap<String, String>) -> Result<String, IdentityError> {
    let twid = cookies.get(TWID_COOKIE).into_iter();
    let others = cookies
        .iter()
        .filter(|(name, _)| name.as_str() != TWID_COOKIE)
        .map(|(_, value)| value);

    twid.chain(others)
        .find_map(|value| account_id_from_value(value))
        .map(str::to_owned)
        .ok_or(IdentityError::NotFound)
}

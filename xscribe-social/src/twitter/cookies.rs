//! Cookie parsing for the two places cookies enter the system: `Set-Cookie` headers
//! from the session handshake, and full `Cookie:` strings copied out of a browser.
use cookie::Cookie;
use std::collections::BTreeMap;

pub const AUTH_TOKEN: &str = "auth_token";
pub const CSRF_TOKEN: &str = "ct0";

/// Name and raw value of a single `Set-Cookie` header; attributes are dropped.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let parsed = Cookie::parse(header).ok()?;
    let name = parsed.name().trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), parsed.value().to_string()))
}

/// Collect `Set-Cookie` headers into a name → value map. Later headers win.
pub fn from_set_cookie_headers<'a, I>(headers: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    headers.into_iter().filter_map(parse_set_cookie).collect()
}

/// Parse a browser `Cookie:` string (`a=1; b="2"; ...`).
///
/// Surrounding quotes are stripped from values, pairs without a name or value are
/// ignored, and `=` inside a value is preserved.
///
/// ```
/// use xscribe_social::twitter::cookies::parse_cookie_string;
///
/// let jar = parse_cookie_string(r#"twid=u%3D42; personalization_id="v1_abc=="; ct0=xyz"#);
/// assert_eq!(jar["twid"], "u%3D42");
/// assert_eq!(jar["personalization_id"], "v1_abc==");
/// assert_eq!(jar["ct0"], "xyz");
/// ```
pub fn parse_cookie_string(raw: &str) -> BTreeMap<String, String> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    Cookie::split_parse(cleaned)
        .filter_map(Result::ok)
        .filter_map(|c| {
            let name = c.name().trim();
            let value = strip_quotes(c.value().trim());
            (!name.is_empty() && !value.is_empty()).then(|| (name.to_string(), value.to_string()))
        })
        .collect()
}

fn strip_quotes(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .or_else(|| value.strip_prefix('\''))
        .unwrap_or(value);
    value
        .strip_suffix('"')
        .or_else(|| value.strip_suffix('\''))
        .unwrap_or(value)
}

/// The cookies a session actually needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCookies {
    pub auth_token: Option<String>,
    pub ct0: Option<String>,
}

pub fn extract_key_cookies(raw: &str) -> KeyCookies {
    let mut jar = parse_cookie_string(raw);
    KeyCookies {
        auth_token: jar.remove(AUTH_TOKEN),
        ct0: jar.remove(CSRF_TOKEN),
    }
}

pub fn extract_auth_token(raw: &str) -> Option<String> {
    extract_key_cookies(raw).auth_token
}

pub fn extract_ct0(raw: &str) -> Option<String> {
    extract_key_cookies(raw).ct0
}

/// Render a map back into a `Cookie:` request header.
pub fn encode_cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

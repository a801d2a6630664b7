//! Session handshake against the X web origin.
//!
//! A single `GET /manifest.json` carrying `auth_token` as a cookie makes the server
//! hand out the rest of the session cookies (`ct0`, `twid`, `guest_id`, ...). The
//! resulting [`Session`] is immutable and passed explicitly to every API call.
use crate::twitter::cookies::{self, AUTH_TOKEN, CSRF_TOKEN};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use xscribe_common::mask_secret;
use xscribe_http::{HttpClient, HttpError, RequestOpts};

pub const DEFAULT_WEB_BASE: &str = "https://x.com";
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
const HANDSHAKE_PATH: &str = "manifest.json";
const HANDSHAKE_MAX_REDIRECTS: usize = 5;
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("auth token is empty: set AUTH_TOKEN or `twitter.auth_token`")]
    EmptyToken,

    #[error("cookie string has no `auth_token` entry")]
    MissingAuthToken,

    #[error(
        "timed out connecting to {host}: {source}\nhint: {host} may need a proxy from this network; set HTTPS_PROXY/HTTP_PROXY or check that the service is up"
    )]
    Timeout {
        host: String,
        #[source]
        source: HttpError,
    },

    #[error(
        "could not resolve {host}: {source}\nhint: check DNS, or route through a proxy with HTTPS_PROXY/HTTP_PROXY"
    )]
    Dns {
        host: String,
        #[source]
        source: HttpError,
    },

    #[error(
        "failed to connect to {host}: {source}\nhint: check network connectivity, whether a proxy is required, and that the auth token is still valid"
    )]
    Connect {
        host: String,
        #[source]
        source: HttpError,
    },

    #[error("session client setup failed: {0}")]
    Setup(#[source] HttpError),
}

/// Authenticated context: the caller's token plus every cookie the server issued.
///
/// Read-only once built. `auth_token` always holds the caller-supplied token, never the
/// server's echo of it.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    cookies: BTreeMap<String, String>,
}

impl Session {
    pub fn from_cookies(token: impl Into<String>, mut cookies: BTreeMap<String, String>) -> Self {
        let token = token.into();
        cookies.insert(AUTH_TOKEN.to_string(), token.clone());
        Self { token, cookies }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.cookie(CSRF_TOKEN)
    }

    /// All cookies rendered as a `Cookie:` header value.
    pub fn cookie_header(&self) -> String {
        cookies::encode_cookie_header(&self.cookies)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &mask_secret(&self.token))
            .field("cookie_names", &self.cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Accept either a bare token or a full browser cookie string.
///
/// Fails before any I/O when the input is blank.
///
/// ```
/// use xscribe_social::twitter::session::token_from_input;
///
/// assert_eq!(token_from_input("  abc123 ").unwrap(), "abc123");
/// assert_eq!(token_from_input("ct0=x; auth_token=abc123").unwrap(), "abc123");
/// assert!(token_from_input("   ").is_err());
/// ```
pub fn token_from_input(raw: &str) -> Result<String, SessionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SessionError::EmptyToken);
    }
    if !trimmed.contains('=') {
        return Ok(trimmed.to_string());
    }
    match cookies::extract_auth_token(trimmed) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(SessionError::MissingAuthToken),
    }
}

/// Performs the handshake and builds [`Session`]s.
#[derive(Clone)]
pub struct SessionResolver {
    http: HttpClient,
    host: String,
}

impl SessionResolver {
    pub fn new(web_base: &str, timeout: Duration) -> Result<Self, SessionError> {
        let http = HttpClient::builder(web_base)
            .timeout(timeout)
            .max_redirects(HANDSHAKE_MAX_REDIRECTS)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(SessionError::Setup)?;
        let host = http.base().host_str().unwrap_or(web_base).to_string();
        Ok(Self { http, host })
    }

    /// Validate the token, run the handshake and merge the issued cookies.
    pub async fn resolve(&self, input: &str) -> Result<Session, SessionError> {
        let token = token_from_input(input)?;
        tracing::info!(token = %mask_secret(&token), host = %self.host, "session.handshake.start");

        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&format!("{AUTH_TOKEN}={token}"))
            .map_err(|e| SessionError::Setup(HttpError::Build(e.to_string())))?;
        headers.insert(COOKIE, cookie);

        let response = self
            .http
            .get_raw(
                HANDSHAKE_PATH,
                RequestOpts {
                    headers: Some(headers),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| self.classify(e))?;

        let issued = cookies::from_set_cookie_headers(response.set_cookies());
        tracing::info!(
            host = %self.host,
            cookies = ?issued.keys().collect::<Vec<_>>(),
            "session.handshake.ok"
        );

        Ok(Session::from_cookies(token, issued))
    }

    fn classify(&self, err: HttpError) -> SessionError {
        let host = self.host.clone();
        let classified = match err {
            source @ HttpError::Timeout(_) => SessionError::Timeout { host, source },
            source @ HttpError::Dns(_) => SessionError::Dns { host, source },
            source @ (HttpError::Url(_) | HttpError::Build(_)) => SessionError::Setup(source),
            source => SessionError::Connect { host, source },
        };
        tracing::error!(error = %classified, "session.handshake.failed");
        classified
    }
}

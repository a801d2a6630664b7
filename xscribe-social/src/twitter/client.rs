//! Thin wrapper around the X web GraphQL `Following` operation.
//!
//! Authenticates with the public web bearer plus the session cookies, shapes the
//! `variables`/`features` query parameters and flattens the timeline before handing
//! pages to the fetcher.
use crate::twitter::extract;
use crate::twitter::fetcher::FollowingSource;
use crate::twitter::session::{BROWSER_USER_AGENT, Session};
use crate::twitter::types::{FollowingPage, FollowingRequest, GraphqlEnvelope};
use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use xscribe_http::{Auth, HttpClient, HttpError, RequestOpts};

/// Bearer token baked into the x.com web client. Not a user secret.
pub const WEB_BEARER: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";
pub const DEFAULT_API_BASE: &str = "https://x.com";
pub const DEFAULT_FOLLOWING_QUERY_ID: &str = "zx6e-TLzRkeDO_a7p4b3JQ";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const FEATURES: &str = r#"{"rweb_tipjar_consumption_enabled":true,"responsive_web_graphql_exclude_directive_enabled":true,"verified_phone_label_enabled":false,"creator_subscriptions_tweet_preview_api_enabled":true,"responsive_web_graphql_timeline_navigation_enabled":true,"responsive_web_graphql_skip_user_profile_image_extensions_enabled":false,"communities_web_enable_tweet_community_results_fetch":true,"c9s_tweet_anatomy_moderator_badge_enabled":true,"articles_preview_enabled":true,"tweetypie_unmention_optimization_enabled":true,"responsive_web_edit_tweet_api_enabled":true,"graphql_is_translatable_rweb_tweet_is_translatable_enabled":true,"view_counts_everywhere_api_enabled":true,"longform_notetweets_consumption_enabled":true,"responsive_web_twitter_article_tweet_consumption_enabled":true,"tweet_awards_web_tipping_enabled":false,"creator_subscriptions_quote_tweet_preview_enabled":false,"freedom_of_speech_not_reach_fetch_enabled":true,"standardized_nudges_misinfo":true,"tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled":true,"rweb_video_timestamps_enabled":true,"longform_notetweets_rich_text_read_enabled":true,"longform_notetweets_inline_media_enabled":true,"responsive_web_enhance_cards_enabled":false}"#;

#[derive(Debug, Error)]
pub enum TwitterError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("graphql error: {0}")]
    Graphql(String),
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl TwitterError {
    /// HTTP status of the failed page, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TwitterError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn body_snippet(&self) -> Option<&str> {
        match self {
            TwitterError::Http(e) => e.body_snippet(),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct TwitterApi {
    http: HttpClient,
    query_id: String,
}

impl TwitterApi {
    pub fn new(api_base: &str, following_query_id: &str, timeout: Duration) -> Result<Self, TwitterError> {
        let http = HttpClient::builder(api_base)
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            query_id: following_query_id.to_string(),
        })
    }

    /// Fetch one page of accounts `request.user_id` follows.
    pub async fn following(
        &self,
        session: &Session,
        request: &FollowingRequest,
    ) -> Result<FollowingPage, TwitterError> {
        let mut variables = json!({
            "userId": request.user_id,
            "count": request.count,
            "includePromotedContent": false,
        });
        if let Some(cursor) = &request.cursor {
            variables["cursor"] = json!(cursor);
        }

        let path = format!("i/api/graphql/{}/Following", self.query_id);
        let envelope: GraphqlEnvelope = self
            .http
            .get_json(
                &path,
                RequestOpts {
                    auth: Some(Auth::Bearer(WEB_BEARER)),
                    headers: Some(session_headers(session)?),
                    query: Some(vec![
                        ("variables", variables.to_string().into()),
                        ("features", FEATURES.into()),
                    ]),
                    ..Default::default()
                },
            )
            .await?;

        match envelope.data.as_ref().and_then(extract::following_page) {
            Some(page) => {
                if !envelope.errors.is_empty() {
                    tracing::warn!(
                        errors = envelope.errors.len(),
                        first = %envelope.errors[0].message,
                        "twitter.following.partial_errors"
                    );
                }
                Ok(page)
            }
            None if !envelope.errors.is_empty() => Err(TwitterError::Graphql(
                envelope
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            None => Err(TwitterError::Shape(
                "no following timeline under data.user.result".into(),
            )),
        }
    }
}

#[async_trait]
impl FollowingSource for TwitterApi {
    async fn following_page(
        &self,
        session: &Session,
        request: &FollowingRequest,
    ) -> Result<FollowingPage, TwitterError> {
        self.following(session, request).await
    }
}

fn session_headers(session: &Session) -> Result<HeaderMap, TwitterError> {
    fn value(v: &str) -> Result<HeaderValue, TwitterError> {
        HeaderValue::from_str(v).map_err(|e| TwitterError::Http(HttpError::Build(e.to_string())))
    }

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, value(&session.cookie_header())?);
    if let Some(ct0) = session.csrf_token() {
        headers.insert(HeaderName::from_static("x-csrf-token"), value(ct0)?);
    }
    headers.insert(
        HeaderName::from_static("x-twitter-auth-type"),
        HeaderValue::from_static("OAuth2Session"),
    );
    headers.insert(
        HeaderName::from_static("x-twitter-active-user"),
        HeaderValue::from_static("yes"),
    );
    headers.insert(
        HeaderName::from_static("x-twitter-client-language"),
        HeaderValue::from_static("en"),
    );
    Ok(headers)
}

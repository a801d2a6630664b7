//! Cursor pagination over the accounts a user follows.
//!
//! The loop is an explicit two-state machine: either fetching with an optional
//! cursor, or done with a [`StopReason`]. A failed page never aborts the run; items
//! gathered before it are returned alongside the failure.
use crate::twitter::client::TwitterError;
use crate::twitter::session::Session;
use crate::twitter::types::{FollowingPage, FollowingRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Where following pages come from. [`crate::twitter::TwitterApi`] in production.
#[async_trait]
pub trait FollowingSource: Send + Sync {
    async fn following_page(
        &self,
        session: &Session,
        request: &FollowingRequest,
    ) -> Result<FollowingPage, TwitterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The last page had no bottom cursor.
    Exhausted,
    /// A page came back with zero items.
    EmptyPage,
    /// A page request failed; the message describes the error.
    Failed(String),
    /// The configured page cap was reached.
    PageLimit,
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, StopReason::Failed(_))
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => f.write_str("no more pages"),
            StopReason::EmptyPage => f.write_str("empty page"),
            StopReason::Failed(msg) => write!(f, "page request failed: {msg}"),
            StopReason::PageLimit => f.write_str("page limit reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchState {
    Fetching { cursor: Option<String> },
    Done(StopReason),
}

/// Everything one pagination run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Items of every successful page, in page order.
    pub items: Vec<Value>,
    /// Pages that came back successfully, including a final empty one.
    pub pages: usize,
    /// Requests issued, failed ones included.
    pub requests: usize,
    pub stop: StopReason,
}

pub struct FollowingFetcher<S> {
    source: S,
    page_size: u32,
    page_delay: Duration,
    max_pages: Option<usize>,
}

impl<S: FollowingSource> FollowingFetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Stop after this many requests. `None` pages until the server runs out.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages.filter(|n| *n > 0);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Page through everything `user_id` follows.
    pub async fn fetch_all(&self, session: &Session, user_id: &str) -> FetchOutcome {
        let mut items = Vec::new();
        let mut pages = 0usize;
        let mut requests = 0usize;
        let mut state = FetchState::Fetching { cursor: None };

        let stop = loop {
            let cursor = match state {
                FetchState::Done(stop) => break stop,
                FetchState::Fetching { cursor } => cursor,
            };
            if self.max_pages.is_some_and(|max| requests >= max) {
                state = FetchState::Done(StopReason::PageLimit);
                continue;
            }
            if requests > 0 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let request = FollowingRequest {
                user_id: user_id.to_string(),
                count: self.page_size,
                cursor,
            };
            requests += 1;

            state = match self.source.following_page(session, &request).await {
                Ok(page) => {
                    pages += 1;
                    let next = page.next_cursor().map(str::to_owned);
                    if page.data.is_empty() {
                        tracing::info!(page = requests, "following.page.empty");
                        FetchState::Done(StopReason::EmptyPage)
                    } else {
                        tracing::info!(
                            page = requests,
                            items = page.data.len(),
                            total = items.len() + page.data.len(),
                            cursor = next.as_deref().unwrap_or("-"),
                            "following.page"
                        );
                        items.extend(page.data);
                        match next {
                            Some(cursor) => FetchState::Fetching {
                                cursor: Some(cursor),
                            },
                            None => FetchState::Done(StopReason::Exhausted),
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(
                        page = requests,
                        status = ?err.status(),
                        body = err.body_snippet().unwrap_or(""),
                        error = %err,
                        "following.page_failed"
                    );
                    FetchState::Done(StopReason::Failed(err.to_string()))
                }
            };
        };

        tracing::info!(pages, requests, items = items.len(), stop = %stop, "following.fetch.done");
        FetchOutcome {
            items,
            pages,
            requests,
            stop,
        }
    }
}

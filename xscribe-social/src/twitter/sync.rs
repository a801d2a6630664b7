//! Mirror the accounts a session's user follows into an [`AccountStore`].
use crate::store::{AccountStore, WriteOutcome};
use crate::twitter::account::{self, SkipReason};
use crate::twitter::fetcher::{FetchOutcome, FollowingFetcher, FollowingSource, StopReason};
use crate::twitter::identity::{self, IdentityError};
use crate::twitter::session::Session;
use std::time::Duration;

pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(50);

/// Counts from one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Items the fetcher returned.
    pub total: usize,
    pub pages: usize,
    pub stop: StopReason,
}

impl SyncSummary {
    fn empty(outcome: &FetchOutcome) -> Self {
        Self {
            new: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            total: outcome.items.len(),
            pages: outcome.pages,
            stop: outcome.stop.clone(),
        }
    }

    pub fn written(&self) -> usize {
        self.new + self.updated
    }
}

pub struct FollowingSync<S> {
    fetcher: FollowingFetcher<S>,
    store: AccountStore,
    write_delay: Duration,
}

impl<S: FollowingSource> FollowingSync<S> {
    pub fn new(fetcher: FollowingFetcher<S>, store: AccountStore) -> Self {
        Self {
            fetcher,
            store,
            write_delay: DEFAULT_WRITE_DELAY,
        }
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn fetcher(&self) -> &FollowingFetcher<S> {
        &self.fetcher
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    /// Resolve the account id, page through its following list and write every account.
    ///
    /// Only a missing account id is an error; page failures end up in
    /// [`SyncSummary::stop`] with whatever was fetched before them still written.
    pub async fn run(&self, session: &Session) -> Result<SyncSummary, IdentityError> {
        let user_id = identity::extract_user_id(session.cookies())?;
        tracing::info!(user_id = %user_id, dir = %self.store.dir().display(), "following.sync.start");

        let outcome = self.fetcher.fetch_all(session, &user_id).await;
        let summary = self.persist_all(&outcome).await;

        tracing::info!(
            new = summary.new,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            total = summary.total,
            pages = summary.pages,
            stop = %summary.stop,
            "following.sync.done"
        );
        Ok(summary)
    }

    /// Normalize and write each fetched item in order.
    pub async fn persist_all(&self, outcome: &FetchOutcome) -> SyncSummary {
        let mut summary = SyncSummary::empty(outcome);
        let mut writes = 0usize;

        for (index, item) in outcome.items.iter().enumerate() {
            let account = match account::normalize(item) {
                Ok(account) => account,
                Err(reason) => {
                    log_skip(index, reason);
                    summary.skipped += 1;
                    continue;
                }
            };

            if writes > 0 && !self.write_delay.is_zero() {
                tokio::time::sleep(self.write_delay).await;
            }
            writes += 1;

            match self.store.persist(&account.handle, &account.payload).await {
                Ok(outcome) => {
                    tracing::info!(handle = %account.handle, ?outcome, "following.account.saved");
                    match outcome {
                        WriteOutcome::New => summary.new += 1,
                        WriteOutcome::Updated => summary.updated += 1,
                    }
                }
                Err(err) => {
                    tracing::error!(handle = %account.handle, error = %err, "following.store_failed");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

fn log_skip(index: usize, reason: SkipReason) {
    match reason {
        SkipReason::NoPayload => tracing::debug!(index, %reason, "following.item.skipped"),
        SkipReason::MissingHandle | SkipReason::UnsafeHandle => {
            tracing::warn!(index, %reason, "following.item.skipped")
        }
    }
}

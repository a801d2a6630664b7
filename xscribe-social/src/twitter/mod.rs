//! Twitter/X web-session integration.
//!
//! The flow is `session` (token → cookies) → `identity` (cookies → account id) →
//! `fetcher` (cursor pagination over a [`FollowingSource`]) → `account` (item
//! normalisation) → [`crate::store`]. [`sync::FollowingSync`] wires them together.
pub mod account;
pub mod client;
pub mod cookies;
pub mod extract;
pub mod fetcher;
pub mod identity;
pub mod session;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{TwitterApi, TwitterError};
pub use fetcher::{FetchOutcome, FollowingFetcher, FollowingSource, StopReason};
pub use session::{Session, SessionError, SessionResolver};
pub use sync::{FollowingSync, SyncSummary};

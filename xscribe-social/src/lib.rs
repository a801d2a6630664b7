//! Twitter/X session handling, following-list sync, and tweet archive relay.
//!
//! - [`twitter`]: session handshake, identity, GraphQL following client, paginated
//!   fetcher and the sync loop that persists followed accounts
//! - [`store`]: one JSON file per account handle
//! - [`relay`]: POST the daily tweet archive to the analysis server
pub mod relay;
pub mod store;
pub mod twitter;

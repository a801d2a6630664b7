//! Shared helpers for the xscribe crates.
//!
//! Kept deliberately small so every crate in the workspace can depend on it:
//!
//! - [`observability`]: centralised `tracing` initialisation for binaries and tests
//! - [`mask_secret`]: render tokens for logs without leaking them
//!
//! # Examples
//!
//! ```rust
//! use xscribe_common::mask_secret;
//!
//! let masked = mask_secret("c6458d4841dc6d8289651c3b6e6b9c26d904b062");
//! assert_eq!(masked, "c6458d4841...4b062");
//! ```

pub mod observability;

const MASK_HEAD: usize = 10;
const MASK_TAIL: usize = 5;

/// Shorten a secret to its first ten and last five characters.
///
/// Values too short to keep anything hidden are replaced entirely.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= MASK_HEAD + MASK_TAIL {
        return "<redacted>".to_string();
    }
    let head: String = chars[..MASK_HEAD].iter().collect();
    let tail: String = chars[chars.len() - MASK_TAIL..].iter().collect();
    format!("{head}...{tail}")
}

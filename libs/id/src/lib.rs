//! # prr-id
//!
//! Typed identifiers for the PR reviewer service.
//!
//! ## Design Principles
//!
//! - Teams, users and pull requests are keyed by caller-chosen strings;
//!   the service never invents them
//! - Every key is trimmed and validated once, at the boundary, and is
//!   typed afterwards so a `UserId` can never be passed where a
//!   `PullRequestId` is expected
//! - Request IDs are service-generated and ULID-based
//!
//! ## Key Format
//!
//! Keys are non-empty UTF-8 strings of at most [`MAX_KEY_LEN`] bytes with no
//! leading or trailing whitespace and no control characters.
//!
//! Examples:
//! - `backend` (team)
//! - `u1` (user)
//! - `pr-1001` (pull request)
//!
//! Request IDs use the prefixed format `req_{ulid}`.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;

/// Maximum length in bytes of a caller-chosen key.
pub const MAX_KEY_LEN: usize = 255;

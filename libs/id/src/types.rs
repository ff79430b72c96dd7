//! Typed ID definitions for all service resources.

use crate::{define_id, define_key, IdError, MAX_KEY_LEN};

// =============================================================================
// Roster
// =============================================================================

define_key!(TeamName, "team name");
define_key!(UserId, "user");

// =============================================================================
// Review
// =============================================================================

define_key!(PullRequestId, "pull request");

// =============================================================================
// Requests
// =============================================================================

define_id!(RequestId, "req");

/// Validates a caller-chosen key and returns it trimmed.
pub fn validate_key(raw: &str) -> Result<&str, IdError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(IdError::Empty);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(IdError::TooLong {
            max: MAX_KEY_LEN,
            actual: key.len(),
        });
    }
    if key.chars().any(char::is_control) {
        return Err(IdError::ControlCharacter);
    }
    Ok(key)
}

// =============================================================================
// Tests
// =============================================================================

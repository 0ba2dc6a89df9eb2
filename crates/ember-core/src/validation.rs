//! Stateless submission checks.

use crate::constants::MAX_CONTENT_LEN;
use crate::error::ContentError;

/// Check that message content is non-empty after trimming and at most
/// [`MAX_CONTENT_LEN`] characters long.
///
/// Length counts Unicode scalar values of the content as submitted, so a
/// 280-character message in any script is accepted.
pub fn validate_content(content: &str) -> Result<(), ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::Empty);
    }
    let len = content.chars().count();
    if len > MAX_CONTENT_LEN {
        return Err(ContentError::TooLong {
            len,
            max: MAX_CONTENT_LEN,
        });
    }
    Ok(())
}

use message_tree::{CONTENT_MAX_CHARS, CONTENT_MIN_CHARS};
use thiserror::Error;

/// Why a draft cannot be posted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("message is empty")]
    Blank,

    #[error("message must be at least {min} characters long, {missing} more needed")]
    TooShort { min: usize, missing: usize },

    #[error("message is too long, shorten it by {excess} characters (limit {max})")]
    TooLong { max: usize, excess: usize },
}

/// Check a draft against the board's length rules.
///
/// Lengths are counted in characters, not bytes. The draft is returned
/// unchanged when it is acceptable.
pub fn validate_content(content: &str) -> Result<&str, ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::Blank);
    }

    let length = content.chars().count();
    if length < CONTENT_MIN_CHARS {
        return Err(ContentError::TooShort {
            min: CONTENT_MIN_CHARS,
            missing: CONTENT_MIN_CHARS - length,
        });
    }
    if length > CONTENT_MAX_CHARS {
        return Err(ContentError::TooLong {
            max: CONTENT_MAX_CHARS,
            excess: length - CONTENT_MAX_CHARS,
        });
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_drafts_rejected() {
        assert_eq!(validate_content(""), Err(ContentError::Blank));
        assert_eq!(validate_content("   \n\t"), Err(ContentError::Blank));
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(
            validate_content("hi"),
            Err(ContentError::TooShort { min: 3, missing: 1 })
        );
        assert_eq!(validate_content("hey"), Ok("hey"));

        let at_limit = "x".repeat(200);
        assert!(validate_content(&at_limit).is_ok());

        let over = "x".repeat(205);
        assert_eq!(
            validate_content(&over),
            Err(ContentError::TooLong { max: 200, excess: 5 })
        );
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // three characters, nine bytes
        assert_eq!(validate_content("日本語"), Ok("日本語"));
        assert!(validate_content(&"é".repeat(200)).is_ok());
        assert_eq!(
            validate_content(&"é".repeat(201)),
            Err(ContentError::TooLong { max: 200, excess: 1 })
        );
    }
}

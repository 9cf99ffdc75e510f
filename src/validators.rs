//! Input validation for object names and comments
//!
//! These are the checks a real `nft` would reject a batch for, applied while
//! a [`crate::Transaction`] is being built so bad input never reaches the store.

/// Longest identifier nftables accepts (`NFT_NAME_MAXLEN`)
pub const MAX_IDENTIFIER_LEN: usize = 256;

/// Longest comment nftables accepts (`NFT_USERDATA_MAXLEN` for comments)
pub const MAX_COMMENT_LEN: usize = 128;

/// Validates a table, chain, set or map name.
///
/// nftables identifier rules:
/// - 1 to 256 bytes
/// - Starts with an ASCII letter, underscore or dot
/// - Continues with ASCII alphanumerics, `_`, `-`, `.` or `/`
///
/// # Examples
///
/// ```
/// use nftfake::validators::validate_identifier;
///
/// assert!(validate_identifier("service-ULMVA6XW-ns1/svc1/tcp/p80").is_ok());
/// assert!(validate_identifier("9lives").is_err());
/// ```
///
/// # Errors
///
/// Returns `Err` with a human-readable reason if the name violates any rule.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "name too long (max {MAX_IDENTIFIER_LEN} characters)"
        ));
    }

    let mut chars = name.chars();
    if let Some(first) = chars.next()
        && !(first.is_ascii_alphabetic() || matches!(first, '_' | '.'))
    {
        return Err(format!("name {name:?} must start with a letter, '_' or '.'"));
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/')) {
        return Err(format!("name {name:?} contains invalid characters"));
    }

    Ok(())
}

/// Validates an object comment.
///
/// Comments are rendered inside double quotes, so quotes and control
/// characters would break the generated line.
///
/// # Errors
///
/// Returns `Err` if the comment is too long or contains a quote or control character.
pub fn validate_comment(comment: &str) -> Result<(), String> {
    if comment.len() > MAX_COMMENT_LEN {
        return Err(format!("comment too long (max {MAX_COMMENT_LEN} bytes)"));
    }

    if comment.contains('"') {
        return Err("comment cannot contain '\"'".to_string());
    }

    if comment.chars().any(char::is_control) {
        return Err("comment cannot contain control characters".to_string());
    }

    Ok(())
}

/// Validates an optional comment, accepting `None`.
///
/// # Errors
///
/// See [`validate_comment`].
pub fn validate_optional_comment(comment: Option<&str>) -> Result<(), String> {
    comment.map_or(Ok(()), validate_comment)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_validate_identifier_accepts_valid_pattern(name in "[a-zA-Z_.][a-zA-Z0-9_./-]{0,40}") {
            prop_assert!(validate_identifier(&name).is_ok());
        }

        #[test]
        fn test_validate_identifier_rejects_invalid_char(
            valid_prefix in "[a-zA-Z][a-zA-Z0-9_]{0,10}",
            invalid_char in "[^a-zA-Z0-9_./-]"
        ) {
            let name = format!("{valid_prefix}{invalid_char}");
            prop_assert!(validate_identifier(&name).is_err());
        }

        #[test]
        fn test_validate_comment_never_panics(input in "\\PC*") {
            let _ = validate_comment(&input);
        }
    }
}

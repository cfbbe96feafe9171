use crate::common::MAX_NAME_LENGTH;
use crate::errors::{ErrorKind, StrataError, StrataResult};

/// Validates a scope, collection or index name against the naming grammar:
///
/// - between 1 and 251 characters in length,
/// - only the characters `A-Z`, `a-z`, `0-9`, `_`, `-` and `%`,
/// - must not start with `_` or `%`.
///
/// Names are case sensitive. The reserved `_default` sentinel deliberately
/// violates the prefix rule and is exempted at its call sites, never here.
pub fn validate_name(name: &str) -> StrataResult<()> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH {
        log::error!(
            "Invalid name '{}': must be between 1 and {} characters",
            name,
            MAX_NAME_LENGTH
        );
        return Err(StrataError::new(
            &format!(
                "Invalid name '{}': must be between 1 and {} characters",
                name, MAX_NAME_LENGTH
            ),
            ErrorKind::InvalidParameter,
        ));
    }

    if name.starts_with('_') || name.starts_with('%') {
        log::error!("Invalid name '{}': cannot start with '_' or '%'", name);
        return Err(StrataError::new(
            &format!("Invalid name '{}': cannot start with '_' or '%'", name),
            ErrorKind::InvalidParameter,
        ));
    }

    if !name.chars().all(is_valid_name_char) {
        log::error!(
            "Invalid name '{}': only A-Z, a-z, 0-9, '_', '-' and '%' are allowed",
            name
        );
        return Err(StrataError::new(
            &format!(
                "Invalid name '{}': only A-Z, a-z, 0-9, '_', '-' and '%' are allowed",
                name
            ),
            ErrorKind::InvalidParameter,
        ));
    }

    Ok(())
}

#[inline]
fn is_valid_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '%')
}

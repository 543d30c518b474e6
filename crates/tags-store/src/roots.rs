//! Root binding name validation.
//!
//! Valid root names:
//! - Must be non-empty and at most 255 bytes
//! - Must not contain whitespace or control characters
//! - Must not start or end with `/`
//! - Must not contain consecutive slashes (`//`)

use crate::error::{RepoError, RepoResult};

/// Longest accepted root name, in bytes.
pub const MAX_ROOT_NAME_LEN: usize = 255;

/// Validate a root binding name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use tags_store::roots::validate_root_name;
///
/// assert!(validate_root_name("inbox").is_ok());
/// assert!(validate_root_name("projects/2021").is_ok());
/// assert!(validate_root_name("").is_err());
/// assert!(validate_root_name("a//b").is_err());
/// ```
pub fn validate_root_name(name: &str) -> RepoResult<()> {
    let invalid = |reason: &str| RepoError::InvalidRootName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("root name must not be empty"));
    }
    if name.len() > MAX_ROOT_NAME_LEN {
        return Err(invalid("root name is too long"));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("contains whitespace or control characters"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid("must not start or end with '/'"));
    }
    if name.contains("//") {
        return Err(invalid("must not contain '//'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["main", "inbox", "users/alice", "a.b-c_d", "ключ"] {
            assert!(validate_root_name(name).is_ok(), "expected {name:?} valid");
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "has space", "tab\t", "/lead", "trail/", "a//b"] {
            assert!(
                matches!(
                    validate_root_name(name),
                    Err(RepoError::InvalidRootName { .. })
                ),
                "expected {name:?} invalid"
            );
        }
    }

    #[test]
    fn overlong_name() {
        let name = "r".repeat(MAX_ROOT_NAME_LEN + 1);
        assert!(validate_root_name(&name).is_err());
        let name = "r".repeat(MAX_ROOT_NAME_LEN);
        assert!(validate_root_name(&name).is_ok());
    }
}

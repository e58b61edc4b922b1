//! Reference name validation following git-style conventions.
//!
//! Valid reference names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` (double dot)
//! - Must not start or end with `.` or `/`
//! - Must not end with `.lock`
//! - Must not contain consecutive slashes (`//`)
//! - Components between slashes must be non-empty and not start with `.`

use crate::error::{RefError, RefResult};

/// Characters that are forbidden anywhere in a reference name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Validate a reference name, returning `Ok(())` if valid.
pub fn validate_ref_name(name: &str) -> RefResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "reference name must not be empty"));
    }

    for ch in FORBIDDEN_CHARS {
        if name.contains(*ch) {
            return Err(invalid(name, &format!("contains forbidden character: {ch:?}")));
        }
    }

    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid(name, "must not start or end with '.'"));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }

    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }

    if name.contains("//") {
        return Err(invalid(name, "must not contain consecutive slashes '//'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                &format!("component must not start with '.': {component:?}"),
            ));
        }
    }

    Ok(())
}

fn invalid(name: &str, reason: &str) -> RefError {
    RefError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_simple_names() {
        assert!(validate_ref_name("main").is_ok());
        assert!(validate_ref_name("develop").is_ok());
        assert!(validate_ref_name("release-1.2").is_ok());
    }

    #[test]
    fn valid_nested_names() {
        assert!(validate_ref_name("feature/ingest").is_ok());
        assert!(validate_ref_name("user/alice/fix-123").is_ok());
    }

    #[test]
    fn reject_empty_name() {
        assert!(validate_ref_name("").is_err());
    }

    #[test]
    fn reject_double_dot() {
        assert!(validate_ref_name("bad..name").is_err());
    }

    #[test]
    fn reject_whitespace() {
        assert!(validate_ref_name("has space").is_err());
        assert!(validate_ref_name("has\ttab").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        for name in ["a~b", "a^b", "a:b", "a?b", "a*b", "a[b", "a\\b"] {
            assert!(validate_ref_name(name).is_err(), "should reject {name:?}");
        }
    }

    #[test]
    fn reject_dot_and_slash_boundaries() {
        assert!(validate_ref_name(".hidden").is_err());
        assert!(validate_ref_name("trailing.").is_err());
        assert!(validate_ref_name("/leading").is_err());
        assert!(validate_ref_name("trailing/").is_err());
    }

    #[test]
    fn reject_consecutive_slashes() {
        assert!(validate_ref_name("a//b").is_err());
    }

    #[test]
    fn reject_lock_suffix() {
        assert!(validate_ref_name("main.lock").is_err());
    }

    #[test]
    fn reject_component_starting_with_dot() {
        assert!(validate_ref_name("feature/.hidden").is_err());
    }
}

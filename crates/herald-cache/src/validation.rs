//! Argument checks for the cache contract.
//!
//! All checks run before any state is touched.

use herald_core::{HeraldError, HeraldResult};
use std::time::Duration;

/// Reject empty, blank or oversized keys.
pub fn validate_key(key: &str, max_length: usize) -> HeraldResult<()> {
    if key.trim().is_empty() {
        return Err(HeraldError::invalid_key("cache key must not be empty or whitespace"));
    }
    if key.len() > max_length {
        return Err(HeraldError::invalid_key(format!(
            "cache key is {} bytes, limit is {}",
            key.len(),
            max_length
        )));
    }
    Ok(())
}

/// Reject zero TTLs.
pub fn validate_ttl(ttl: Duration) -> HeraldResult<()> {
    if ttl.is_zero() {
        return Err(HeraldError::InvalidTtl(ttl));
    }
    Ok(())
}

/// Reject blank tags, and an empty set when `require_any` is set.
pub fn validate_tags(tags: &[String], require_any: bool) -> HeraldResult<()> {
    if require_any && tags.is_empty() {
        return Err(HeraldError::invalid_tags("at least one tag is required"));
    }
    if tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(HeraldError::invalid_tags("tags must not be empty or whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_key() {
        assert!(validate_key("spin:42:1", 256).is_ok());
    }

    #[test]
    fn test_blank_keys() {
        assert!(matches!(validate_key("", 256), Err(HeraldError::InvalidKey(_))));
        assert!(matches!(validate_key("   ", 256), Err(HeraldError::InvalidKey(_))));
        assert!(matches!(validate_key("\t\n", 256), Err(HeraldError::InvalidKey(_))));
    }

    #[test]
    fn test_key_too_long() {
        let key = "k".repeat(257);
        let err = validate_key(&key, 256).unwrap_err();
        assert!(err.to_string().contains("257"));
        assert!(validate_key(&"k".repeat(256), 256).is_ok());
    }

    #[test]
    fn test_ttl() {
        assert!(validate_ttl(Duration::from_millis(1)).is_ok());
        assert!(matches!(validate_ttl(Duration::ZERO), Err(HeraldError::InvalidTtl(_))));
    }

    #[test]
    fn test_tags() {
        assert!(validate_tags(&[], false).is_ok());
        assert!(matches!(validate_tags(&[], true), Err(HeraldError::InvalidTags(_))));
        assert!(validate_tags(&["player:42".to_string()], true).is_ok());
        assert!(matches!(
            validate_tags(&["player:42".to_string(), " ".to_string()], true),
            Err(HeraldError::InvalidTags(_))
        ));
    }
}

//! Validation of resource names and path groups.

use crate::error::ConfigError;
use regex::Regex;
use std::sync::OnceLock;

/// Names that collide with fixed sub-routes.
const RESERVED: [&str; 3] = ["query", "batch", "_objects"];

fn segment_re() -> Result<&'static Regex, ConfigError> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$"))
        .as_ref()
        .map_err(|e| ConfigError::Validation(e.to_string()))
}

/// A resource or view name: one URL segment, not reserved.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name == "_" || RESERVED.contains(&name) || !segment_re()?.is_match(name) {
        return Err(ConfigError::InvalidPath(name.to_string()));
    }
    Ok(())
}

/// Group: zero or more `/`-separated segments. Returns the normalized prefix
/// (`""` or `/a/b`).
pub fn normalize_group(group: &str) -> Result<String, ConfigError> {
    let trimmed = group.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    let mut out = String::new();
    for segment in trimmed.split('/') {
        if !segment_re()?.is_match(segment) {
            return Err(ConfigError::InvalidPath(group.to_string()));
        }
        out.push('/');
        out.push_str(segment);
    }
    Ok(out)
}

/// Mount prefix of a router, e.g. `/admin`. Same rules as a group but must be non-empty.
pub fn normalize_prefix(prefix: &str) -> Result<String, ConfigError> {
    let normalized = normalize_group(prefix)?;
    if normalized.is_empty() {
        return Err(ConfigError::InvalidPath(prefix.to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_single_segments() {
        assert!(validate_name("user").is_ok());
        assert!(validate_name("user_profile-2").is_ok());
        for bad in ["", "_", "query", "batch", "a/b", "a b", "ünï"] {
            assert!(validate_name(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn groups_normalize() {
        assert_eq!(normalize_group("").unwrap(), "");
        assert_eq!(normalize_group("/").unwrap(), "");
        assert_eq!(normalize_group("api").unwrap(), "/api");
        assert_eq!(normalize_group("/api/v1/").unwrap(), "/api/v1");
        assert!(normalize_group("api//v1").is_err());
        assert!(normalize_group("a?b").is_err());
        assert!(normalize_prefix("").is_err());
        assert_eq!(normalize_prefix("admin").unwrap(), "/admin");
    }
}

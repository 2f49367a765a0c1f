//! # Environment Variable Utilities
//!
//! Helpers for reading environment variables with common type conversions.
//! Every reader has a `*_from` twin that takes a provider closure, so config
//! parsing can be tested without touching the process environment.
//!
//! # Examples
//! ```rust,no_run
//! use auth_proxy::config::env::{read_flag, read_u64};
//!
//! let enabled = read_flag("AUTH_PROXY_ENABLED", false);
//! let ttl = read_u64("AUTH_PROXY_SYNC_TTL", 60);
//! ```

/// Reads a boolean flag from an environment variable.
///
/// Returns `true` for any of the following case-insensitive values:
/// `"1"`, `"true"`, `"yes"`, `"on"`.
pub fn read_flag(name: &str, default: bool) -> bool {
    read_flag_from(|k| std::env::var(k).ok(), name, default)
}

/// Reads a boolean flag using a custom provider function.
///
/// # Example
/// ```rust
/// use auth_proxy::config::env::read_flag_from;
///
/// let val = read_flag_from(|_| Some("true".into()), "AUTH_PROXY_AUTO_SIGN_UP", false);
/// assert!(val);
/// ```
pub fn read_flag_from<F>(provider: F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match provider(name) {
        Some(v) => {
            let s = unquote(&v);
            matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        None => default,
    }
}

/// Reads an unsigned integer (`u64`), falling back to `default` when the
/// variable is missing or unparsable.
pub fn read_u64(name: &str, default: u64) -> u64 {
    read_u64_from(|k| std::env::var(k).ok(), name, default)
}

pub fn read_u64_from<F>(provider: F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .and_then(|s| unquote(&s).parse::<u64>().ok())
        .unwrap_or(default)
}

/// Reads a signed integer (`i64`), falling back to `default`.
pub fn read_i64(name: &str, default: i64) -> i64 {
    read_i64_from(|k| std::env::var(k).ok(), name, default)
}

pub fn read_i64_from<F>(provider: F, name: &str, default: i64) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .and_then(|s| unquote(&s).parse::<i64>().ok())
        .unwrap_or(default)
}

/// Reads a trimmed string, treating empty values as missing.
pub fn read_string(name: &str, default: &str) -> String {
    read_string_from(|k| std::env::var(k).ok(), name, default)
}

pub fn read_string_from<F>(provider: F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    provider(name)
        .map(|v| unquote(&v).to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn unquote(v: &str) -> &str {
    v.trim().trim_matches(|c| c == '"' || c == '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_flag_true_variants() {
        for val in ["1", "true", "TRUE", "yes", "YES", "on", "On"] {
            let got = read_flag_from(|_| Some(val.into()), "X", false);
            assert!(got, "Expected {val:?} to be truthy");
        }
    }

    #[test]
    fn test_read_flag_false_variants() {
        for val in ["0", "false", "no", "off", "xyz", ""] {
            let got = read_flag_from(|_| Some(val.into()), "X", true);
            assert!(!got, "Expected {val:?} to be falsy");
        }
    }

    #[test]
    fn test_read_flag_default_when_missing() {
        assert!(read_flag_from(|_| None, "X", true));
        assert!(!read_flag_from(|_| None, "X", false));
    }

    #[test]
    fn test_read_u64_valid_and_invalid() {
        assert_eq!(read_u64_from(|_| Some(" 42 ".into()), "TTL", 10), 42);
        assert_eq!(read_u64_from(|_| Some("-1".into()), "TTL", 10), 10);
        assert_eq!(read_u64_from(|_| None, "TTL", 77), 77);
    }

    #[test]
    fn test_read_i64_accepts_quoted_numbers() {
        assert_eq!(read_i64_from(|_| Some("'4'".into()), "ORG", 1), 4);
        assert_eq!(read_i64_from(|_| Some("abc".into()), "ORG", 1), 1);
    }

    #[test]
    fn test_read_string_treats_blank_as_missing() {
        assert_eq!(read_string_from(|_| Some("  ".into()), "H", "dflt"), "dflt");
        assert_eq!(read_string_from(|_| Some("\"X-User\"".into()), "H", "dflt"), "X-User");
        assert_eq!(read_string_from(|_| None, "H", "dflt"), "dflt");
    }
}

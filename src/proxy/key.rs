//! # Cache Key Derivation
//!
//! Cache keys are `auth-proxy-sync-ttl:` followed by the lowercase hex
//! SHA-256 digest of the identity material. Raw logins never reach the
//! cache, and every process derives the same key for the same input.

use sha2::{Digest, Sha256};

/// Namespace shared by all auth proxy cache entries.
pub const CACHE_PREFIX: &str = "auth-proxy-sync-ttl:";

/// Derives the cache key for a raw identity header value.
///
/// The value is hashed byte for byte; callers normalise it first.
///
/// # Example
/// ```
/// use auth_proxy::proxy::key::{derive_key, CACHE_PREFIX};
///
/// let key = derive_key("alice");
/// assert!(key.starts_with(CACHE_PREFIX));
/// assert_eq!(key, derive_key("alice"));
/// assert!(!key.contains("alice"));
/// ```
pub fn derive_key(login: &str) -> String {
    derive_key_with_extras(login, &[])
}

/// Derives the cache key for a header value plus additional header values.
///
/// Non-empty extras are appended to the material with `-`, so any change in
/// an additional header yields a different key and forces a fresh sync.
pub fn derive_key_with_extras(header_value: &str, extras: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(header_value.as_bytes());
    for extra in extras.iter().filter(|e| !e.is_empty()) {
        hasher.update(b"-");
        hasher.update(extra.as_bytes());
    }
    format!("{CACHE_PREFIX}{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_prefixed_hex_digest() {
        let key = derive_key("abc");
        assert_eq!(
            key,
            "auth-proxy-sync-ttl:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn key_is_deterministic() {
        assert_eq!(derive_key("markelog"), derive_key("markelog"));
    }

    #[test]
    fn distinct_logins_get_distinct_keys() {
        let logins = ["alice", "Alice", "alice ", "bob", "alice-", "a", ""];
        let keys: std::collections::HashSet<_> = logins.iter().map(|l| derive_key(l)).collect();
        assert_eq!(keys.len(), logins.len());
    }

    #[test]
    fn surrounding_whitespace_is_part_of_the_key() {
        assert_ne!(derive_key("alice"), derive_key(" alice\t"));
        assert_ne!(derive_key("alice"), derive_key("alice "));
    }

    #[test]
    fn extras_change_the_key() {
        let plain = derive_key("alice");
        let with_name = derive_key_with_extras("alice", &["Alice Liddell"]);
        let with_other_name = derive_key_with_extras("alice", &["A. Liddell"]);

        assert_ne!(plain, with_name);
        assert_ne!(with_name, with_other_name);
    }

    #[test]
    fn empty_extras_do_not_change_the_key() {
        assert_eq!(derive_key("alice"), derive_key_with_extras("alice", &["", ""]));
    }

    #[test]
    fn extras_are_joined_with_dash() {
        assert_eq!(
            derive_key_with_extras("alice", &["x", "y"]),
            derive_key("alice-x-y")
        );
    }
}

//! # Identity Cache Port
//!
//! Key-value store remembering "identity header → internal user id".
//!
//! Entries are hints: the resolver revalidates every hit against the user
//! directory, so a backend may lose, expire or evict entries at will.
//!
//! ## Contract
//! - `get` returns `Ok(None)` on a miss and `Err` only when the backend
//!   itself failed. The resolver treats both alike.
//! - `set` with `ttl == Duration::ZERO` stores the entry without expiry.
//! - `delete` of a missing key succeeds.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait IdentityCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<i64>>;

    async fn set(&self, key: &str, user_id: i64, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}

//! # Database Identity Cache
//!
//! [`IdentityCache`] stored in the application database, shared by every
//! process pointing at the same schema.
//!
//! ```sql
//! CREATE TABLE cache_data (
//!     cache_key  VARCHAR(168) NOT NULL PRIMARY KEY,
//!     data       BLOB         NOT NULL,
//!     expires    INT          NOT NULL,  -- seconds, 0 = never
//!     created_at INT          NOT NULL   -- unix seconds
//! );
//! ```
//!
//! Expired rows are deleted when read.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::cache::port::IdentityCache;
use crate::db::blocking::run_blocking;
use crate::db::port::Db;
use crate::params;
use crate::time::{Clock, SystemClock};

const SELECT_SQL: &str = "SELECT data, expires, created_at FROM cache_data WHERE cache_key = ?";
const UPSERT_SQL: &str = "INSERT INTO cache_data (cache_key, data, expires, created_at) \
     VALUES (?, ?, ?, ?) \
     ON DUPLICATE KEY UPDATE data = VALUES(data), expires = VALUES(expires), created_at = VALUES(created_at)";
const DELETE_SQL: &str = "DELETE FROM cache_data WHERE cache_key = ?";

#[derive(Clone)]
pub struct MySqlIdentityCache {
    db: Arc<dyn Db>,
    clock: Arc<dyn Clock>,
}

impl MySqlIdentityCache {
    pub fn new(db: Arc<dyn Db>) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<dyn Db>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

fn encode(user_id: i64) -> Vec<u8> {
    user_id.to_string().into_bytes()
}

fn decode(key: &str, data: &[u8]) -> Result<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .with_context(|| format!("cache entry `{key}` does not hold a user id"))
}

#[async_trait]
impl IdentityCache for MySqlIdentityCache {
    async fn get(&self, key: &str) -> Result<Option<i64>> {
        let db = self.db.clone();
        let key = key.to_string();
        let now = self.clock.now().timestamp();

        run_blocking(move || {
            let Some(row) = db.fetch_one(SELECT_SQL, &params![key.as_str()])? else {
                return Ok(None);
            };

            let expires = row.get_i64("expires")?;
            let created_at = row.get_i64("created_at")?;
            if expires > 0 && created_at.saturating_add(expires) <= now {
                db.exec(DELETE_SQL, &params![key.as_str()])?;
                return Ok(None);
            }

            decode(&key, &row.get_bin("data")?).map(Some)
        })
        .await
    }

    async fn set(&self, key: &str, user_id: i64, ttl: Duration) -> Result<()> {
        let db = self.db.clone();
        let key = key.to_string();
        let now = self.clock.now().timestamp();
        let expires = ttl_seconds(ttl)?;

        run_blocking(move || {
            let data = encode(user_id);
            db.exec(
                UPSERT_SQL,
                &params![key.as_str(), data.as_slice(), expires, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let db = self.db.clone();
        let key = key.to_string();

        run_blocking(move || {
            db.exec(DELETE_SQL, &params![key.as_str()])?;
            Ok(())
        })
        .await
    }
}

/// Whole seconds for the `expires` column, rounded up so a sub-second TTL
/// still expires; zero stays zero (never expires).
fn ttl_seconds(ttl: Duration) -> Result<i64> {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0));
    i64::try_from(secs).context("cache ttl out of range")
}

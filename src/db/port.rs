//! # Database Port (Synchronous)
//!
//! Abstract database interface used by the MySQL-backed user directory and
//! identity cache.
//!
//! - [`Param`]: SQL parameters.
//! - [`Value`] / [`Row`]: owned column values.
//! - [`Db`]: the three statement shapes the backends need.
//!
//! The trait is synchronous. Async callers run it on
//! `tokio::task::spawn_blocking`.
//!
//! # Example
//! ```rust,ignore
//! use auth_proxy::db::port::{Db, Param};
//! use auth_proxy::params;
//!
//! let ps = params!["alice", 4i64];
//! let row = db.fetch_one("SELECT id FROM user WHERE login = ? AND org_id = ?", &ps)?;
//! ```
use std::collections::HashMap;

use anyhow::{bail, Result};

/// SQL parameter types passed to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Param<'a> {
    I64(i64),
    Str(&'a str),
    Bin(&'a [u8]),
    Null,
}

/// Generic owned database value used for row mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I64(i64),
    U64(u64),
    Str(String),
    Bin(Vec<u8>),
    Null,
}

/// A single database row (column name → value).
#[derive(Debug, Clone, Default)]
pub struct Row {
    cols: HashMap<String, Value>,
}

impl<'a> From<i64> for Param<'a> {
    fn from(x: i64) -> Self {
        Param::I64(x)
    }
}

impl<'a> From<&'a str> for Param<'a> {
    fn from(x: &'a str) -> Self {
        Param::Str(x)
    }
}

impl<'a> From<Option<&'a str>> for Param<'a> {
    fn from(x: Option<&'a str>) -> Self {
        x.map_or(Param::Null, Param::Str)
    }
}

impl<'a> From<&'a [u8]> for Param<'a> {
    fn from(x: &'a [u8]) -> Self {
        Param::Bin(x)
    }
}

/// Builds a `Vec<Param>` for SQL queries.
///
/// # Example
/// ```rust
/// use auth_proxy::db::port::Param;
/// use auth_proxy::params;
///
/// let email: Option<&str> = None;
/// let ps = params![42i64, "alice", email];
/// assert_eq!(ps[0], Param::I64(42));
/// assert_eq!(ps[2], Param::Null);
/// ```
#[macro_export]
macro_rules! params {
    ($($x:expr),* $(,)?) => {{
        let mut v = Vec::<$crate::db::port::Param>::new();
        $( v.push($crate::db::port::Param::from($x)); )*
        v
    }};
}

impl Row {
    /// Inserts a column (used by DB adapters and test doubles).
    pub fn insert(&mut self, key: impl Into<String>, val: Value) {
        self.cols.insert(key.into(), val);
    }

    /// Builder-style [`Row::insert`].
    pub fn with(mut self, key: impl Into<String>, val: Value) -> Self {
        self.insert(key, val);
        self
    }

    /// Returns an `i64` (accepts `U64` values that fit).
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        match self.cols.get(key) {
            Some(Value::I64(v)) => Ok(*v),
            Some(Value::U64(v)) if *v <= i64::MAX as u64 => Ok(*v as i64),
            Some(Value::Str(s)) => s
                .parse::<i64>()
                .map_err(|_| anyhow::anyhow!("column `{key}` is not I64")),
            _ => bail!("column `{key}` is not I64"),
        }
    }

    /// Returns a `String` (only for `Value::Str`).
    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.cols.get(key) {
            Some(Value::Str(s)) => Ok(s.clone()),
            _ => bail!("column `{key}` is not String"),
        }
    }

    /// Returns an optional `String` (`NULL` → `None`).
    pub fn get_string_opt(&self, key: &str) -> Result<Option<String>> {
        match self.cols.get(key) {
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::Null) => Ok(None),
            Some(_) => bail!("column `{key}` is not String/NULL"),
            None => bail!("column `{key}` not found"),
        }
    }

    /// Returns raw bytes. Text columns are accepted as their UTF-8 bytes.
    pub fn get_bin(&self, key: &str) -> Result<Vec<u8>> {
        match self.cols.get(key) {
            Some(Value::Bin(b)) => Ok(b.clone()),
            Some(Value::Str(s)) => Ok(s.as_bytes().to_vec()),
            _ => bail!("column `{key}` is not Bin"),
        }
    }
}

/// Database abstraction (synchronous).
pub trait Db: Send + Sync + 'static {
    fn fetch_one(&self, sql: &str, params: &[Param]) -> Result<Option<Row>>;

    /// Execute a write operation (`INSERT`, `UPDATE`, `DELETE`).
    ///
    /// Returns affected row count.
    fn exec(&self, sql: &str, params: &[Param]) -> Result<u64>;

    /// Execute and return `LAST_INSERT_ID()` (for inserts).
    fn exec_returning_last_insert_id(&self, sql: &str, params: &[Param]) -> Result<u64>;
}

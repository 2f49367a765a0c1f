//! # MySQL Database Adapter
//!
//! An implementation of the [`Db`] port using the [`mysql`] driver crate.
//!
//! ## Responsibilities
//! - Convert generic [`Param`] values into [`mysql::Value`]
//! - Convert [`mysql::Row`] into a generic [`Row`]
//! - Implement `fetch_one`, `exec`, and
//!   `exec_returning_last_insert_id` using `mysql::Pool`
//!
//! Statement text and parameters are logged at `trace` level under the
//! `auth_proxy::sql` target; failures are logged at `warn`.
//!
//! ## Testing Policy
//! Unit tests cover the pure conversion functions only. Query execution
//! needs a live server.

use std::sync::Arc;

use anyhow::{Context, Result};
use mysql::{prelude::*, Error as MyError, Params, Pool, Value as My};

use crate::db::port::{Db, Param, Row as GRow, Value};

const SQL_TARGET: &str = "auth_proxy::sql";

fn mysql_err_summary(e: &MyError) -> String {
    match e {
        MyError::MySqlError(me) => format!(
            "code={}, state={}, message={}",
            me.code, me.state, me.message
        ),
        MyError::DriverError(de) => format!("driver={de:?}"),
        MyError::UrlError(ue) => format!("url={ue:?}"),
        MyError::IoError(ioe) => format!("io={ioe}"),
        MyError::CodecError(ce) => format!("codec={ce:?}"),
        MyError::FromValueError(fve) => format!("from_value={fve:?}"),
        MyError::FromRowError(fre) => format!("from_row={fre:?}"),
    }
}

fn trace_statement(op: &str, sql: &str, params: &[Param]) {
    tracing::trace!(target: SQL_TARGET, op, sql, ?params, "executing statement");
}

fn log_failure(op: &str, sql: &str, e: &MyError) {
    tracing::warn!(target: SQL_TARGET, op, sql, error = %mysql_err_summary(e), "statement failed");
}

/// MySQL implementation of the [`Db`] port.
#[derive(Clone)]
pub struct MySqlDb {
    pool: Arc<Pool>,
}

impl MySqlDb {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }

    /// Converts a single [`Param`] into a [`mysql::Value`].
    ///
    /// - `Str` / `Bin` → `Bytes`
    /// - `Null` → `NULL`
    fn to_mysql_value(p: &Param) -> My {
        match p {
            Param::I64(x) => My::Int(*x),
            Param::Str(s) => My::Bytes(s.as_bytes().to_vec()),
            Param::Bin(b) => My::Bytes(b.to_vec()),
            Param::Null => My::NULL,
        }
    }

    fn to_mysql_params(params_in: &[Param]) -> Params {
        if params_in.is_empty() {
            return Params::Empty;
        }
        Params::Positional(params_in.iter().map(Self::to_mysql_value).collect())
    }

    /// Converts a [`mysql::Row`] into a generic [`Row`].
    ///
    /// Text is decoded as UTF-8 when possible and kept as bytes otherwise.
    /// Temporal and floating point columns are stringified.
    fn row_from_mysql(mut r: mysql::Row) -> GRow {
        let names: Vec<String> = r
            .columns_ref()
            .iter()
            .map(|c| c.name_str().to_string())
            .collect();

        let mut out = GRow::default();
        for (idx, name) in names.into_iter().enumerate() {
            let v = r
                .take_opt::<My, _>(idx)
                .unwrap_or(Ok(My::NULL))
                .unwrap_or(My::NULL);
            out.insert(name, Self::value_from_mysql(v));
        }
        out
    }

    fn value_from_mysql(v: My) -> Value {
        match v {
            My::NULL => Value::Null,
            My::Int(i) => Value::I64(i),
            My::UInt(u) => Value::U64(u),
            My::Float(f) => Value::Str(f.to_string()),
            My::Double(f) => Value::Str(f.to_string()),
            My::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => Value::Str(s),
                Err(e) => Value::Bin(e.into_bytes()),
            },
            My::Date(y, m, d, hh, mm, ss, _micro) => Value::Str(format!(
                "{y:04}-{m:02}-{d:02} {hh:02}:{mm:02}:{ss:02}"
            )),
            My::Time(neg, days, hh, mm, ss, _micro) => {
                let sign = if neg { "-" } else { "" };
                Value::Str(format!("{sign}{days:03} {hh:02}:{mm:02}:{ss:02}"))
            }
        }
    }
}

impl Db for MySqlDb {
    fn fetch_one(&self, sql: &str, params_in: &[Param]) -> Result<Option<GRow>> {
        trace_statement("fetch_one", sql, params_in);
        let mut conn = self.pool.get_conn().context("get_conn failed")?;

        let row = conn
            .exec_first::<mysql::Row, _, _>(sql, Self::to_mysql_params(params_in))
            .inspect_err(|e| log_failure("fetch_one", sql, e))
            .context("exec_first failed")?;

        Ok(row.map(Self::row_from_mysql))
    }

    fn exec(&self, sql: &str, params_in: &[Param]) -> Result<u64> {
        trace_statement("exec", sql, params_in);
        let mut conn = self.pool.get_conn().context("get_conn failed")?;

        conn.exec_drop(sql, Self::to_mysql_params(params_in))
            .inspect_err(|e| log_failure("exec", sql, e))
            .context("exec_drop failed")?;

        Ok(conn.affected_rows())
    }

    fn exec_returning_last_insert_id(&self, sql: &str, params_in: &[Param]) -> Result<u64> {
        trace_statement("exec_returning_last_insert_id", sql, params_in);
        let mut conn = self.pool.get_conn().context("get_conn failed")?;

        conn.exec_drop(sql, Self::to_mysql_params(params_in))
            .inspect_err(|e| log_failure("exec_returning_last_insert_id", sql, e))
            .context("exec_drop failed")?;

        let id: Option<u64> = conn
            .query_first("SELECT LAST_INSERT_ID()")
            .context("query_first(LAST_INSERT_ID()) failed")?;
        id.ok_or_else(|| anyhow::anyhow!("LAST_INSERT_ID() returned NULL"))
    }
}

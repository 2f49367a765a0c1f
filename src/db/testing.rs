//! Scripted [`Db`] double for adapter tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::db::port::{Db, Param, Row, Value};

/// Canned answer for the next statement.
#[derive(Debug)]
pub enum Reply {
    Row(Option<Row>),
    Affected(u64),
    InsertId(u64),
    Fail(&'static str),
}

/// A statement the double received.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Answers statements in order from a script and records every call.
/// Running past the end of the script fails the statement.
#[derive(Default)]
pub struct ScriptedDb {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedDb {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn next(&self, sql: &str, params: &[Param]) -> Result<Reply> {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.iter().map(owned).collect(),
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Fail(msg)) => bail!("{msg}"),
            Some(reply) => Ok(reply),
            None => bail!("unexpected statement: {sql}"),
        }
    }
}

fn owned(p: &Param) -> Value {
    match p {
        Param::I64(x) => Value::I64(*x),
        Param::Str(s) => Value::Str(s.to_string()),
        Param::Bin(b) => Value::Bin(b.to_vec()),
        Param::Null => Value::Null,
    }
}

impl Db for ScriptedDb {
    fn fetch_one(&self, sql: &str, params: &[Param]) -> Result<Option<Row>> {
        match self.next(sql, params)? {
            Reply::Row(r) => Ok(r),
            other => bail!("fetch_one got {other:?}"),
        }
    }

    fn exec(&self, sql: &str, params: &[Param]) -> Result<u64> {
        match self.next(sql, params)? {
            Reply::Affected(n) => Ok(n),
            other => bail!("exec got {other:?}"),
        }
    }

    fn exec_returning_last_insert_id(&self, sql: &str, params: &[Param]) -> Result<u64> {
        match self.next(sql, params)? {
            Reply::InsertId(id) => Ok(id),
            other => bail!("exec_returning_last_insert_id got {other:?}"),
        }
    }
}

//! # MySQL User Directory
//!
//! [`UserDirectory`] over the synchronous [`Db`] port. Every operation runs
//! on Tokio's blocking pool.
//!
//! ```sql
//! CREATE TABLE `user` (
//!     id      BIGINT AUTO_INCREMENT PRIMARY KEY,
//!     login   VARCHAR(190) NOT NULL UNIQUE,
//!     email   VARCHAR(190) NULL,
//!     name    VARCHAR(255) NULL,
//!     created DATETIME NOT NULL,
//!     updated DATETIME NOT NULL
//! );
//! CREATE TABLE org_user (
//!     org_id  BIGINT NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     role    VARCHAR(20) NOT NULL,
//!     created DATETIME NOT NULL,
//!     updated DATETIME NOT NULL,
//!     PRIMARY KEY (org_id, user_id)
//! );
//! ```

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::db::blocking::run_blocking;
use crate::db::port::{Db, Row};
use crate::directory::port::{validate_login, UpsertUser, UserDirectory};
use crate::error::directory::DirectoryError;
use crate::identity::model::{InternalUser, OrgRole, SignedInUser};
use crate::params;

const SELECT_BY_LOGIN: &str = "SELECT id, login, email, name FROM `user` WHERE login = ?";
const SELECT_BY_EMAIL: &str = "SELECT id, login, email, name FROM `user` WHERE email = ? ORDER BY id LIMIT 1";
const INSERT_USER: &str =
    "INSERT INTO `user` (login, email, name, created, updated) VALUES (?, ?, ?, NOW(), NOW())";
const UPDATE_USER: &str = "UPDATE `user` SET login = ?, email = COALESCE(?, email), \
     name = COALESCE(?, name), updated = NOW() WHERE id = ?";
const ENSURE_MEMBERSHIP: &str = "INSERT IGNORE INTO org_user (org_id, user_id, role, created, updated) \
     VALUES (?, ?, ?, NOW(), NOW())";
const SELECT_SIGNED_IN: &str = "SELECT u.id AS user_id, u.login, u.email, u.name, ou.org_id, ou.role \
     FROM `user` u INNER JOIN org_user ou ON ou.user_id = u.id \
     WHERE u.id = ? AND ou.org_id = ?";

/// A row that came back from the database but does not decode.
#[derive(Debug, Error)]
#[error("unreadable `{table}` row")]
struct CorruptRecord {
    table: &'static str,
    #[source]
    source: anyhow::Error,
}

fn corrupt(table: &'static str) -> impl FnOnce(anyhow::Error) -> anyhow::Error {
    move |source| CorruptRecord { table, source }.into()
}

/// Decode failures are permanent; everything else the store reports is not.
fn classify(e: anyhow::Error) -> DirectoryError {
    if e.is::<CorruptRecord>() {
        DirectoryError::Corrupt(e)
    } else {
        DirectoryError::Unavailable(e)
    }
}

#[derive(Clone)]
pub struct MySqlUserDirectory {
    db: Arc<dyn Db>,
}

enum Upserted {
    User(InternalUser),
    SignUpDisabled,
}

impl MySqlUserDirectory {
    pub fn new(db: Arc<dyn Db>) -> Self {
        Self { db }
    }

    fn user_from_row(row: &Row) -> Result<InternalUser> {
        let decode = || -> Result<InternalUser> {
            Ok(InternalUser {
                id: row.get_i64("id")?,
                login: row.get_string("login")?,
                email: row.get_string_opt("email")?,
                name: row.get_string_opt("name")?,
            })
        };
        decode().map_err(corrupt("user"))
    }

    fn signed_in_from_row(row: &Row) -> Result<SignedInUser> {
        let decode = || -> Result<SignedInUser> {
            Ok(SignedInUser {
                user_id: row.get_i64("user_id")?,
                org_id: row.get_i64("org_id")?,
                login: row.get_string("login")?,
                email: row.get_string_opt("email")?,
                name: row.get_string_opt("name")?,
                org_role: row.get_string("role")?.parse::<OrgRole>()?,
                is_signed_in: true,
            })
        };
        decode().map_err(corrupt("org_user"))
    }

    fn find_existing(db: &dyn Db, login: &str, email: Option<&str>) -> Result<Option<InternalUser>> {
        if let Some(row) = db.fetch_one(SELECT_BY_LOGIN, &params![login])? {
            return Self::user_from_row(&row).map(Some);
        }
        match email {
            Some(email) => db
                .fetch_one(SELECT_BY_EMAIL, &params![email])?
                .map(|row| Self::user_from_row(&row))
                .transpose(),
            None => Ok(None),
        }
    }

    fn upsert_blocking(db: &dyn Db, cmd: &UpsertUser) -> Result<Upserted> {
        let identity = &cmd.identity;
        let login = identity.login.as_str();
        let email = identity.email.as_deref();
        let name = identity.name.as_deref();

        let user = match Self::find_existing(db, login, email)? {
            Some(existing) => {
                db.exec(UPDATE_USER, &params![login, email, name, existing.id])?;
                InternalUser {
                    id: existing.id,
                    login: login.to_string(),
                    email: identity.email.clone().or(existing.email),
                    name: identity.name.clone().or(existing.name),
                }
            }
            None if !cmd.signup_allowed => return Ok(Upserted::SignUpDisabled),
            None => match db.exec_returning_last_insert_id(INSERT_USER, &params![login, email, name]) {
                Ok(id) => InternalUser {
                    id: i64::try_from(id)?,
                    login: login.to_string(),
                    email: identity.email.clone(),
                    name: identity.name.clone(),
                },
                // A concurrent first sighting may have inserted the same login.
                Err(insert_err) => match Self::find_existing(db, login, None)? {
                    Some(user) => user,
                    None => return Err(insert_err),
                },
            },
        };

        db.exec(
            ENSURE_MEMBERSHIP,
            &params![identity.org_id, user.id, cmd.default_role.as_str()],
        )?;
        Ok(Upserted::User(user))
    }
}

#[async_trait]
impl UserDirectory for MySqlUserDirectory {
    async fn lookup_by_external_login(
        &self,
        login: &str,
    ) -> Result<Option<InternalUser>, DirectoryError> {
        let db = self.db.clone();
        let login = login.to_string();

        let user = run_blocking(move || {
            db.fetch_one(SELECT_BY_LOGIN, &params![login.as_str()])?
                .map(|row| Self::user_from_row(&row))
                .transpose()
        })
        .await
        .map_err(classify)?;
        Ok(user)
    }

    async fn upsert(&self, cmd: &UpsertUser) -> Result<InternalUser, DirectoryError> {
        validate_login(&cmd.identity.login)?;

        let db = self.db.clone();
        let owned = cmd.clone();
        let outcome = run_blocking(move || Self::upsert_blocking(db.as_ref(), &owned))
            .await
            .map_err(classify)?;

        match outcome {
            Upserted::User(user) => Ok(user),
            Upserted::SignUpDisabled => Err(DirectoryError::SignUpDisabled(cmd.identity.login.clone())),
        }
    }

    async fn get_signed_in_user(
        &self,
        user_id: i64,
        org_id: i64,
    ) -> Result<Option<SignedInUser>, DirectoryError> {
        let db = self.db.clone();

        let user = run_blocking(move || {
            db.fetch_one(SELECT_SIGNED_IN, &params![user_id, org_id])?
                .map(|row| Self::signed_in_from_row(&row))
                .transpose()
        })
        .await
        .map_err(classify)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::port::Value;
    use crate::db::testing::{Reply, ScriptedDb};
    use crate::identity::model::ExternalIdentity;

    fn user_row(id: i64, login: &str, email: Option<&str>) -> Row {
        Row::default()
            .with("id", Value::I64(id))
            .with("login", Value::Str(login.into()))
            .with(
                "email",
                email.map_or(Value::Null, |e| Value::Str(e.into())),
            )
            .with("name", Value::Null)
    }

    fn cmd(login: &str, email: Option<&str>, signup_allowed: bool) -> UpsertUser {
        UpsertUser {
            identity: ExternalIdentity {
                login: login.into(),
                email: email.map(String::from),
                name: Some("Mark".into()),
                org_id: 4,
            },
            signup_allowed,
            default_role: OrgRole::Editor,
        }
    }

    fn directory(replies: Vec<Reply>) -> (MySqlUserDirectory, Arc<ScriptedDb>) {
        let db = Arc::new(ScriptedDb::new(replies));
        (MySqlUserDirectory::new(db.clone()), db)
    }

    #[tokio::test]
    async fn upsert_inserts_unknown_user_and_membership() {
        let (dir, db) = directory(vec![
            Reply::Row(None),
            Reply::InsertId(12),
            Reply::Affected(1),
        ]);

        let user = dir.upsert(&cmd("markelog", None, true)).await.unwrap();

        assert_eq!(user.id, 12);
        assert_eq!(user.name.as_deref(), Some("Mark"));
        let calls = db.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].sql.starts_with("INSERT INTO `user`"));
        assert_eq!(
            calls[2].params,
            vec![Value::I64(4), Value::I64(12), Value::Str("Editor".into())]
        );
    }

    #[tokio::test]
    async fn upsert_updates_existing_user() {
        let (dir, db) = directory(vec![
            Reply::Row(Some(user_row(1, "markelog", Some("m@example.com")))),
            Reply::Affected(1),
            Reply::Affected(0),
        ]);

        let user = dir.upsert(&cmd("markelog", None, false)).await.unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.email.as_deref(), Some("m@example.com"));
        assert!(db.calls()[1].sql.starts_with("UPDATE `user`"));
        assert_eq!(db.remaining(), 0);
    }

    #[tokio::test]
    async fn upsert_falls_back_to_email_lookup() {
        let (dir, db) = directory(vec![
            Reply::Row(None),
            Reply::Row(Some(user_row(7, "old-login", Some("m@example.com")))),
            Reply::Affected(1),
            Reply::Affected(1),
        ]);

        let user = dir
            .upsert(&cmd("markelog", Some("m@example.com"), true))
            .await
            .unwrap();

        assert_eq!(user.id, 7);
        assert_eq!(user.login, "markelog");
        assert_eq!(db.calls()[1].params, vec![Value::Str("m@example.com".into())]);
    }

    #[tokio::test]
    async fn upsert_reports_sign_up_disabled() {
        let (dir, db) = directory(vec![Reply::Row(None)]);

        let err = dir.upsert(&cmd("markelog", None, false)).await.unwrap_err();

        assert!(matches!(err, DirectoryError::SignUpDisabled(ref l) if l == "markelog"));
        assert_eq!(db.calls().len(), 1);
    }

    #[tokio::test]
    async fn upsert_recovers_from_concurrent_insert() {
        let (dir, _db) = directory(vec![
            Reply::Row(None),
            Reply::Fail("Duplicate entry 'markelog' for key 'login'"),
            Reply::Row(Some(user_row(3, "markelog", None))),
            Reply::Affected(0),
        ]);

        let user = dir.upsert(&cmd("markelog", None, true)).await.unwrap();
        assert_eq!(user.id, 3);
    }

    #[tokio::test]
    async fn upsert_rejects_invalid_login_without_touching_db() {
        let (dir, db) = directory(vec![]);

        let err = dir.upsert(&cmd("", None, true)).await.unwrap_err();

        assert!(matches!(err, DirectoryError::InvalidIdentity(_)));
        assert!(db.calls().is_empty());
    }

    #[tokio::test]
    async fn get_signed_in_user_maps_row() {
        let row = Row::default()
            .with("user_id", Value::I64(1))
            .with("org_id", Value::I64(4))
            .with("login", Value::Str("markelog".into()))
            .with("email", Value::Null)
            .with("name", Value::Str("Mark".into()))
            .with("role", Value::Str("Admin".into()));
        let (dir, db) = directory(vec![Reply::Row(Some(row))]);

        let user = dir.get_signed_in_user(1, 4).await.unwrap().unwrap();

        assert_eq!(user.user_id, 1);
        assert_eq!(user.org_id, 4);
        assert_eq!(user.org_role, OrgRole::Admin);
        assert!(user.is_signed_in);
        assert_eq!(db.calls()[0].params, vec![Value::I64(1), Value::I64(4)]);
    }

    #[tokio::test]
    async fn unknown_role_is_a_permanent_fault() {
        let row = Row::default()
            .with("user_id", Value::I64(1))
            .with("org_id", Value::I64(4))
            .with("login", Value::Str("markelog".into()))
            .with("email", Value::Null)
            .with("name", Value::Null)
            .with("role", Value::Str("Owner".into()));
        let (dir, _db) = directory(vec![Reply::Row(Some(row))]);

        let err = dir.get_signed_in_user(1, 4).await.unwrap_err();

        assert!(matches!(err, DirectoryError::Corrupt(_)), "{err:?}");
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn undecodable_user_row_is_a_permanent_fault() {
        let row = Row::default()
            .with("id", Value::Str("seven".into()))
            .with("login", Value::Str("alice".into()))
            .with("email", Value::Null)
            .with("name", Value::Null);
        let (dir, _db) = directory(vec![Reply::Row(Some(row))]);

        let err = dir.lookup_by_external_login("alice").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Corrupt(_)), "{err:?}");
    }

    #[tokio::test]
    async fn get_signed_in_user_returns_none_for_missing_membership() {
        let (dir, _db) = directory(vec![Reply::Row(None)]);

        assert!(dir.get_signed_in_user(33, 4).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn database_failures_are_transient() {
        let (dir, _db) = directory(vec![Reply::Fail("get_conn failed")]);

        let err = dir.get_signed_in_user(1, 4).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable(_)));
    }

    #[tokio::test]
    async fn lookup_by_external_login_maps_row() {
        let (dir, _db) = directory(vec![Reply::Row(Some(user_row(5, "alice", None)))]);

        let user = dir.lookup_by_external_login("alice").await.unwrap().unwrap();
        assert_eq!(user.id, 5);
        assert_eq!(user.login, "alice");
    }
}

//! # In-Memory User Directory
//!
//! A complete [`UserDirectory`] kept in process memory. Useful for
//! embedding, local development and as the reference behavior the SQL
//! backend is tested against.
//!
//! Administrative mutations (`delete_user`, `rename_user`,
//! `remove_from_org`) model the out-of-band changes that make cache
//! entries stale.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::directory::port::{validate_login, UpsertUser, UserDirectory};
use crate::error::directory::DirectoryError;
use crate::identity::model::{InternalUser, OrgRole, SignedInUser};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, InternalUser>,
    memberships: HashMap<(i64, i64), OrgRole>,
    next_id: i64,
}

impl State {
    fn find_by_login(&self, login: &str) -> Option<&InternalUser> {
        self.users.values().find(|u| u.login == login)
    }

    fn find_by_email(&self, email: &str) -> Option<&InternalUser> {
        self.users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
    }

    fn allocate_id(&mut self) -> i64 {
        let floor = self.users.keys().next_back().copied().unwrap_or(0);
        self.next_id = self.next_id.max(floor) + 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    state: Mutex<State>,
    unavailable: AtomicBool,
    upserts: AtomicUsize,
    signed_in_lookups: AtomicUsize,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user with a fixed id and org memberships.
    pub fn with_user(self, id: i64, login: &str, orgs: &[(i64, OrgRole)]) -> Self {
        {
            let mut state = self.lock();
            state.users.insert(
                id,
                InternalUser {
                    id,
                    login: login.to_string(),
                    email: None,
                    name: None,
                },
            );
            for (org_id, role) in orgs {
                state.memberships.insert((id, *org_id), *role);
            }
        }
        self
    }

    /// Deletes a user and all of its memberships.
    pub fn delete_user(&self, user_id: i64) -> bool {
        let mut state = self.lock();
        state.memberships.retain(|(uid, _), _| *uid != user_id);
        state.users.remove(&user_id).is_some()
    }

    pub fn rename_user(&self, user_id: i64, new_login: &str) -> bool {
        match self.lock().users.get_mut(&user_id) {
            Some(user) => {
                user.login = new_login.to_string();
                true
            }
            None => false,
        }
    }

    pub fn remove_from_org(&self, user_id: i64, org_id: i64) -> bool {
        self.lock().memberships.remove(&(user_id, org_id)).is_some()
    }

    pub fn user(&self, user_id: i64) -> Option<InternalUser> {
        self.lock().users.get(&user_id).cloned()
    }

    /// Simulates an outage: every operation fails with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn signed_in_lookup_count(&self) -> usize {
        self.signed_in_lookups.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DirectoryError::Unavailable(anyhow::anyhow!(
                "in-memory directory marked unavailable"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup_by_external_login(
        &self,
        login: &str,
    ) -> Result<Option<InternalUser>, DirectoryError> {
        self.check_available()?;
        Ok(self.lock().find_by_login(login).cloned())
    }

    async fn upsert(&self, cmd: &UpsertUser) -> Result<InternalUser, DirectoryError> {
        self.check_available()?;
        self.upserts.fetch_add(1, Ordering::SeqCst);

        let identity = &cmd.identity;
        validate_login(&identity.login)?;

        let mut state = self.lock();
        let existing = state
            .find_by_login(&identity.login)
            .or_else(|| identity.email.as_deref().and_then(|e| state.find_by_email(e)))
            .map(|u| u.id);

        let user = match existing {
            Some(id) => {
                let user = state
                    .users
                    .get_mut(&id)
                    .ok_or_else(|| anyhow::anyhow!("user {id} vanished during upsert"))?;
                user.login = identity.login.clone();
                if identity.email.is_some() {
                    user.email = identity.email.clone();
                }
                if identity.name.is_some() {
                    user.name = identity.name.clone();
                }
                user.clone()
            }
            None if !cmd.signup_allowed => {
                return Err(DirectoryError::SignUpDisabled(identity.login.clone()));
            }
            None => {
                let id = state.allocate_id();
                let user = InternalUser {
                    id,
                    login: identity.login.clone(),
                    email: identity.email.clone(),
                    name: identity.name.clone(),
                };
                state.users.insert(id, user.clone());
                user
            }
        };

        state
            .memberships
            .entry((user.id, identity.org_id))
            .or_insert(cmd.default_role);

        Ok(user)
    }

    async fn get_signed_in_user(
        &self,
        user_id: i64,
        org_id: i64,
    ) -> Result<Option<SignedInUser>, DirectoryError> {
        self.check_available()?;
        self.signed_in_lookups.fetch_add(1, Ordering::SeqCst);

        let state = self.lock();
        let (Some(user), Some(role)) = (
            state.users.get(&user_id),
            state.memberships.get(&(user_id, org_id)),
        ) else {
            return Ok(None);
        };

        Ok(Some(SignedInUser {
            user_id: user.id,
            org_id,
            login: user.login.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            org_role: *role,
            is_signed_in: true,
        }))
    }
}

//! # Identity Model
//!
//! Value types shared by the resolver, the directory backends and the
//! HTTP layer.
//!
//! - [`ExternalIdentity`]: what the proxy asserted for this request
//! - [`InternalUser`]: the durable record owned by the user directory
//! - [`SignedInUser`]: the resolved identity handed to request handlers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a user inside an organization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrgRole {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Viewer => "Viewer",
            OrgRole::Editor => "Editor",
            OrgRole::Admin => "Admin",
        }
    }
}

impl fmt::Display for OrgRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrgRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(OrgRole::Viewer),
            "editor" => Ok(OrgRole::Editor),
            "admin" => Ok(OrgRole::Admin),
            other => Err(anyhow::anyhow!("unknown org role `{other}`")),
        }
    }
}

/// Which user attribute the identity header carries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeaderProperty {
    #[default]
    Username,
    Email,
}

impl FromStr for HeaderProperty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "username" => Ok(HeaderProperty::Username),
            "email" => Ok(HeaderProperty::Email),
            other => Err(anyhow::anyhow!(
                "auth proxy header property `{other}` is invalid (expected `username` or `email`)"
            )),
        }
    }
}

/// Values of the optional additional headers sent alongside the identity
/// header. Empty strings are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdditionalValues {
    pub name: Option<String>,
    pub email: Option<String>,
    pub login: Option<String>,
}

impl AdditionalValues {
    /// Present values in key-material order (`Name`, `Email`, `Login`).
    pub fn key_parts(&self) -> Vec<&str> {
        [&self.name, &self.email, &self.login]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Identity asserted by the proxy for a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub org_id: i64,
}

impl ExternalIdentity {
    /// Builds an identity from the raw header value.
    ///
    /// With [`HeaderProperty::Email`] the header doubles as login and email.
    /// Non-empty additional values then override the matching fields.
    ///
    /// # Example
    /// ```
    /// use auth_proxy::identity::model::{AdditionalValues, ExternalIdentity, HeaderProperty};
    ///
    /// let extras = AdditionalValues { name: Some("Alice".into()), ..Default::default() };
    /// let id = ExternalIdentity::from_header("alice", HeaderProperty::Username, &extras, 1);
    /// assert_eq!(id.login, "alice");
    /// assert_eq!(id.name.as_deref(), Some("Alice"));
    /// ```
    pub fn from_header(
        header_value: &str,
        property: HeaderProperty,
        extras: &AdditionalValues,
        org_id: i64,
    ) -> Self {
        let header_value = header_value.trim();
        let mut identity = match property {
            HeaderProperty::Username => ExternalIdentity {
                login: header_value.to_string(),
                email: None,
                name: None,
                org_id,
            },
            HeaderProperty::Email => ExternalIdentity {
                login: header_value.to_string(),
                email: Some(header_value.to_string()),
                name: None,
                org_id,
            },
        };

        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();
        if let Some(name) = non_empty(&extras.name) {
            identity.name = Some(name);
        }
        if let Some(email) = non_empty(&extras.email) {
            identity.email = Some(email);
        }
        if let Some(login) = non_empty(&extras.login) {
            identity.login = login;
        }
        identity
    }
}

/// Durable user record owned by the user directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InternalUser {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Directory-verified identity for the current request.
///
/// Created fresh per request and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignedInUser {
    pub user_id: i64,
    pub org_id: i64,
    pub login: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub org_role: OrgRole,
    pub is_signed_in: bool,
}

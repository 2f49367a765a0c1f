//! # Auth Proxy Configuration
//!
//! Settings for trusting an upstream authenticating proxy.
//!
//! # Environment Variables
//! | Variable | Description | Default |
//! |-----------|-------------|----------|
//! | `AUTH_PROXY_ENABLED` | Enable the auth proxy middleware | `false` |
//! | `AUTH_PROXY_HEADER_NAME` | Header carrying the external login | `X-WEBAUTH-USER` |
//! | `AUTH_PROXY_HEADER_PROPERTY` | `username` or `email` | `username` |
//! | `AUTH_PROXY_AUTO_SIGN_UP` | Create users on first sighting | `true` |
//! | `AUTH_PROXY_SYNC_TTL` | Cache TTL in minutes, `0` = no expiry | `60` |
//! | `AUTH_PROXY_WHITELIST` | Allowed proxy IPs / CIDRs | *none* |
//! | `AUTH_PROXY_HEADERS` | Additional headers, e.g. `Name:X-WEBAUTH-NAME` | *none* |
//! | `AUTH_PROXY_ORG_HEADER` | Header selecting the organization | `X-Org-Id` |
//! | `AUTH_PROXY_DEFAULT_ORG_ID` | Organization when no org header is sent | `1` |
//! | `AUTH_PROXY_DEFAULT_ROLE` | Role for new org memberships | `Viewer` |
//! | `AUTH_PROXY_RESOLVE_TIMEOUT_MS` | Per-request resolution deadline, `0` = none | `0` |

use std::net::IpAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ipnetwork::IpNetwork;

use crate::config::env::{read_flag_from, read_i64_from, read_string_from, read_u64_from};
use crate::identity::model::{HeaderProperty, OrgRole};

pub const DEFAULT_HEADER_NAME: &str = "X-WEBAUTH-USER";
pub const DEFAULT_ORG_HEADER: &str = "X-Org-Id";

/// Header names for the optional identity attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdditionalHeaders {
    pub name: Option<String>,
    pub email: Option<String>,
    pub login: Option<String>,
}

impl AdditionalHeaders {
    /// Parses `"Name:X-WEBAUTH-NAME Email:X-WEBAUTH-EMAIL"`.
    ///
    /// Entries are separated by whitespace or commas. Field names are
    /// case-insensitive; unknown fields are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut out = AdditionalHeaders::default();
        for entry in raw.split(|c: char| c.is_whitespace() || c == ',') {
            if entry.is_empty() {
                continue;
            }
            let Some((field, header)) = entry.split_once(':') else {
                bail!("additional header `{entry}` must look like `Field:Header-Name`");
            };
            let header = header.trim();
            if header.is_empty() {
                bail!("additional header `{entry}` has an empty header name");
            }
            let slot = match field.trim().to_ascii_lowercase().as_str() {
                "name" => &mut out.name,
                "email" => &mut out.email,
                "login" => &mut out.login,
                other => bail!("unsupported additional header field `{other}`"),
            };
            *slot = Some(header.to_string());
        }
        Ok(out)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.login.is_none()
    }
}

/// Source addresses allowed to assert identities.
///
/// An empty whitelist allows every peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Whitelist {
    networks: Vec<IpNetwork>,
}

impl Whitelist {
    /// Parses a comma or whitespace separated list of IPs and CIDR ranges.
    /// A bare address is treated as a single-host network.
    pub fn parse(raw: &str) -> Result<Self> {
        let networks = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<IpNetwork>()
                    .with_context(|| format!("invalid auth proxy whitelist entry `{s}`"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { networks })
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn allows(&self, ip: IpAddr) -> bool {
        self.is_empty() || self.networks.iter().any(|n| n.contains(ip))
    }
}

/// Auth proxy settings.
#[derive(Clone, Debug)]
pub struct AuthProxyConfig {
    pub enabled: bool,
    pub header_name: String,
    pub header_property: HeaderProperty,
    pub auto_sign_up: bool,
    /// Lifetime of a cached login → user id hint.
    pub sync_ttl: Duration,
    pub whitelist: Whitelist,
    pub headers: AdditionalHeaders,
    pub org_header: String,
    pub default_org_id: i64,
    pub default_role: OrgRole,
    /// Deadline applied by the middleware. `None` leaves latency to the caller.
    pub resolve_timeout: Option<Duration>,
}

impl Default for AuthProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            header_name: DEFAULT_HEADER_NAME.into(),
            header_property: HeaderProperty::Username,
            auto_sign_up: true,
            sync_ttl: Duration::from_secs(60 * 60),
            whitelist: Whitelist::default(),
            headers: AdditionalHeaders::default(),
            org_header: DEFAULT_ORG_HEADER.into(),
            default_org_id: 1,
            default_role: OrgRole::Viewer,
            resolve_timeout: None,
        }
    }
}

impl AuthProxyConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    /// Fails on an invalid header property, role, whitelist entry or
    /// additional header specification.
    pub fn from_env() -> Result<Self> {
        Self::from_provider(|k| std::env::var(k).ok())
    }

    /// Loads the configuration from an arbitrary key/value provider.
    pub fn from_provider<F>(provider: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let header_property = read_string_from(&provider, "AUTH_PROXY_HEADER_PROPERTY", "username")
            .parse::<HeaderProperty>()?;
        let default_role = read_string_from(&provider, "AUTH_PROXY_DEFAULT_ROLE", "Viewer")
            .parse::<OrgRole>()
            .context("AUTH_PROXY_DEFAULT_ROLE")?;
        let whitelist = Whitelist::parse(&read_string_from(&provider, "AUTH_PROXY_WHITELIST", ""))?;
        let headers = AdditionalHeaders::parse(&read_string_from(&provider, "AUTH_PROXY_HEADERS", ""))?;

        let sync_ttl_minutes = read_u64_from(&provider, "AUTH_PROXY_SYNC_TTL", 60);
        let timeout_ms = read_u64_from(&provider, "AUTH_PROXY_RESOLVE_TIMEOUT_MS", 0);

        Ok(Self {
            enabled: read_flag_from(&provider, "AUTH_PROXY_ENABLED", false),
            header_name: read_string_from(&provider, "AUTH_PROXY_HEADER_NAME", DEFAULT_HEADER_NAME),
            header_property,
            auto_sign_up: read_flag_from(&provider, "AUTH_PROXY_AUTO_SIGN_UP", true),
            sync_ttl: Duration::from_secs(sync_ttl_minutes.saturating_mul(60)),
            whitelist,
            headers,
            org_header: read_string_from(&provider, "AUTH_PROXY_ORG_HEADER", DEFAULT_ORG_HEADER),
            default_org_id: read_i64_from(&provider, "AUTH_PROXY_DEFAULT_ORG_ID", 1),
            default_role,
            resolve_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        })
    }
}

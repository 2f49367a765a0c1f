//! # Identity Cache Configuration
//!
//! Selects the backing store for login → user id hints.
//!
//! | Variable | Description | Default |
//! |-----------|-------------|----------|
//! | `REMOTE_CACHE_TYPE` | `memory` or `database` | `memory` |

use std::str::FromStr;

use anyhow::{bail, Result};

use crate::config::env::read_string_from;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheBackend {
    /// Process-local map. Not shared between instances.
    #[default]
    Memory,
    /// `cache_data` table in the application database.
    Database,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "database" => Ok(CacheBackend::Database),
            other => bail!("unsupported REMOTE_CACHE_TYPE `{other}`"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
}

impl CacheConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_provider(|k| std::env::var(k).ok())
    }

    pub fn from_provider<F>(provider: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = read_string_from(provider, "REMOTE_CACHE_TYPE", "memory").parse()?;
        Ok(Self { backend })
    }
}

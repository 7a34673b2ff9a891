//! Identity and query-configuration lookups.
//!
//! The orchestrator validates enqueue requests against this seam; the
//! static implementation is backed by the TOML config.

use crate::config::Config;
use crate::error::{Result, VantageError};
use std::collections::HashMap;

/// A known identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Backend user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the account is active.
    pub active: bool,
    /// Whether this user may enqueue impersonated runs.
    pub can_impersonate: bool,
}

/// A resolved query configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// Configuration id (the config table key).
    pub id: String,
    /// Target object, if declared.
    pub object: Option<String>,
    /// Query text.
    pub query: String,
    /// Whether the configuration is active.
    pub active: bool,
}

/// Lookup seam for users and query configurations.
pub trait Directory: Send + Sync {
    /// Looks up a user by roster key or backend id.
    fn user(&self, key: &str) -> Option<&UserProfile>;

    /// Looks up a query configuration by name.
    fn query_config(&self, key: &str) -> Option<&QueryConfig>;

    /// The identity making requests in this session.
    fn caller(&self) -> &UserProfile;
}

/// Directory backed by the loaded config file.
#[derive(Debug)]
pub struct StaticDirectory {
    users: HashMap<String, UserProfile>,
    queries: HashMap<String, QueryConfig>,
    caller_key: String,
}

impl StaticDirectory {
    /// Builds a directory from config, with the given roster key as caller.
    pub fn from_config(config: &Config, caller_key: &str) -> Result<Self> {
        let users: HashMap<String, UserProfile> = config
            .users
            .iter()
            .map(|(key, user)| {
                (
                    key.clone(),
                    UserProfile {
                        id: user.id.clone(),
                        name: user.name.clone().unwrap_or_else(|| key.clone()),
                        active: user.active,
                        can_impersonate: user.can_impersonate,
                    },
                )
            })
            .collect();

        if !users.contains_key(caller_key) {
            return Err(VantageError::config(format!(
                "Caller '{caller_key}' not found in [users]"
            )));
        }

        let queries = config
            .queries
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    QueryConfig {
                        id: key.clone(),
                        object: entry.object.clone(),
                        query: entry.query.clone(),
                        active: entry.active,
                    },
                )
            })
            .collect();

        Ok(Self {
            users,
            queries,
            caller_key: caller_key.to_string(),
        })
    }
}

impl Directory for StaticDirectory {
    fn user(&self, key: &str) -> Option<&UserProfile> {
        self.users
            .get(key)
            .or_else(|| self.users.values().find(|u| u.id == key))
    }

    fn query_config(&self, key: &str) -> Option<&QueryConfig> {
        self.queries.get(key)
    }

    fn caller(&self) -> &UserProfile {
        // Presence is validated in from_config
        &self.users[&self.caller_key]
    }
}

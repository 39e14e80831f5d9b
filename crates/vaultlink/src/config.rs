//! Client configuration.
//!
//! Loaded from `VAULTLINK_*` environment variables or from JSON. Nothing is
//! validated at load time; each accessor fails with a [`ConfigError`] when
//! the operation that needs the setting runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use vaultlink_core::{Cid, Keypair};

use crate::error::ConfigError;

/// Gateway used for shareable links when none is configured.
pub const DEFAULT_GATEWAY_HOST: &str = "storacha.link";

pub const ENV_DEFAULT_DELEGATION: &str = "VAULTLINK_DEFAULT_DELEGATION";
pub const ENV_ISSUER_API_KEY: &str = "VAULTLINK_ISSUER_API_KEY";
pub const ENV_STORAGE_ENDPOINT: &str = "VAULTLINK_STORAGE_ENDPOINT";
pub const ENV_AGENT_KEY: &str = "VAULTLINK_AGENT_KEY";
pub const ENV_GATEWAY_HOST: &str = "VAULTLINK_GATEWAY_HOST";
pub const ENV_STATE_PATH: &str = "VAULTLINK_STATE_PATH";

/// Configuration shared by every workflow.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base64 CAR delegation bound automatically on upload start.
    pub default_delegation: Option<String>,

    /// Credential for the key-issuance service.
    pub issuer_api_key: Option<String>,

    /// Where the storage service lives.
    pub storage_endpoint: Option<String>,

    /// Hex seed of the agent key delegations are addressed to.
    pub agent_key: Option<String>,

    /// Host used in gateway links.
    pub gateway_host: String,

    /// SQLite file for persisted identities. In-memory when unset.
    pub state_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_delegation: None,
            issuer_api_key: None,
            storage_endpoint: None,
            agent_key: None,
            gateway_host: DEFAULT_GATEWAY_HOST.to_string(),
            state_path: None,
        }
    }
}

impl ClientConfig {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            default_delegation: get(ENV_DEFAULT_DELEGATION),
            issuer_api_key: get(ENV_ISSUER_API_KEY),
            storage_endpoint: get(ENV_STORAGE_ENDPOINT),
            agent_key: get(ENV_AGENT_KEY),
            gateway_host: get(ENV_GATEWAY_HOST).unwrap_or_else(|| DEFAULT_GATEWAY_HOST.to_string()),
            state_path: get(ENV_STATE_PATH).map(PathBuf::from),
        }
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// The agent keypair.
    pub fn agent_keypair(&self) -> Result<Keypair, ConfigError> {
        let seed = self
            .agent_key
            .as_deref()
            .ok_or(ConfigError::Missing("agent_key"))?;
        Keypair::from_hex_seed(seed).map_err(|e| ConfigError::Invalid {
            field: "agent_key",
            detail: e.to_string(),
        })
    }

    /// Key-issuance credentials, required for identity operations.
    pub fn issuer_credentials(&self) -> Result<&str, ConfigError> {
        self.issuer_api_key
            .as_deref()
            .ok_or(ConfigError::Missing("issuer_api_key"))
    }

    /// Public gateway link for a stored object.
    pub fn gateway_url(&self, cid: &Cid) -> String {
        gateway_url(&self.gateway_host, cid)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientConfig")
            .field("default_delegation", &self.default_delegation.is_some())
            .field("issuer_api_key", &redact(&self.issuer_api_key))
            .field("storage_endpoint", &self.storage_endpoint)
            .field("agent_key", &redact(&self.agent_key))
            .field("gateway_host", &self.gateway_host)
            .field("state_path", &self.state_path)
            .finish()
    }
}

/// `https://<host>/ipfs/<cid>`
pub fn gateway_url(host: &str, cid: &Cid) -> String {
    format!("https://{}/ipfs/{}", host, cid)
}

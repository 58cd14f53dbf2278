//! Host wiring configuration.
//!
//! The bridge itself takes no configuration. This covers the reference
//! host: which worker the output belongs to, where secrets come from, and
//! what the KV store starts with.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{MemoryKv, SecretStore};

/// Errors loading a [`HostConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for a host config.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Identity attached to output from one sandboxed worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    /// Worker name.
    pub name: String,
    /// Address the worker is served on.
    pub address: String,
}

impl Default for WorkerIdentity {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            address: "local".to_string(),
        }
    }
}

/// Configuration for the reference host operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Identity tagged onto console output.
    pub worker: WorkerIdentity,
    /// Environment variables starting with this prefix become secrets,
    /// named without the prefix.
    pub secret_env_prefix: Option<String>,
    /// Literal secrets. These win over environment secrets of the same name.
    pub secrets: BTreeMap<String, String>,
    /// Initial KV contents, as text keys and values.
    pub kv: BTreeMap<String, String>,
}

impl HostConfig {
    /// Load a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Build the secret store this config describes, reading the process
    /// environment when `secret_env_prefix` is set.
    pub fn secret_store(&self) -> SecretStore {
        self.secret_store_from(std::env::vars())
    }

    fn secret_store_from(&self, vars: impl IntoIterator<Item = (String, String)>) -> SecretStore {
        let mut store = match &self.secret_env_prefix {
            Some(prefix) => SecretStore::from_vars(prefix, vars),
            None => SecretStore::new(),
        };
        store.extend(self.secrets.clone());
        store
    }

    /// Build the KV store this config describes.
    pub fn memory_kv(&self) -> MemoryKv {
        MemoryKv::with_entries(self.kv.clone())
    }
}

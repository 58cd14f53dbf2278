//! Map-backed secret store.

use std::collections::HashMap;
use std::fmt;

use crate::error::{HostError, HostResult};
use crate::value::Value;

/// Read-only map of secret names to values.
///
/// Values never appear in `Debug` output.
#[derive(Clone, Default)]
pub struct SecretStore {
    secrets: HashMap<String, String>,
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.secrets.keys().collect();
        names.sort();
        f.debug_struct("SecretStore").field("names", &names).finish()
    }
}

impl SecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret.
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    /// Add every secret from an iterator of `(name, value)` pairs.
    pub fn extend(&mut self, secrets: impl IntoIterator<Item = (String, String)>) {
        self.secrets.extend(secrets);
    }

    /// Collect variables whose name starts with `prefix`, with the prefix
    /// stripped. Variables whose remaining name is empty are skipped.
    pub fn from_vars(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let secrets = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let name = name.strip_prefix(prefix)?;
                (!name.is_empty()).then(|| (name.to_string(), value))
            })
            .collect();
        Self { secrets }
    }

    /// Load secrets from the process environment.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Number of secrets held.
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Resolve a secret by key. The key must be text.
    pub fn lookup(&self, key: &Value) -> HostResult {
        let Some(name) = key.as_text() else {
            return Err(HostError::invalid_argument(format!(
                "secret names are text, got {}",
                key.kind()
            )));
        };
        self.secrets
            .get(name)
            .map(|v| Value::text(v.clone()))
            .ok_or_else(|| HostError::not_found(format!("secret {name}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::HostErrorKind;

    #[test]
    fn test_lookup() {
        let store = SecretStore::new().with_secret("API_KEY", "s3cr3t");
        assert_eq!(
            store.lookup(&Value::text("API_KEY")).unwrap(),
            Value::text("s3cr3t")
        );

        let err = store.lookup(&Value::text("OTHER")).unwrap_err();
        assert_eq!(err.kind, HostErrorKind::NotFound);

        let err = store.lookup(&Value::bytes(b"API_KEY".to_vec())).unwrap_err();
        assert_eq!(err.kind, HostErrorKind::InvalidArgument);
    }

    #[test]
    fn test_from_vars_strips_prefix() {
        let vars = vec![
            ("APP_SECRET_TOKEN".to_string(), "abc".to_string()),
            ("APP_SECRET_".to_string(), "empty-name".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let store = SecretStore::from_vars("APP_SECRET_", vars);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.lookup(&Value::text("TOKEN")).unwrap(),
            Value::text("abc")
        );
        assert!(store.lookup(&Value::text("PATH")).is_err());
    }

    #[test]
    fn test_debug_hides_values() {
        let store = SecretStore::new().with_secret("DB_PASSWORD", "hunter2");
        let debug = format!("{store:?}");
        assert!(debug.contains("DB_PASSWORD"));
        assert!(!debug.contains("hunter2"));
    }
}

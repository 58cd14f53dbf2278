//! The `Secrets` capability: read one secret by name.
//!
//! There is deliberately no listing, writing or rotation surface. Values
//! pass straight through to the caller and are never cached or logged here.

use std::fmt;
use std::sync::Arc;

use crate::binding::{CapabilityDescriptor, OperationBinding};
use crate::dispatcher::Dispatcher;
use crate::error::{BridgeError, HostError};
use crate::host::ops;
use crate::value::Value;

/// A secret returned to sandboxed code. `Debug` never shows the value.
#[derive(Clone, PartialEq)]
pub struct SecretValue(Value);

impl SecretValue {
    /// Borrow the secret.
    pub fn expose(&self) -> &Value {
        &self.0
    }

    /// Take the secret out.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

/// The `Secrets` global.
#[derive(Debug, Clone)]
pub struct Secrets {
    dispatcher: Arc<Dispatcher>,
}

impl Secrets {
    /// Global name and method bindings.
    pub const DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
        name: "Secrets",
        bindings: &[OperationBinding::sync("get", ops::SECRET_GET)],
    };

    /// Create the capability.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Read the secret named by `key`.
    ///
    /// A host that answers with the absent sentinel is treated as reporting
    /// not-found, so callers always get either a value or an error.
    pub fn get(&self, key: impl Into<Value>) -> Result<SecretValue, BridgeError> {
        let value = self.dispatcher.call_sync(ops::SECRET_GET, vec![key.into()])?;
        if value.is_absent() {
            return Err(BridgeError::HostOperation {
                op: ops::SECRET_GET.to_string(),
                source: HostError::not_found("secret not found"),
            });
        }
        Ok(SecretValue(value))
    }
}

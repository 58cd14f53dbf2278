//! The `KV` capability.
//!
//! Keys and values are opaque and forwarded unchanged. Every method is
//! asynchronous. Ordering and atomicity between concurrent calls belong to
//! the host's storage engine; this layer adds none.

use std::sync::Arc;

use crate::binding::{CapabilityDescriptor, OperationBinding};
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::host::ops;
use crate::value::Value;

/// The `KV` global.
#[derive(Debug, Clone)]
pub struct Kv {
    dispatcher: Arc<Dispatcher>,
}

impl Kv {
    /// Global name and method bindings.
    pub const DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
        name: "KV",
        bindings: &[
            OperationBinding::r#async("get", ops::KV_GET),
            OperationBinding::r#async("put", ops::KV_PUT),
            OperationBinding::r#async("delete", ops::KV_DELETE),
        ],
    };

    /// Create the capability.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Fetch the value stored under `key`.
    ///
    /// Returns `None` when the host reports the absent sentinel.
    pub async fn get(&self, key: impl Into<Value>) -> Result<Option<Value>, BridgeError> {
        let key = checked_key(ops::KV_GET, key.into())?;
        let value = self.dispatcher.call_async(ops::KV_GET, vec![key])?.await?;
        Ok((!value.is_absent()).then_some(value))
    }

    /// Store `value` under `key`.
    pub async fn put(
        &self,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<(), BridgeError> {
        let key = checked_key(ops::KV_PUT, key.into())?;
        self.dispatcher
            .call_async(ops::KV_PUT, vec![key, value.into()])?
            .await?;
        Ok(())
    }

    /// Remove `key`. Whether removing a missing key fails is up to the host.
    pub async fn delete(&self, key: impl Into<Value>) -> Result<(), BridgeError> {
        let key = checked_key(ops::KV_DELETE, key.into())?;
        self.dispatcher
            .call_async(ops::KV_DELETE, vec![key])?
            .await?;
        Ok(())
    }
}

/// The absent value cannot be compared for equality, so it is not a key.
fn checked_key(op: &str, key: Value) -> Result<Value, BridgeError> {
    if key.is_absent() {
        return Err(BridgeError::MalformedArgument {
            op: op.to_string(),
            reason: "key must not be absent".to_string(),
        });
    }
    Ok(key)
}

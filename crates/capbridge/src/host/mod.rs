//! The host operation table and reference host operations.
//!
//! The isolation mechanism hands the bridge a table of named host
//! operations. This module defines that table ([`HostOpTable`]) and the
//! traits a host operation implements. It also ships reference operations
//! backed by plain in-process collaborators:
//!
//! - [`MemoryKv`] for `op_kv_get`, `op_kv_put` and `op_kv_delete`
//! - [`SecretStore`] for `op_secret_get`
//! - [`OutputSink`] implementations for `op_log_stdout` and `op_log_stderr`,
//!   including a [`LogBuffer`] shared by many workers and searchable by
//!   worker address and name
//!
//! [`standard_table`] wires all six operations together.

mod config;
mod logs;
mod memory;
mod output;
mod secrets;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::binding::CallingConvention;
use crate::capability::Severity;
use crate::error::{HostError, HostResult};
use crate::value::Value;

pub use config::{ConfigError, HostConfig, WorkerIdentity};
pub use logs::{LogBuffer, LogEntry, WorkerLogSink};
pub use memory::MemoryKv;
pub use output::{CaptureSink, OutputSink, StdioSink};
pub use secrets::SecretStore;

/// Host operation names.
pub mod ops {
    /// Write a byte payload to the normal output sink.
    pub const LOG_STDOUT: &str = "op_log_stdout";
    /// Write a byte payload to the error output sink.
    pub const LOG_STDERR: &str = "op_log_stderr";
    /// Look up a key.
    pub const KV_GET: &str = "op_kv_get";
    /// Store a key/value pair.
    pub const KV_PUT: &str = "op_kv_put";
    /// Remove a key.
    pub const KV_DELETE: &str = "op_kv_delete";
    /// Read a named secret.
    pub const SECRET_GET: &str = "op_secret_get";
}

/// A host operation that completes on the caller's turn.
pub trait SyncHostOp: Send + Sync {
    /// Run the operation.
    fn call(&self, args: Vec<Value>) -> HostResult;
}

impl<F> SyncHostOp for F
where
    F: Fn(Vec<Value>) -> HostResult + Send + Sync,
{
    fn call(&self, args: Vec<Value>) -> HostResult {
        self(args)
    }
}

/// A host operation that completes asynchronously.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl AsyncHostOp for Echo {
///     async fn call(&self, mut args: Vec<Value>) -> HostResult {
///         Ok(args.pop().unwrap_or_default())
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncHostOp: Send + Sync {
    /// Run the operation.
    async fn call(&self, args: Vec<Value>) -> HostResult;
}

/// Blanket implementation for async closures.
#[async_trait]
impl<F, Fut> AsyncHostOp for F
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = HostResult> + Send,
{
    async fn call(&self, args: Vec<Value>) -> HostResult {
        self(args).await
    }
}

/// One entry in the host operation table.
#[derive(Clone)]
pub enum HostOp {
    /// Synchronous operation.
    Sync(Arc<dyn SyncHostOp>),
    /// Asynchronous operation.
    Async(Arc<dyn AsyncHostOp>),
}

impl HostOp {
    /// Calling convention of this operation.
    pub fn convention(&self) -> CallingConvention {
        match self {
            HostOp::Sync(_) => CallingConvention::Sync,
            HostOp::Async(_) => CallingConvention::Async,
        }
    }
}

impl fmt::Debug for HostOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostOp").field(&self.convention()).finish()
    }
}

/// Named host operations made available to the bridge.
///
/// Registering a name twice replaces the earlier entry.
#[derive(Clone, Default)]
pub struct HostOpTable {
    ops: BTreeMap<String, HostOp>,
}

impl fmt::Debug for HostOpTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.ops.iter().map(|(k, v)| (k, v.convention())))
            .finish()
    }
}

impl HostOpTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous operation from a closure.
    pub fn register_sync<F>(&mut self, name: impl Into<String>, op: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> HostResult + Send + Sync + 'static,
    {
        self.insert(name, HostOp::Sync(Arc::new(op)))
    }

    /// Register an asynchronous operation from a closure returning a future.
    pub fn register_async<F, Fut>(&mut self, name: impl Into<String>, op: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HostResult> + Send + 'static,
    {
        self.insert(name, HostOp::Async(Arc::new(op)))
    }

    /// Register an already-built operation.
    pub fn insert(&mut self, name: impl Into<String>, op: HostOp) -> &mut Self {
        let name = name.into();
        if self.ops.insert(name.clone(), op).is_some() {
            tracing::debug!(op = %name, "replaced host operation");
        }
        self
    }

    /// Look up an operation by name.
    pub fn get(&self, name: &str) -> Option<&HostOp> {
        self.ops.get(name)
    }

    /// Returns true if an operation with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }

    /// Number of registered operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if no operations are registered.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Split `args` into exactly `N` values or fail with `InvalidArgument`.
pub fn take_args<const N: usize>(op: &str, args: Vec<Value>) -> Result<[Value; N], HostError> {
    let got = args.len();
    args.try_into().map_err(|_| {
        HostError::invalid_argument(format!("{op} expects {N} argument(s), got {got}"))
    })
}

/// Build a table with all six reference operations.
pub fn standard_table(
    kv: Arc<MemoryKv>,
    secrets: Arc<SecretStore>,
    sink: Arc<dyn OutputSink>,
) -> HostOpTable {
    let mut table = HostOpTable::new();

    for (name, severity) in [
        (ops::LOG_STDOUT, Severity::Normal),
        (ops::LOG_STDERR, Severity::Error),
    ] {
        let sink = Arc::clone(&sink);
        table.register_sync(name, move |args| {
            let [payload] = take_args(name, args)?;
            match payload {
                Value::Bytes(bytes) => {
                    sink.write(severity, &bytes)?;
                    Ok(Value::Absent)
                }
                other => Err(HostError::invalid_argument(format!(
                    "{name} expects bytes, got {}",
                    other.kind()
                ))),
            }
        });
    }

    let store = Arc::clone(&kv);
    table.register_async(ops::KV_GET, move |args| {
        let store = Arc::clone(&store);
        async move {
            let [key] = take_args(ops::KV_GET, args)?;
            Ok(store.get(&key).await.unwrap_or_default())
        }
    });

    let store = Arc::clone(&kv);
    table.register_async(ops::KV_PUT, move |args| {
        let store = Arc::clone(&store);
        async move {
            let [key, value] = take_args(ops::KV_PUT, args)?;
            store.put(key, value).await;
            Ok(Value::Absent)
        }
    });

    table.register_async(ops::KV_DELETE, move |args| {
        let store = Arc::clone(&kv);
        async move {
            let [key] = take_args(ops::KV_DELETE, args)?;
            store.delete(&key).await;
            Ok(Value::Absent)
        }
    });

    table.register_sync(ops::SECRET_GET, move |args| {
        let [key] = take_args(ops::SECRET_GET, args)?;
        secrets.lookup(&key)
    });

    table
}

//! The operation dispatcher.
//!
//! Every capability call reaches the host through [`Dispatcher`]. It holds
//! the host operation table together with the set of operations bound at
//! bootstrap, and refuses anything outside that set. Beyond the immutable
//! binding set it keeps no state between calls.
//!
//! ## Calling conventions
//!
//! Synchronous operations run on the caller's current turn and return
//! [`Invocation::Ready`]. Asynchronous operations return
//! [`Invocation::Pending`] immediately; the [`PendingCall`] resolves when the
//! host completes. Distinct pending calls resolve in whatever order the host
//! completes them.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;

use crate::binding::{CallingConvention, CapabilityDescriptor};
use crate::error::{BridgeError, HostError, HostResult};
use crate::host::{HostOp, HostOpTable};
use crate::value::Value;

/// One in-flight invocation: the operation name and its arguments.
///
/// An envelope is consumed by [`Dispatcher::dispatch`] and cannot be
/// reused.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    op: String,
    args: Vec<Value>,
}

impl CallEnvelope {
    /// Create an envelope for `op`.
    pub fn new(op: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            op: op.into(),
            args,
        }
    }

    /// Operation name.
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Argument payload.
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// Pending result of an asynchronous host operation.
///
/// Owned by the call site that issued it. Dropping it abandons the result;
/// there is no separate cancellation.
#[must_use = "a pending call does nothing unless awaited"]
pub struct PendingCall {
    op: String,
    future: BoxFuture<'static, HostResult>,
}

impl PendingCall {
    /// Operation this call is waiting on.
    pub fn op(&self) -> &str {
        &self.op
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("op", &self.op)
            .finish_non_exhaustive()
    }
}

impl Future for PendingCall {
    type Output = Result<Value, BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.future.as_mut().poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => Poll::Ready(host_result(&this.op, result)),
        }
    }
}

/// Outcome of [`Dispatcher::invoke`].
#[derive(Debug)]
pub enum Invocation {
    /// A synchronous operation finished.
    Ready(Value),
    /// An asynchronous operation is in flight.
    Pending(PendingCall),
}

impl Invocation {
    /// Wait for the result, whichever convention produced it.
    pub async fn resolve(self) -> Result<Value, BridgeError> {
        match self {
            Invocation::Ready(value) => Ok(value),
            Invocation::Pending(call) => call.await,
        }
    }
}

/// Routes capability calls to bound host operations.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<HostOpTable>,
    bound: BTreeMap<&'static str, CallingConvention>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Bind the operations of `descriptors` against `table`.
    ///
    /// Fails if a bound operation is missing from the table, or is
    /// registered with a different calling convention than the binding
    /// expects. Operations present in the table but not bound by any
    /// descriptor stay unreachable.
    pub fn bind(
        table: HostOpTable,
        descriptors: &[CapabilityDescriptor],
    ) -> Result<Self, BridgeError> {
        let mut bound = BTreeMap::new();

        for descriptor in descriptors {
            for binding in descriptor.bindings {
                let Some(op) = table.get(binding.op) else {
                    return Err(BridgeError::MissingHostOperation {
                        capability: descriptor.name.to_string(),
                        op: binding.op.to_string(),
                    });
                };
                if op.convention() != binding.convention {
                    return Err(BridgeError::ConventionMismatch {
                        op: binding.op.to_string(),
                        expected: binding.convention,
                        actual: op.convention(),
                    });
                }
                bound.insert(binding.op, binding.convention);
            }
            tracing::debug!(
                capability = descriptor.name,
                methods = descriptor.bindings.len(),
                "bound capability"
            );
        }

        Ok(Self {
            table: Arc::new(table),
            bound,
        })
    }

    /// Returns true if `op` is reachable through this dispatcher.
    pub fn is_bound(&self, op: &str) -> bool {
        self.bound.contains_key(op)
    }

    /// Bound operations and their calling conventions, sorted by name.
    pub fn bindings(&self) -> impl Iterator<Item = (&'static str, CallingConvention)> + '_ {
        self.bound.iter().map(|(op, conv)| (*op, *conv))
    }

    /// Invoke a bound operation.
    pub fn invoke(&self, op: &str, args: Vec<Value>) -> Result<Invocation, BridgeError> {
        self.dispatch(CallEnvelope::new(op, args))
    }

    /// Invoke the operation described by `envelope`.
    pub fn dispatch(&self, envelope: CallEnvelope) -> Result<Invocation, BridgeError> {
        let CallEnvelope { op, args } = envelope;
        match self.resolve(&op)? {
            HostOp::Sync(host_op) => {
                tracing::trace!(op = %op, args = args.len(), "calling sync host operation");
                let result = host_op.call(args);
                host_result(&op, result).map(Invocation::Ready)
            }
            HostOp::Async(host_op) => {
                tracing::trace!(op = %op, args = args.len(), "starting async host operation");
                let host_op = Arc::clone(host_op);
                let future = Box::pin(async move { host_op.call(args).await });
                Ok(Invocation::Pending(PendingCall { op, future }))
            }
        }
    }

    /// Invoke a synchronous operation and return its result.
    ///
    /// Fails with [`BridgeError::ConventionMismatch`] if `op` is bound as
    /// asynchronous; the host is not called in that case.
    pub fn call_sync(&self, op: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.expect_convention(op, CallingConvention::Sync)?;
        match self.invoke(op, args)? {
            Invocation::Ready(value) => Ok(value),
            Invocation::Pending(_) => Err(BridgeError::ConventionMismatch {
                op: op.to_string(),
                expected: CallingConvention::Sync,
                actual: CallingConvention::Async,
            }),
        }
    }

    /// Start an asynchronous operation, returning its pending result.
    ///
    /// Fails with [`BridgeError::ConventionMismatch`] if `op` is bound as
    /// synchronous; the host is not called in that case.
    pub fn call_async(&self, op: &str, args: Vec<Value>) -> Result<PendingCall, BridgeError> {
        self.expect_convention(op, CallingConvention::Async)?;
        match self.invoke(op, args)? {
            Invocation::Pending(call) => Ok(call),
            Invocation::Ready(_) => Err(BridgeError::ConventionMismatch {
                op: op.to_string(),
                expected: CallingConvention::Async,
                actual: CallingConvention::Sync,
            }),
        }
    }

    fn expect_convention(&self, op: &str, expected: CallingConvention) -> Result<(), BridgeError> {
        match self.bound.get(op) {
            None => Err(unknown(op)),
            Some(actual) if *actual != expected => Err(BridgeError::ConventionMismatch {
                op: op.to_string(),
                expected,
                actual: *actual,
            }),
            Some(_) => Ok(()),
        }
    }

    fn resolve(&self, op: &str) -> Result<&HostOp, BridgeError> {
        if !self.bound.contains_key(op) {
            return Err(unknown(op));
        }
        self.table.get(op).ok_or_else(|| unknown(op))
    }
}

fn unknown(op: &str) -> BridgeError {
    tracing::error!(op = %op, "call to unbound operation");
    BridgeError::UnknownOperation { op: op.to_string() }
}

fn host_result(op: &str, result: Result<Value, HostError>) -> Result<Value, BridgeError> {
    result.map_err(|source| {
        tracing::debug!(op = %op, error = %source, "host operation failed");
        BridgeError::HostOperation {
            op: op.to_string(),
            source,
        }
    })
}

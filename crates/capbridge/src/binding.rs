//! Capability descriptors and operation bindings.

use std::fmt;

/// How a host operation returns its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallingConvention {
    /// Runs to completion on the caller's current turn.
    Sync,
    /// Hands the caller a pending result and completes later.
    Async,
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallingConvention::Sync => f.write_str("sync"),
            CallingConvention::Async => f.write_str("async"),
        }
    }
}

/// Maps one capability method onto a host operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationBinding {
    /// Method name as seen by sandboxed code.
    pub method: &'static str,
    /// Host operation the method forwards to.
    pub op: &'static str,
    /// Calling convention the method expects.
    pub convention: CallingConvention,
}

impl OperationBinding {
    /// A binding to a synchronous host operation.
    pub const fn sync(method: &'static str, op: &'static str) -> Self {
        Self {
            method,
            op,
            convention: CallingConvention::Sync,
        }
    }

    /// A binding to an asynchronous host operation.
    pub const fn r#async(method: &'static str, op: &'static str) -> Self {
        Self {
            method,
            op,
            convention: CallingConvention::Async,
        }
    }
}

/// Describes one installable global object and the operations it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    /// Global name the object is installed under.
    pub name: &'static str,
    /// Method bindings, in declaration order.
    pub bindings: &'static [OperationBinding],
}

impl CapabilityDescriptor {
    /// Look up the binding for a method.
    pub fn binding(&self, method: &str) -> Option<&OperationBinding> {
        self.bindings.iter().find(|b| b.method == method)
    }

    /// Method names, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|b| b.method)
    }
}

//! Error types for the bridge and the host operations behind it.

use std::fmt;

use thiserror::Error;

use crate::binding::CallingConvention;

/// Category of a host-side failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrorKind {
    /// The requested item does not exist.
    NotFound,
    /// The host refused the operation.
    AccessDenied,
    /// The host could not make sense of the arguments it received.
    InvalidArgument,
    /// The backing service is not available.
    Unavailable,
    /// Any other host failure.
    Internal,
}

impl fmt::Display for HostErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostErrorKind::NotFound => "not found",
            HostErrorKind::AccessDenied => "access denied",
            HostErrorKind::InvalidArgument => "invalid argument",
            HostErrorKind::Unavailable => "unavailable",
            HostErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// A failure reported by a host operation.
///
/// The bridge never inspects or rewrites these; they reach the sandboxed
/// caller unchanged inside [`BridgeError::HostOperation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct HostError {
    /// Failure category.
    pub kind: HostErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl HostError {
    /// Create a host error of the given kind.
    pub fn new(kind: HostErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`HostErrorKind::NotFound`] error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::NotFound, message)
    }

    /// Shorthand for a [`HostErrorKind::AccessDenied`] error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::AccessDenied, message)
    }

    /// Shorthand for a [`HostErrorKind::InvalidArgument`] error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::InvalidArgument, message)
    }

    /// Shorthand for a [`HostErrorKind::Unavailable`] error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Unavailable, message)
    }

    /// Shorthand for a [`HostErrorKind::Internal`] error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HostErrorKind::Internal, message)
    }
}

/// Result type returned by host operations.
pub type HostResult = Result<crate::Value, HostError>;

/// Errors surfaced to sandboxed callers and to the bootstrap routine.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A call named an operation that was never bound. This is a wiring bug
    /// in the capability code, not a runtime condition.
    #[error("unknown operation: {op}")]
    UnknownOperation {
        /// The operation name that was requested.
        op: String,
    },
    /// The host operation ran and reported failure.
    #[error("host operation {op} failed: {source}")]
    HostOperation {
        /// The operation that failed.
        op: String,
        /// The host's error, unchanged.
        #[source]
        source: HostError,
    },
    /// A capability rejected its arguments before reaching the host.
    #[error("malformed argument to {op}: {reason}")]
    MalformedArgument {
        /// The operation the arguments were meant for.
        op: String,
        /// Why the arguments were rejected.
        reason: String,
    },
    /// A capability binds an operation the host table does not provide.
    #[error("capability {capability} requires host operation {op}, which is not registered")]
    MissingHostOperation {
        /// Capability being installed.
        capability: String,
        /// The missing operation.
        op: String,
    },
    /// An operation was bound or called with the wrong calling convention.
    #[error("operation {op} is {actual}, expected {expected}")]
    ConventionMismatch {
        /// The operation involved.
        op: String,
        /// Convention the caller or binding asked for.
        expected: CallingConvention,
        /// Convention the operation actually has.
        actual: CallingConvention,
    },
    /// Two capability objects were installed under the same global name.
    #[error("global {name} is already defined")]
    DuplicateGlobal {
        /// The conflicting global name.
        name: String,
    },
}

impl BridgeError {
    /// The operation this error concerns, if any.
    pub fn op(&self) -> Option<&str> {
        match self {
            BridgeError::UnknownOperation { op }
            | BridgeError::HostOperation { op, .. }
            | BridgeError::MalformedArgument { op, .. }
            | BridgeError::MissingHostOperation { op, .. }
            | BridgeError::ConventionMismatch { op, .. } => Some(op),
            BridgeError::DuplicateGlobal { .. } => None,
        }
    }

    /// The host error carried by a [`BridgeError::HostOperation`].
    pub fn host_error(&self) -> Option<&HostError> {
        match self {
            BridgeError::HostOperation { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let err = HostError::not_found("secret API_KEY");
        assert_eq!(err.to_string(), "not found: secret API_KEY");
    }

    #[test]
    fn test_bridge_error_identifies_operation() {
        let err = BridgeError::HostOperation {
            op: "op_kv_get".to_string(),
            source: HostError::internal("disk full"),
        };
        assert_eq!(err.op(), Some("op_kv_get"));
        assert_eq!(
            err.host_error().map(|e| e.kind),
            Some(HostErrorKind::Internal)
        );
        assert_eq!(
            err.to_string(),
            "host operation op_kv_get failed: internal error: disk full"
        );
    }

    #[test]
    fn test_duplicate_global_has_no_operation() {
        let err = BridgeError::DuplicateGlobal {
            name: "KV".to_string(),
        };
        assert!(err.op().is_none());
        assert!(err.host_error().is_none());
    }
}

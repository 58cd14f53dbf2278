//! capbridge: capability-gated host operations for sandboxed code
//!
//! Code running in an isolated context reaches the host only through three
//! capability objects: `console`, `KV` and `Secrets`. Each method forwards
//! to a named host operation through the [`Dispatcher`], which refuses any
//! operation not bound at bootstrap.

mod binding;
mod bootstrap;
mod capability;
mod dispatcher;
mod error;
mod value;

pub mod host;

pub use binding::{CallingConvention, CapabilityDescriptor, OperationBinding};
pub use bootstrap::{Bootstrap, CapabilityObject, GlobalMap, GlobalScope, Globals};
pub use capability::{
    Console, DESCRIPTORS, Formatter, Kv, OutputRecord, PlainFormatter, SecretValue, Secrets,
    Severity,
};
pub use dispatcher::{CallEnvelope, Dispatcher, Invocation, PendingCall};
pub use error::{BridgeError, HostError, HostErrorKind, HostResult};
pub use value::Value;

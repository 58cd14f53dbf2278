//! Capability objects installed into the sandboxed context.
//!
//! Each capability wraps a shared [`Dispatcher`](crate::Dispatcher) and
//! exposes a curated method set. The descriptors here are the complete list
//! of host operations sandboxed code can reach.

mod console;
mod kv;
mod secrets;

pub use console::{Console, Formatter, OutputRecord, PlainFormatter, Severity};
pub use kv::Kv;
pub use secrets::{SecretValue, Secrets};

use crate::binding::CapabilityDescriptor;

/// Descriptors for every capability, in installation order.
pub const DESCRIPTORS: [CapabilityDescriptor; 3] =
    [Console::DESCRIPTOR, Kv::DESCRIPTOR, Secrets::DESCRIPTOR];

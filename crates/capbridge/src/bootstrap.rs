//! Context bootstrap.
//!
//! [`Bootstrap`] takes the host operation table, binds every capability
//! against it, and hands back the capability objects as [`Globals`]. The
//! caller then installs them into the sandboxed context explicitly through
//! a [`GlobalScope`]; nothing is attached to ambient global state.
//!
//! ```rust,ignore
//! let globals = Bootstrap::new(table).formatter(MyFormatter).build()?;
//! let mut scope = GlobalMap::new();
//! globals.install(&mut scope)?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::capability::{Console, DESCRIPTORS, Formatter, Kv, PlainFormatter, Secrets};
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::host::HostOpTable;

/// Builder for the capability objects of one sandboxed context.
pub struct Bootstrap {
    table: HostOpTable,
    formatter: Arc<dyn Formatter>,
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bootstrap")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl Bootstrap {
    /// Start from a host operation table. Console output is rendered with
    /// [`PlainFormatter`] unless another formatter is set.
    pub fn new(table: HostOpTable) -> Self {
        Self {
            table,
            formatter: Arc::new(PlainFormatter),
        }
    }

    /// Set the console formatter.
    pub fn formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    /// Set the console formatter from a shared handle.
    pub fn formatter_arc(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Bind all capabilities and construct them.
    ///
    /// Fails if the table lacks an operation a capability needs, or provides
    /// it with the wrong calling convention.
    pub fn build(self) -> Result<Globals, BridgeError> {
        let dispatcher = Arc::new(Dispatcher::bind(self.table, &DESCRIPTORS)?);
        tracing::info!(
            operations = dispatcher.bindings().count(),
            "capabilities bound"
        );
        Ok(Globals {
            console: Console::new(Arc::clone(&dispatcher), self.formatter),
            kv: Kv::new(Arc::clone(&dispatcher)),
            secrets: Secrets::new(Arc::clone(&dispatcher)),
            dispatcher,
        })
    }
}

/// The capability objects for one sandboxed context.
#[derive(Debug, Clone)]
pub struct Globals {
    /// The `console` global.
    pub console: Console,
    /// The `KV` global.
    pub kv: Kv,
    /// The `Secrets` global.
    pub secrets: Secrets,
    dispatcher: Arc<Dispatcher>,
}

impl Globals {
    /// The dispatcher shared by all capabilities.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Install one object per capability into `scope`, under the names
    /// `console`, `KV` and `Secrets`.
    pub fn install(self, scope: &mut impl GlobalScope) -> Result<(), BridgeError> {
        scope.define(Console::DESCRIPTOR.name, CapabilityObject::Console(self.console))?;
        scope.define(Kv::DESCRIPTOR.name, CapabilityObject::Kv(self.kv))?;
        scope.define(Secrets::DESCRIPTOR.name, CapabilityObject::Secrets(self.secrets))?;
        Ok(())
    }
}

/// A capability object as seen from the sandboxed context's namespace.
#[derive(Debug, Clone)]
pub enum CapabilityObject {
    /// `console`
    Console(Console),
    /// `KV`
    Kv(Kv),
    /// `Secrets`
    Secrets(Secrets),
}

impl CapabilityObject {
    /// Method names the object exposes.
    pub fn methods(&self) -> Vec<&'static str> {
        let descriptor = match self {
            CapabilityObject::Console(_) => Console::DESCRIPTOR,
            CapabilityObject::Kv(_) => Kv::DESCRIPTOR,
            CapabilityObject::Secrets(_) => Secrets::DESCRIPTOR,
        };
        descriptor.methods().collect()
    }
}

/// The global namespace of a sandboxed context.
pub trait GlobalScope {
    /// Define a global. Implementations must refuse to redefine a name.
    fn define(&mut self, name: &'static str, object: CapabilityObject) -> Result<(), BridgeError>;
}

/// A map-backed [`GlobalScope`].
#[derive(Debug, Clone, Default)]
pub struct GlobalMap {
    globals: BTreeMap<&'static str, CapabilityObject>,
}

impl GlobalMap {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a global by name.
    pub fn get(&self, name: &str) -> Option<&CapabilityObject> {
        self.globals.get(name)
    }

    /// Defined names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.globals.keys().copied()
    }
}

impl GlobalScope for GlobalMap {
    fn define(&mut self, name: &'static str, object: CapabilityObject) -> Result<(), BridgeError> {
        if self.globals.contains_key(name) {
            return Err(BridgeError::DuplicateGlobal {
                name: name.to_string(),
            });
        }
        self.globals.insert(name, object);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::{CaptureSink, MemoryKv, SecretStore, ops, standard_table};
    use crate::value::Value;

    fn table() -> HostOpTable {
        standard_table(
            Arc::new(MemoryKv::new()),
            Arc::new(SecretStore::new()),
            Arc::new(CaptureSink::new()),
        )
    }

    #[test]
    fn test_build_binds_all_operations() {
        let globals = Bootstrap::new(table()).build().unwrap();
        let bound: Vec<_> = globals.dispatcher().bindings().map(|(op, _)| op).collect();
        assert_eq!(
            bound,
            vec![
                ops::KV_DELETE,
                ops::KV_GET,
                ops::KV_PUT,
                ops::LOG_STDERR,
                ops::LOG_STDOUT,
                ops::SECRET_GET,
            ]
        );
    }

    #[test]
    fn test_build_fails_without_secret_op() {
        let mut table = HostOpTable::new();
        for op in [ops::LOG_STDOUT, ops::LOG_STDERR] {
            table.register_sync(op, |_| Ok(Value::Absent));
        }
        for op in [ops::KV_GET, ops::KV_PUT, ops::KV_DELETE] {
            table.register_async(op, |_| async { Ok(Value::Absent) });
        }

        let err = Bootstrap::new(table).build().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MissingHostOperation { ref capability, ref op }
                if capability == "Secrets" && op == ops::SECRET_GET
        ));
    }

    #[test]
    fn test_install_defines_three_globals() {
        let globals = Bootstrap::new(table()).build().unwrap();
        let mut scope = GlobalMap::new();
        globals.install(&mut scope).unwrap();

        assert_eq!(scope.names().collect::<Vec<_>>(), vec!["KV", "Secrets", "console"]);
        assert!(matches!(scope.get("KV"), Some(CapabilityObject::Kv(_))));
        assert_eq!(
            scope.get("console").unwrap().methods(),
            vec!["log", "info", "debug", "warn", "error"]
        );
        assert_eq!(scope.get("Secrets").unwrap().methods(), vec!["get"]);
    }

    #[test]
    fn test_shared_formatter_across_contexts() {
        struct Tagged;
        impl Formatter for Tagged {
            fn render(&self, args: &[Value]) -> String {
                format!("[ctx] {}", PlainFormatter.render(args))
            }
        }

        let formatter: Arc<dyn Formatter> = Arc::new(Tagged);
        let sinks = [Arc::new(CaptureSink::new()), Arc::new(CaptureSink::new())];
        for sink in &sinks {
            let table = standard_table(
                Arc::new(MemoryKv::new()),
                Arc::new(SecretStore::new()),
                sink.clone(),
            );
            let globals = Bootstrap::new(table)
                .formatter_arc(Arc::clone(&formatter))
                .build()
                .unwrap();
            globals.console.log(&[Value::text("hi")]).unwrap();
        }

        assert_eq!(sinks[0].stdout(), b"[ctx] hi");
        assert_eq!(sinks[1].stdout(), b"[ctx] hi");
        assert_eq!(Arc::strong_count(&formatter), 1);
    }

    #[test]
    fn test_install_twice_is_rejected() {
        let globals = Bootstrap::new(table()).build().unwrap();
        let mut scope = GlobalMap::new();
        globals.clone().install(&mut scope).unwrap();

        let err = globals.install(&mut scope).unwrap_err();
        assert!(matches!(err, BridgeError::DuplicateGlobal { ref name } if name == "console"));
    }
}

//! The `console` capability.
//!
//! Rendering is delegated to an injected [`Formatter`]. The capability only
//! encodes the rendered text and forwards it: `op_log_stdout` for normal
//! severity, `op_log_stderr` for error severity. One log call is one host
//! call; nothing is buffered.

use std::fmt;
use std::sync::Arc;

use crate::binding::{CapabilityDescriptor, OperationBinding};
use crate::dispatcher::Dispatcher;
use crate::error::BridgeError;
use crate::host::ops;
use crate::value::Value;

/// Severity of a console record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// `log`, `info` and `debug`.
    Normal,
    /// `warn` and `error`.
    Error,
}

impl Severity {
    /// Severity for the `isErrorSeverity` flag of the sink callback.
    pub fn from_is_error(is_error: bool) -> Self {
        if is_error {
            Severity::Error
        } else {
            Severity::Normal
        }
    }

    /// Returns true for [`Severity::Error`].
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Host operation records of this severity are routed to.
    pub fn op(self) -> &'static str {
        match self {
            Severity::Normal => ops::LOG_STDOUT,
            Severity::Error => ops::LOG_STDERR,
        }
    }
}

/// One rendered log message on its way out of the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Severity flag.
    pub severity: Severity,
    /// Rendered message, UTF-8 encoded.
    pub payload: Vec<u8>,
}

impl OutputRecord {
    /// Create a record.
    pub fn new(severity: Severity, payload: Vec<u8>) -> Self {
        Self { severity, payload }
    }

    /// Encode already-rendered text.
    pub fn encode(rendered: &str, severity: Severity) -> Self {
        Self::new(severity, rendered.as_bytes().to_vec())
    }
}

/// Turns console arguments into text.
pub trait Formatter: Send + Sync {
    /// Render the arguments of one console call.
    fn render(&self, args: &[Value]) -> String;
}

/// Default console formatter.
///
/// Arguments are joined with single spaces. A leading text argument may
/// contain `%s`, `%d`, `%i`, `%o`, `%O`, `%j`, `%c` and `%%`; each
/// directive consumes the next argument. `%c` prints nothing. Directives
/// with no argument left are printed as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFormatter;

impl Formatter for PlainFormatter {
    fn render(&self, args: &[Value]) -> String {
        let mut pieces = Vec::with_capacity(args.len());
        let mut rest = args.iter();

        if let Some(Value::Text(template)) = args.first()
            && template.contains('%')
        {
            rest.next();
            pieces.push(substitute(template, &mut rest));
        }

        pieces.extend(rest.map(ToString::to_string));
        pieces.join(" ")
    }
}

fn substitute<'a>(template: &str, args: &mut impl Iterator<Item = &'a Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(conv @ ('s' | 'd' | 'i' | 'o' | 'O' | 'j' | 'c')) => match args.next() {
                Some(value) => {
                    chars.next();
                    out.push_str(&directive(conv, value));
                }
                None => out.push('%'),
            },
            _ => out.push('%'),
        }
    }
    out
}

fn directive(conv: char, value: &Value) -> String {
    match conv {
        'd' | 'i' => {
            let n = match value {
                Value::Json(v) => v.as_f64(),
                Value::Text(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            match n {
                Some(n) if n.is_finite() => format!("{}", n.trunc()),
                _ => "NaN".to_string(),
            }
        }
        'o' | 'O' | 'j' => match value {
            Value::Text(s) => serde_json::to_string(s).unwrap_or_else(|_| s.clone()),
            other => other.to_string(),
        },
        // CSS styling, dropped
        'c' => String::new(),
        _ => match value {
            Value::Json(serde_json::Value::String(s)) => s.clone(),
            other => other.to_string(),
        },
    }
}

/// The `console` global.
#[derive(Clone)]
pub struct Console {
    dispatcher: Arc<Dispatcher>,
    formatter: Arc<dyn Formatter>,
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Console {
    /// Global name and method bindings.
    pub const DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor {
        name: "console",
        bindings: &[
            OperationBinding::sync("log", ops::LOG_STDOUT),
            OperationBinding::sync("info", ops::LOG_STDOUT),
            OperationBinding::sync("debug", ops::LOG_STDOUT),
            OperationBinding::sync("warn", ops::LOG_STDERR),
            OperationBinding::sync("error", ops::LOG_STDERR),
        ],
    };

    /// Create a console that renders with `formatter`.
    pub fn new(dispatcher: Arc<Dispatcher>, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            dispatcher,
            formatter,
        }
    }

    /// Sink callback: encode `rendered` and route it by severity.
    pub fn emit(&self, rendered: &str, is_error: bool) -> Result<(), BridgeError> {
        self.write(OutputRecord::encode(rendered, Severity::from_is_error(is_error)))
    }

    /// Forward one record to its host operation.
    pub fn write(&self, record: OutputRecord) -> Result<(), BridgeError> {
        let op = record.severity.op();
        self.dispatcher
            .call_sync(op, vec![Value::Bytes(record.payload)])
            .map(|_| ())
    }

    /// Render and print at the given severity.
    pub fn print(&self, severity: Severity, args: &[Value]) -> Result<(), BridgeError> {
        let rendered = self.formatter.render(args);
        self.emit(&rendered, severity.is_error())
    }

    /// `console.log`.
    pub fn log(&self, args: &[Value]) -> Result<(), BridgeError> {
        self.print(Severity::Normal, args)
    }

    /// `console.info`.
    pub fn info(&self, args: &[Value]) -> Result<(), BridgeError> {
        self.print(Severity::Normal, args)
    }

    /// `console.debug`.
    pub fn debug(&self, args: &[Value]) -> Result<(), BridgeError> {
        self.print(Severity::Normal, args)
    }

    /// `console.warn`.
    pub fn warn(&self, args: &[Value]) -> Result<(), BridgeError> {
        self.print(Severity::Error, args)
    }

    /// `console.error`.
    pub fn error(&self, args: &[Value]) -> Result<(), BridgeError> {
        self.print(Severity::Error, args)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::HostError;
    use crate::host::HostOpTable;

    type Calls = Arc<Mutex<Vec<(&'static str, Vec<Value>)>>>;

    fn recording_console() -> (Console, Calls) {
        let calls: Calls = Arc::default();
        let mut table = HostOpTable::new();
        for op in [ops::LOG_STDOUT, ops::LOG_STDERR] {
            let calls = Arc::clone(&calls);
            table.register_sync(op, move |args| {
                calls.lock().unwrap().push((op, args));
                Ok(Value::Absent)
            });
        }
        let dispatcher = Dispatcher::bind(table, &[Console::DESCRIPTOR]).unwrap();
        let console = Console::new(Arc::new(dispatcher), Arc::new(PlainFormatter));
        (console, calls)
    }

    #[test]
    fn test_log_routes_to_stdout() {
        let (console, calls) = recording_console();
        console.log(&[Value::text("hello")]).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ops::LOG_STDOUT);
        assert_eq!(calls[0].1, vec![Value::Bytes(b"hello".to_vec())]);
    }

    #[test]
    fn test_error_routes_to_stderr() {
        let (console, calls) = recording_console();
        console.error(&[Value::text("bad")]).unwrap();
        console.warn(&[Value::text("careful")]).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(op, _)| *op == ops::LOG_STDERR));
    }

    #[test]
    fn test_emit_is_one_call_per_record() {
        let (console, calls) = recording_console();
        console.emit("a", false).unwrap();
        console.emit("b", true).unwrap();
        console.emit("c", false).unwrap();

        let ops: Vec<_> = calls.lock().unwrap().iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, vec![ops::LOG_STDOUT, ops::LOG_STDERR, ops::LOG_STDOUT]);
    }

    #[test]
    fn test_info_and_debug_are_normal_severity() {
        let (console, calls) = recording_console();
        console.info(&[Value::text("i")]).unwrap();
        console.debug(&[Value::text("d")]).unwrap();

        let calls = calls.lock().unwrap();
        assert!(calls.iter().all(|(op, _)| *op == ops::LOG_STDOUT));
    }

    #[test]
    fn test_host_failure_propagates() {
        let mut table = HostOpTable::new();
        table.register_sync(ops::LOG_STDOUT, |_| Err(HostError::internal("pipe closed")));
        table.register_sync(ops::LOG_STDERR, |_| Ok(Value::Absent));
        let dispatcher = Dispatcher::bind(table, &[Console::DESCRIPTOR]).unwrap();
        let console = Console::new(Arc::new(dispatcher), Arc::new(PlainFormatter));

        let err = console.log(&[Value::text("x")]).unwrap_err();
        assert_eq!(err.op(), Some(ops::LOG_STDOUT));
        assert!(console.error(&[Value::text("x")]).is_ok());
    }

    #[test]
    fn test_custom_formatter_is_used() {
        struct Shouting;
        impl Formatter for Shouting {
            fn render(&self, args: &[Value]) -> String {
                args.iter()
                    .map(|v| v.to_string().to_uppercase())
                    .collect::<Vec<_>>()
                    .join("!")
            }
        }

        let calls: Calls = Arc::default();
        let mut table = HostOpTable::new();
        for op in [ops::LOG_STDOUT, ops::LOG_STDERR] {
            let calls = Arc::clone(&calls);
            table.register_sync(op, move |args| {
                calls.lock().unwrap().push((op, args));
                Ok(Value::Absent)
            });
        }
        let dispatcher = Dispatcher::bind(table, &[Console::DESCRIPTOR]).unwrap();
        let console = Console::new(Arc::new(dispatcher), Arc::new(Shouting));

        console.log(&[Value::text("a"), Value::text("b")]).unwrap();
        assert_eq!(
            calls.lock().unwrap()[0].1,
            vec![Value::Bytes(b"A!B".to_vec())]
        );
    }

    #[test]
    fn test_plain_formatter_joins_values() {
        let rendered = PlainFormatter.render(&[
            Value::text("count"),
            Value::Json(json!(3)),
            Value::Absent,
            Value::bytes(vec![9]),
        ]);
        assert_eq!(rendered, "count 3 undefined Uint8Array(1) [ 9 ]");
    }

    #[test]
    fn test_plain_formatter_substitutions() {
        let f = PlainFormatter;
        assert_eq!(
            f.render(&[
                Value::text("%s has %d items (%j)"),
                Value::text("cart"),
                Value::Json(json!(2.7)),
                Value::text("x"),
            ]),
            r#"cart has 2 items ("x")"#
        );
        assert_eq!(f.render(&[Value::text("100%%")]), "100%");
        assert_eq!(f.render(&[Value::text("%d"), Value::text("abc")]), "NaN");
        assert_eq!(
            f.render(&[Value::text("%s"), Value::text("a"), Value::text("b")]),
            "a b"
        );
    }

    #[test]
    fn test_plain_formatter_integer_directives() {
        let f = PlainFormatter;
        assert_eq!(
            f.render(&[Value::text("%d"), Value::Json(json!(1e20))]),
            "100000000000000000000"
        );
        assert_eq!(f.render(&[Value::text("%i"), Value::Json(json!(-3.9))]), "-3");
        assert_eq!(f.render(&[Value::text("%d"), Value::text(" 42 ")]), "42");
    }

    #[test]
    fn test_plain_formatter_string_and_style_directives() {
        let f = PlainFormatter;
        assert_eq!(f.render(&[Value::text("%s!"), Value::Json(json!("x"))]), "x!");
        assert_eq!(
            f.render(&[Value::text("%j"), Value::Json(json!("x"))]),
            r#""x""#
        );
        assert_eq!(
            f.render(&[Value::text("%cred"), Value::text("color: red")]),
            "red"
        );
        assert_eq!(
            f.render(&[
                Value::text("%c%s"),
                Value::text("font-weight: bold"),
                Value::text("b"),
            ]),
            "b"
        );
    }

    #[test]
    fn test_plain_formatter_missing_arguments() {
        let f = PlainFormatter;
        assert_eq!(f.render(&[Value::text("%s and %s"), Value::text("one")]), "one and %s");
        assert_eq!(f.render(&[Value::text("50% off")]), "50% off");
        assert_eq!(f.render(&[]), "");
    }

    #[test]
    fn test_severity_routing_table() {
        assert_eq!(Severity::from_is_error(false).op(), ops::LOG_STDOUT);
        assert_eq!(Severity::from_is_error(true).op(), ops::LOG_STDERR);
        assert!(Severity::Error.is_error());
    }
}

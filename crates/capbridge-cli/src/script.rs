//! Line-oriented capability scripts.
//!
//! Each line is one call: `<Global>.<method> [args...]`. Arguments are bare
//! words or JSON string literals (`"two words"`, `"tab\tseparated"`). Blank
//! lines and lines starting with `#` are skipped.

use std::io::Write;

use anyhow::{Context, Result, bail};
use capbridge::{CapabilityObject, GlobalMap, Value};

/// One parsed call.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Global object name, e.g. `KV`.
    pub global: String,
    /// Method name, e.g. `get`.
    pub method: String,
    /// Arguments, all text.
    pub args: Vec<Value>,
}

/// Parse one script line. Returns `None` for blank lines and comments.
pub fn parse_line(line: &str) -> Result<Option<Statement>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = tokenize(line)?.into_iter();
    let Some(target) = tokens.next() else {
        return Ok(None);
    };
    let Some((global, method)) = target.split_once('.') else {
        bail!("expected <Global>.<method>, got {target:?}");
    };
    if global.is_empty() || method.is_empty() {
        bail!("expected <Global>.<method>, got {target:?}");
    }

    Ok(Some(Statement {
        global: global.to_string(),
        method: method.to_string(),
        args: tokens.map(Value::Text).collect(),
    }))
}

fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut escaped = false;
            let mut end = None;
            for (i, c) in chars.by_ref() {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => {
                        end = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
            let end = end
                .with_context(|| format!("unterminated string starting at column {}", start + 1))?;
            let literal = &line[start..=end];
            let decoded: String = serde_json::from_str(literal)
                .with_context(|| format!("invalid string literal {literal}"))?;
            tokens.push(decoded);
        } else {
            let mut word = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                word.push(c);
                chars.next();
            }
            tokens.push(word);
        }
    }

    Ok(tokens)
}

/// Run one statement against the installed globals.
///
/// Results of lookups are written to `out`; console output goes through the
/// capability and reaches whatever sink the host wired up.
pub async fn run_statement(
    scope: &GlobalMap,
    stmt: &Statement,
    out: &mut impl Write,
) -> Result<()> {
    let Some(object) = scope.get(&stmt.global) else {
        bail!("{} is not defined", stmt.global);
    };
    if !object.methods().contains(&stmt.method.as_str()) {
        bail!("{}.{} is not a function", stmt.global, stmt.method);
    }

    match object {
        CapabilityObject::Console(console) => match stmt.method.as_str() {
            "log" => console.log(&stmt.args)?,
            "info" => console.info(&stmt.args)?,
            "debug" => console.debug(&stmt.args)?,
            "warn" => console.warn(&stmt.args)?,
            _ => console.error(&stmt.args)?,
        },
        CapabilityObject::Kv(kv) => match (stmt.method.as_str(), stmt.args.as_slice()) {
            ("get", [key]) => {
                let value = kv.get(key.clone()).await?;
                writeln!(out, "=> {}", value.unwrap_or_default())?;
            }
            ("put", [key, value]) => kv.put(key.clone(), value.clone()).await?,
            ("delete", [key]) => kv.delete(key.clone()).await?,
            ("put", _) => bail!("KV.put expects 2 arguments, got {}", stmt.args.len()),
            (method, _) => bail!("KV.{method} expects 1 argument, got {}", stmt.args.len()),
        },
        CapabilityObject::Secrets(secrets) => {
            let [key] = stmt.args.as_slice() else {
                bail!("Secrets.get expects 1 argument, got {}", stmt.args.len());
            };
            let secret = secrets.get(key.clone())?;
            let len = secret.expose().as_bytes().map_or(0, <[u8]>::len);
            writeln!(out, "=> <redacted, {len} bytes>")?;
        }
    }
    Ok(())
}

/// Run a whole script, stopping at the first failing line.
pub async fn run_script(scope: &GlobalMap, script: &str, out: &mut impl Write) -> Result<usize> {
    let mut executed = 0;
    for (index, line) in script.lines().enumerate() {
        let lineno = index + 1;
        let Some(stmt) = parse_line(line).with_context(|| format!("line {lineno}"))? else {
            continue;
        };
        tracing::debug!(
            line = lineno,
            global = %stmt.global,
            method = %stmt.method,
            "running statement"
        );
        run_statement(scope, &stmt, out)
            .await
            .with_context(|| format!("line {lineno}: {}.{}", stmt.global, stmt.method))?;
        executed += 1;
    }
    Ok(executed)
}

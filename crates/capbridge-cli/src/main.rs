//! capbridge CLI - Script harness for the capability bridge
//!
//! Usage:
//!   capbridge -c "console.log hello"     Run an inline script
//!   capbridge script.cb                  Run a script file
//!   capbridge                            Read the script from stdin
//!
//! `--config FILE` loads a JSON host configuration (worker identity,
//! secrets and initial KV contents).

mod script;

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use capbridge::host::{HostConfig, StdioSink, standard_table};
use capbridge::{Bootstrap, GlobalMap};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "capbridge")]
#[command(about = "Run capability scripts against the reference host")]
struct Args {
    /// Inline script to run
    #[arg(short = 'c', value_name = "SCRIPT", conflicts_with = "file")]
    command: Option<String>,

    /// Script file to run
    file: Option<PathBuf>,

    /// Host configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn read_script(args: &Args) -> anyhow::Result<String> {
    if let Some(command) = &args.command {
        return Ok(command.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path).with_context(|| format!("{}", path.display()));
    }
    let mut script = String::new();
    io::stdin()
        .read_to_string(&mut script)
        .context("failed to read stdin")?;
    Ok(script)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let script = read_script(&args)?;

    let config = match &args.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    tracing::debug!(
        worker = %config.worker.name,
        address = %config.worker.address,
        "starting host"
    );

    let table = standard_table(
        Arc::new(config.memory_kv()),
        Arc::new(config.secret_store()),
        Arc::new(StdioSink::new(config.worker.clone())),
    );
    let globals = Bootstrap::new(table)
        .build()
        .context("failed to bind capabilities")?;
    let mut scope = GlobalMap::new();
    globals.install(&mut scope)?;

    let executed = script::run_script(&scope, &script, &mut io::stdout()).await?;
    tracing::debug!(statements = executed, "script finished");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Diagnostics go to stderr so they never mix with script output
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("capbridge: {e:#}");
        std::process::exit(1);
    }
}

// crates/callgate-cli/src/main.rs
// ============================================================================
// Module: Callgate CLI Entry Point
// Description: Command dispatcher for the Callgate gateway.
// Purpose: Run the gateway over the loopback tool set and inspect its catalog.
// Dependencies: clap, callgate-config, callgate-core, callgate-gateway, tokio
// ============================================================================

//! ## Overview
//! The Callgate CLI runs a local gateway over the built-in loopback tool set
//! and prints the catalog for inspection. Embedding applications that bring
//! their own catalog and executor construct
//! [`callgate_gateway::GatewayServer`] directly instead.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod loopback;
#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use callgate_config::ConfigError;
use callgate_config::GatewayConfig;
use callgate_core::ToolCatalog;
use callgate_gateway::GatewayServer;
use callgate_gateway::GatewayServerError;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::json;

use crate::loopback::LoopbackExecutor;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Callgate command-line interface.
#[derive(Parser, Debug)]
#[command(name = "callgate", version, about = "Tool-invocation gateway")]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the gateway over the loopback tool set.
    Serve(ServeArgs),
    /// Print the loopback tool listing as JSON.
    Tools(ToolsArgs),
}

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
struct ServeArgs {
    /// Path to the gateway configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Arguments for the `tools` command.
#[derive(Args, Debug)]
struct ToolsArgs {
    /// Catalog context tag to list.
    #[arg(long, default_value = "default")]
    tag: String,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Tools(args) => run_tools(&args),
    }
}

/// Runs the gateway until its transport shuts down.
async fn run_serve(args: ServeArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    let catalog = loopback::catalog();
    let server = GatewayServer::from_config(
        config,
        &catalog,
        Arc::new(LoopbackExecutor),
        loopback::context(),
    )?;
    server.serve().await?;
    Ok(())
}

/// Prints the loopback tool listing as pretty JSON.
fn run_tools(args: &ToolsArgs) -> Result<(), CliError> {
    let listing: Vec<_> = loopback::catalog()
        .list_tools(&args.tag)
        .into_iter()
        .map(|definition| {
            json!({
                "name": definition.name,
                "description": definition.description,
                "inputSchema": definition.input_schema(),
            })
        })
        .collect();
    let rendered = serde_json::to_string_pretty(&listing)
        .map_err(|err| CliError::Output(err.to_string()))?;
    write_stdout_line(&rendered).map_err(|err| CliError::Output(err.to_string()))
}

/// Loads configuration, defaulting when no file was named and none exists.
///
/// An explicit `--config` path must load; with no path, a missing default
/// file falls back to the built-in pipe configuration while parse and
/// validation failures still abort.
fn load_config(path: Option<&Path>) -> Result<GatewayConfig, CliError> {
    match GatewayConfig::load(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(_)) if path.is_none() => Ok(GatewayConfig::default()),
        Err(err) => Err(CliError::Config(err)),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes one line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes one line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Reports an error and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI errors.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// Configuration loading or validation failed.
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// The gateway failed to start or serve.
    #[error("{0}")]
    Server(#[from] GatewayServerError),
    /// Writing command output failed.
    #[error("output error: {0}")]
    Output(String),
}

// crates/callgate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Unit Tests
// Description: Unit tests for config resolution and CLI parsing.
// Purpose: Validate CLI behavior without spawning a server.
// Dependencies: callgate-cli
// ============================================================================

//! ## Overview
//! Exercises config fallback rules and clap argument parsing.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use callgate_config::ServerTransport;
use clap::Parser;

use crate::Cli;
use crate::Command;
use crate::load_config;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn missing_default_config_falls_back_to_pipe() {
    let config = load_config(None).expect("default config");
    assert_eq!(config.server.transport, ServerTransport::Pipe);
}

#[test]
fn explicit_missing_config_path_fails() {
    let directory = tempfile::tempdir().expect("temp dir");
    let path = directory.path().join("absent.toml");
    assert!(load_config(Some(&path)).is_err());
}

#[test]
fn explicit_config_path_loads_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"[server]\ntransport = \"sse\"\nbind = \"127.0.0.1:9190\"\n")
        .expect("write config");
    let config = load_config(Some(file.path())).expect("sse config");
    assert_eq!(config.server.transport, ServerTransport::Sse);
}

#[test]
fn invalid_explicit_config_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"[server]\ntransport = \"sse\"\n").expect("write config");
    assert!(load_config(Some(file.path())).is_err());
}

#[test]
fn serve_command_parses_config_flag() {
    let cli = Cli::parse_from(["callgate", "serve", "--config", "gateway.toml"]);
    match cli.command {
        Command::Serve(args) => {
            assert_eq!(args.config.as_deref().map(|p| p.display().to_string()), Some("gateway.toml".to_string()));
        }
        Command::Tools(_) => panic!("expected serve command"),
    }
}

#[test]
fn tools_command_defaults_tag() {
    let cli = Cli::parse_from(["callgate", "tools"]);
    match cli.command {
        Command::Tools(args) => assert_eq!(args.tag, "default"),
        Command::Serve(_) => panic!("expected tools command"),
    }
}

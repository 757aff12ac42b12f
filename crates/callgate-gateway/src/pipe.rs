// crates/callgate-gateway/src/pipe.rs
// ============================================================================
// Module: Pipe Transport
// Description: Newline-delimited JSON-RPC frames over stdin/stdout.
// Purpose: Serve the single-stream pipe binding of the gateway.
// Dependencies: callgate-config, serde_json
// ============================================================================

//! ## Overview
//! The pipe transport binds one anonymous session to the process stdin and
//! stdout for the process lifetime. Frames are newline-delimited JSON; each
//! request is handled synchronously before the next one is read, so requests
//! on this transport can never be reordered. EOF on stdin ends the loop and
//! removes the singleton session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;

use callgate_config::ServerTransport;

use crate::rpc::JsonRpcResponse;
use crate::rpc::RequestScope;
use crate::rpc::handle_payload;
use crate::server::GatewayServerError;
use crate::server::GatewayState;

// ============================================================================
// SECTION: Serve Loop
// ============================================================================

/// Serves newline-delimited JSON-RPC frames over process stdin/stdout.
///
/// # Errors
///
/// Returns [`GatewayServerError`] when the pipe streams fail.
pub(crate) fn serve(state: &GatewayState) -> Result<(), GatewayServerError> {
    let reader = BufReader::new(std::io::stdin());
    let writer = std::io::stdout();
    serve_streams(state, reader, writer)
}

/// Serves the pipe protocol over arbitrary streams.
///
/// # Errors
///
/// Returns [`GatewayServerError`] when reading or writing a frame fails.
pub(crate) fn serve_streams(
    state: &GatewayState,
    mut reader: impl BufRead,
    mut writer: impl Write,
) -> Result<(), GatewayServerError> {
    let session = state.registry.create(ServerTransport::Pipe);
    let scope = RequestScope::pipe(session.id.clone());
    let result = request_loop(state, &scope, &mut reader, &mut writer);
    let _ = state.registry.remove(&session.id);
    result
}

/// Reads frames until EOF, answering each one in arrival order.
fn request_loop(
    state: &GatewayState,
    scope: &RequestScope,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
) -> Result<(), GatewayServerError> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|_| GatewayServerError::Transport("pipe read failed".to_string()))?;
        if bytes == 0 {
            return Ok(());
        }
        let frame = line.trim();
        if frame.is_empty() {
            continue;
        }
        let (_, response) = handle_payload(state, scope, frame.as_bytes());
        write_frame(writer, &response)?;
    }
}

/// Writes one newline-delimited response frame.
fn write_frame(
    writer: &mut impl Write,
    response: &JsonRpcResponse,
) -> Result<(), GatewayServerError> {
    let payload = serde_json::to_vec(response)
        .map_err(|_| GatewayServerError::Transport("pipe serialization failed".to_string()))?;
    writer
        .write_all(&payload)
        .and_then(|()| writer.write_all(b"\n"))
        .and_then(|()| writer.flush())
        .map_err(|_| GatewayServerError::Transport("pipe write failed".to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

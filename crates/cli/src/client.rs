// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket client for the resources service.

use crate::exit_error::ExitError;
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use wonder_wire::{read_message, write_message, Request, Response};

/// Default socket under the user state directory
/// (`~/.local/state/wonder/resources.sock`).
pub fn default_socket_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("wonder")
        .join("resources.sock")
}

/// Send one request and read one response. Connection failures are
/// network errors (exit code 2).
pub async fn request(socket: &Path, request: Request) -> Result<Response, ExitError> {
    let mut stream = UnixStream::connect(socket).await.map_err(|e| {
        ExitError::network(format!(
            "cannot reach resources service at {}: {e}",
            socket.display()
        ))
    })?;

    write_message(&mut stream, &request)
        .await
        .map_err(|e| ExitError::network(format!("send failed: {e}")))?;
    let response: Response = read_message(&mut stream)
        .await
        .map_err(|e| ExitError::network(format!("receive failed: {e}")))?;

    match response {
        Response::Error { message } => Err(ExitError::validation(message)),
        other => Ok(other),
    }
}

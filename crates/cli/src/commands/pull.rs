// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wonder pull`: fetch a deployed definition.

use crate::exit_error::ExitError;
use crate::{client, output};
use std::path::Path;
use wonder_core::DefId;
use wonder_wire::{Request, Response};

pub async fn run(
    socket: &Path,
    id: &str,
    version: Option<u32>,
    out: Option<&Path>,
) -> Result<(), ExitError> {
    let request = Request::Pull { id: DefId::from_string(id), version };
    match client::request(socket, request).await? {
        Response::Def { def } => {
            let pretty = serde_json::to_string_pretty(&def)
                .map_err(|e| ExitError::validation(e.to_string()))?;
            match out {
                Some(path) => {
                    std::fs::write(path, pretty).map_err(|e| {
                        ExitError::validation(format!("{}: {e}", path.display()))
                    })?;
                    output::ok(format!("wrote {}", path.display()));
                }
                None => output::line(pretty),
            }
            Ok(())
        }
        other => Err(ExitError::network(format!("unexpected response: {other:?}"))),
    }
}

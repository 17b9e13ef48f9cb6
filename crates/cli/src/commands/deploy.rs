// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wonder deploy`: publish a definition to the resources service.

use crate::exit_error::ExitError;
use crate::{client, defs, output};
use std::path::Path;
use wonder_wire::{Request, Response};

pub async fn run(socket: &Path, file: &Path) -> Result<(), ExitError> {
    let def = defs::load(file)?;
    def.validate()
        .map_err(|e| ExitError::validation(e.to_string()))?;

    match client::request(socket, Request::Deploy { def: Box::new(def) }).await? {
        Response::Deployed { id, version } => {
            output::ok(format!("deployed {id} v{version}"));
            Ok(())
        }
        other => Err(ExitError::network(format!("unexpected response: {other:?}"))),
    }
}

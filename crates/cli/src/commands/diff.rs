// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wonder diff`: compare a local definition against the deployed one.

use crate::exit_error::ExitError;
use crate::{client, defs, output};
use std::path::Path;
use wonder_wire::{Request, Response};

pub async fn run(socket: &Path, file: &Path) -> Result<(), ExitError> {
    let def = defs::load(file)?;

    match client::request(socket, Request::Diff { def: Box::new(def) }).await? {
        Response::Diff { entries } => {
            if entries.is_empty() {
                output::line("no differences");
            } else {
                for entry in entries {
                    match entry.detail {
                        Some(detail) => {
                            output::line(format!("{} {} ({detail})", entry.kind, entry.element))
                        }
                        None => output::line(format!("{} {}", entry.kind, entry.element)),
                    }
                }
            }
            Ok(())
        }
        other => Err(ExitError::network(format!("unexpected response: {other:?}"))),
    }
}

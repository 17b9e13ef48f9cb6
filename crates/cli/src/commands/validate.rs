// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wonder validate`: parse plus structural graph validation.

use crate::exit_error::ExitError;
use crate::{defs, output};
use std::path::PathBuf;

pub fn run(files: &[PathBuf]) -> Result<(), ExitError> {
    if files.is_empty() {
        return Err(ExitError::validation("no definition files given"));
    }
    let mut failures = Vec::new();
    for path in files {
        let def = match defs::load(path) {
            Ok(def) => def,
            Err(e) => {
                failures.push(e.message);
                continue;
            }
        };
        match def.validate() {
            Ok(()) => output::ok(path.display().to_string()),
            Err(e) => failures.push(format!("{}: {e}", path.display())),
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ExitError::validation(failures.join("\n")))
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wonder check`: parse definition files.

use crate::exit_error::ExitError;
use crate::{defs, output};
use std::path::PathBuf;

pub fn run(files: &[PathBuf]) -> Result<(), ExitError> {
    if files.is_empty() {
        return Err(ExitError::validation("no definition files given"));
    }
    let mut failures = Vec::new();
    for path in files {
        match defs::load(path) {
            Ok(def) => output::ok(format!(
                "{} ({} nodes, {} transitions)",
                path.display(),
                def.nodes.len(),
                def.transitions.len()
            )),
            Err(e) => failures.push(e.message),
        }
    }
    if failures.is_empty() {
        Ok(())
    } else {
        Err(ExitError::validation(failures.join("\n")))
    }
}

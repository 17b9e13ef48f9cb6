// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading workflow definition files.

use crate::exit_error::ExitError;
use std::path::Path;
use wonder_core::WorkflowDef;

/// Parse a definition file (JSON). Parse failures are validation errors.
pub fn load(path: &Path) -> Result<WorkflowDef, ExitError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ExitError::validation(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| ExitError::validation(format!("{}: {e}", path.display())))
}

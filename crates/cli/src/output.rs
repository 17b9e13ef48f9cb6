// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI output helpers. The only module that prints to stdout.

use serde_json::Value;

pub fn line(text: impl AsRef<str>) {
    println!("{}", text.as_ref());
}

pub fn json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{value}"),
    }
}

pub fn ok(text: impl AsRef<str>) {
    println!("ok: {}", text.as_ref());
}

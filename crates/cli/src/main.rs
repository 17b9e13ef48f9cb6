// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wonder: workflow authoring CLI.
//!
//! Local commands (`check`, `validate`, `run`, `test`) work on
//! definition files; catalog commands (`deploy`, `pull`, `diff`) talk to
//! a resources service over a Unix socket.

mod client;
mod commands;
mod defs;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wonder", version, about = "Wonder workflow authoring tool")]
struct Cli {
    /// Path to the resources service socket
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse workflow definition files
    Check {
        /// Definition files (JSON)
        files: Vec<PathBuf>,
    },

    /// Parse and structurally validate workflow definition files
    Validate {
        files: Vec<PathBuf>,
    },

    /// Execute a workflow locally with the mock executor
    Run {
        file: PathBuf,
        /// Workflow input as a JSON object
        #[arg(long, default_value = "{}")]
        input: String,
        /// Emit trace events to stderr
        #[arg(long)]
        trace: bool,
    },

    /// Run a workflow's test fixtures (`*.wtest.json`)
    Test {
        file: PathBuf,
    },

    /// Publish a definition to the resources service
    Deploy {
        file: PathBuf,
    },

    /// Fetch a deployed definition
    Pull {
        id: String,
        #[arg(long)]
        version: Option<u32>,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Compare a local definition against the deployed version
    Diff {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("WONDER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(client::default_socket_path);

    let result = match cli.command {
        Commands::Check { files } => commands::check::run(&files),
        Commands::Validate { files } => commands::validate::run(&files),
        Commands::Run { file, input, trace } => commands::run::run(&file, &input, trace).await,
        Commands::Test { file } => commands::test::run(&file).await,
        Commands::Deploy { file } => commands::deploy::run(&socket, &file).await,
        Commands::Pull { id, version, out } => {
            commands::pull::run(&socket, &id, version, out.as_deref()).await
        }
        Commands::Diff { file } => commands::diff::run(&socket, &file).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.code);
    }
}

//! Wordlens CLI - command-line client for a word-embedding service
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

use std::io::{self, Write as _};
use std::process::ExitCode;

use clap::Parser as _;
use cli::Cli;
use console::style;

mod cli;
mod handlers;
mod render;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    handlers::init_logging(cli.verbose);

    match handlers::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Nothing left to report to if stderr itself is gone.
            let _ignored = writeln!(io::stderr(), "{} {error:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

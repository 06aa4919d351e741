//! # ustcmirror
//!
//! Binary entry point: parses arguments with `clap`, runs the selected
//! command through `ustcmirror_core::Manager`, and maps failures to a
//! nonzero exit status.

mod cli;

use clap::Parser;
use log::error;
use std::process::ExitCode;
use ustcmirror_core::logging_status;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(code) => code,
        Err(err) => {
            // Config and logging failures happen before a logger exists.
            if logging_status().is_some() {
                error!("{err:#}");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

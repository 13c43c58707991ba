//! Curator CLI: collect search results and metadata from a data repository.

use clap::Parser;
use colored::Colorize;
use curator::engine::arg_parser::Cli;
use curator::engine::handle_run;
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    let started = Instant::now();
    let cli = Cli::parse();
    match handle_run(&cli) {
        Ok(()) => {
            log::debug!("Finished in {:?}", started.elapsed());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

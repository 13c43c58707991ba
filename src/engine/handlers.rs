//! CLI command handler: build options, wire the worker and observer, report the outcome.

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use std::path::Path;
use std::time::Duration;

use crate::Opts;
use crate::adapters::{self, REPOSITORIES};
use crate::engine::arg_parser::Cli;
use crate::engine::channel::{ProgressReporter, progress_channel};
use crate::engine::fetcher::FetchOptions;
use crate::engine::progress::{BarObserver, LogObserver, ProgressObserver};
use crate::engine::state::RunState;
use crate::engine::transport::HttpTransport;
use crate::pipeline::{JsonDirSink, OutputFormat, RunController, RunPhase, observe_until_done, spawn_run};
use crate::utils::config::PackagePaths;
use crate::utils::{apply_credential, apply_file_to_opts, load_credential, load_curator_toml, setup_logging};

/// Defaults, then `.curator.toml` in `dir`, then command-line flags.
fn setup_opts(cli: &Cli, dir: &Path) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_curator_toml(dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    cli.apply_to(&mut opts);
    opts
}

/// Run one collection from the command line. Ctrl+C stops the run before its next request.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    let opts = setup_opts(cli, &cwd);
    setup_logging(opts.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    if cli.list_repositories {
        for name in REPOSITORIES {
            println!("{name}");
        }
        return Ok(());
    }

    let repository = opts.repository.as_deref().ok_or_else(|| {
        anyhow!(
            "no repository given; pass one or set `repository` under [settings] in {}",
            PackagePaths::get().config_filename()
        )
    })?;
    let mut adapter = adapters::by_name(repository).ok_or_else(|| {
        anyhow!(
            "unknown repository '{repository}', expected one of: {}",
            REPOSITORIES.join(", ")
        )
    })?;
    let format: OutputFormat = opts.output_format.parse()?;

    let (sender, receiver) = progress_channel();
    let reporter = ProgressReporter::new(sender);
    let token = load_credential(opts.credentials.as_deref(), adapter.name(), &cwd, &reporter)?;
    apply_credential(adapter.as_mut(), token);

    let state = RunState::new();
    let handler_state = state.clone();
    ctrlc::set_handler(move || handler_state.request_stop()).context("set Ctrl+C handler")?;

    let sink_prefix = adapter.name().to_string();
    let mut controller = RunController::new(adapter, Box::new(HttpTransport::new()), reporter)
        .with_state(state)
        .with_terms(opts.terms.clone())
        .with_types(opts.types.clone())
        .with_output_format(format)
        .with_fetch_options(FetchOptions {
            max_rate_limit_retries: opts.max_rate_limit_retries,
            ..FetchOptions::default()
        });
    if opts.save {
        controller = controller.with_sink(Box::new(JsonDirSink::new(&opts.output_dir, sink_prefix)));
    }

    let handle = spawn_run(controller)?;
    let mut observer: Box<dyn ProgressObserver> = if opts.bars {
        Box::new(BarObserver::new())
    } else {
        Box::new(LogObserver)
    };
    observe_until_done(
        &receiver,
        observer.as_mut(),
        Duration::from_millis(opts.poll_interval_ms),
        &handle,
    );

    let report = handle.join()?;
    if report.phase == RunPhase::Terminated {
        warn!("Run cancelled by user; no output was written.");
    }
    Ok(())
}

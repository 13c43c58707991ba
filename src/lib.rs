//! Curator: paginated collection from heterogeneous data repositories, with metadata enrichment
//! and keyed merging.

pub mod adapters;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{CollectError, CollectResult};
pub use types::*;

use log::debug;

use crate::adapters::Adapter;
use crate::engine::channel::progress_channel;
use crate::engine::fetcher::FetchOptions;
use crate::engine::transport::Transport;
use crate::engine::ProgressReporter;
use crate::pipeline::{RunController, RunReport};

/// Result alias used by public curator API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: run `adapter` over the terms/types in `opts` on the current thread and
/// return the run report with every progress event it produced, in order.
///
/// No sink is attached; the merged tables are in [`RunReport::results`]. For a background
/// worker with a live observer, build a [`RunController`] and use
/// [`spawn_run`](crate::pipeline::spawn_run).
///
/// ```ignore
/// let adapter = curator::adapters::by_name("zenodo").unwrap();
/// let opts = Opts { terms: vec!["cats".into()], ..Default::default() };
/// let (report, events) = curator::collect(adapter, Box::new(HttpTransport::new()), &opts)?;
/// ```
pub fn collect(
    adapter: Box<dyn Adapter>,
    transport: Box<dyn Transport>,
    opts: &Opts,
) -> Result<(RunReport, Vec<ProgressEvent>)> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let (sender, receiver) = progress_channel();
    let mut controller = RunController::new(adapter, transport, ProgressReporter::new(sender))
        .with_terms(opts.terms.clone())
        .with_types(opts.types.clone())
        .with_fetch_options(FetchOptions {
            max_rate_limit_retries: opts.max_rate_limit_retries,
            ..FetchOptions::default()
        });
    let report = controller.run()?;
    Ok((report, receiver.drain()))
}

//! Run orchestration: query space → search → metadata → merge → persistence.
//!
//! ```text
//! Idle → Searching → (Resolving → Merging) → Persisting → Complete
//!   └──────────── any point, flag cleared ──────────────→ Terminated
//! ```
//!
//! Each phase owns its output until it hands it to the next one. The controller owns the run
//! flag and the progress sender for the duration of the run.

use log::{info, warn};
use std::cell::Cell;

use crate::adapters::Adapter;
use crate::engine::fetcher::{FetchOptions, PagedFetcher};
use crate::engine::merger::passthrough;
use crate::engine::metadata::MetadataResolver;
use crate::engine::query_space::QuerySpace;
use crate::engine::state::RunState;
use crate::engine::transport::{Clock, SystemClock, Transport};
use crate::engine::ProgressReporter;
use crate::pipeline::sink::{OutputFormat, PersistenceSink};
use crate::{CollectError, CollectResult, Query, ResultSet, ResultTable, TableKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Searching,
    Resolving,
    Merging,
    Persisting,
    Complete,
    Terminated,
}

/// Outcome of a run that did not fail.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// `Complete` or `Terminated`.
    pub phase: RunPhase,
    /// Final tables. `None` when the run was terminated.
    pub results: Option<ResultSet<TableKey>>,
    /// Whether the sink was invoked.
    pub saved: bool,
}

pub struct RunController {
    adapter: Box<dyn Adapter>,
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    sink: Option<Box<dyn PersistenceSink>>,
    reporter: ProgressReporter,
    state: RunState,
    options: FetchOptions,
    terms: Vec<String>,
    types: Vec<String>,
    format: OutputFormat,
    phase: Cell<RunPhase>,
}

impl RunController {
    pub fn new(adapter: Box<dyn Adapter>, transport: Box<dyn Transport>, reporter: ProgressReporter) -> Self {
        Self {
            adapter,
            transport,
            clock: Box::new(SystemClock),
            sink: None,
            reporter,
            state: RunState::new(),
            options: FetchOptions::default(),
            terms: Vec::new(),
            types: Vec::new(),
            format: OutputFormat::default(),
            phase: Cell::new(RunPhase::Idle),
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn PersistenceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Share an externally owned run flag (e.g. one a Ctrl+C handler clears).
    pub fn with_state(mut self, state: RunState) -> Self {
        self.state = state;
        self
    }

    pub fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_terms(mut self, terms: Vec<String>) -> Self {
        self.terms = terms;
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn phase(&self) -> RunPhase {
        self.phase.get()
    }

    /// Execute the run to a terminal state.
    ///
    /// Cancellation is not an error: it yields a `Terminated` report without touching the
    /// sink. Validation and runtime failures are reported on the progress channel and returned.
    pub fn run(&mut self) -> CollectResult<RunReport> {
        let name = self.adapter.display_name();
        self.reporter.message(format!("Running {name}..."));
        match self.execute() {
            Ok(report) => Ok(report),
            Err(CollectError::Cancelled) => {
                self.phase.set(RunPhase::Terminated);
                info!("{name} run stopped before completion");
                self.reporter.message("Run terminated by user.");
                Ok(RunReport {
                    phase: RunPhase::Terminated,
                    results: None,
                    saved: false,
                })
            }
            Err(err) if err.is_validation() => {
                self.reporter.message(format!("Invalid run configuration: {err}"));
                Err(err)
            }
            Err(err) => {
                self.reporter
                    .message(format!("An unexpected error has occurred: \n{err}"));
                Err(err)
            }
        }
    }

    fn execute(&mut self) -> CollectResult<RunReport> {
        let queries = QuerySpace::for_adapter(self.adapter.as_ref(), &self.terms, &self.types)?;
        let results = {
            let fetcher = PagedFetcher::new(
                self.transport.as_ref(),
                self.clock.as_ref(),
                &self.state,
                &self.reporter,
                &self.options,
            );
            self.phase.set(RunPhase::Searching);
            let search = self.search(&fetcher, &queries)?;
            self.enrich(&fetcher, search)?
        };

        info!("{} rows across {} tables", results.row_count(), results.len());
        let saved = self.persist(&results)?;
        self.phase.set(RunPhase::Complete);
        self.state.request_stop();
        self.reporter
            .message(format!("{} run complete.", self.adapter.display_name()));
        Ok(RunReport {
            phase: RunPhase::Complete,
            results: Some(results),
            saved,
        })
    }

    fn search(&self, fetcher: &PagedFetcher<'_>, queries: &QuerySpace) -> CollectResult<ResultSet<Query>> {
        let mut search = ResultSet::new();
        for query in queries.iter() {
            self.reporter.message(format!("Searching {query}."));
            let endpoint = self.adapter.search_endpoint(query)?;
            let table = fetcher.fetch(&endpoint, &query.to_string())?;
            info!("{query}: {} rows", table.len());
            self.reporter.message("Search completed.");
            search.insert(query.clone(), Some(table));
        }
        Ok(search)
    }

    /// Metadata + merge when the adapter has a metadata capability; search tables otherwise.
    fn enrich(&self, fetcher: &PagedFetcher<'_>, search: ResultSet<Query>) -> CollectResult<ResultSet<TableKey>> {
        let Some(source) = self.adapter.metadata() else {
            return Ok(passthrough(&search));
        };
        self.phase.set(RunPhase::Resolving);
        let metadata = match MetadataResolver::new(fetcher).resolve(source, &search) {
            Ok(metadata) => metadata,
            Err(CollectError::Capability(reason)) => {
                warn!("Metadata unavailable: {reason}");
                self.reporter
                    .message(format!("Metadata unavailable ({reason}), keeping search results only."));
                return Ok(passthrough(&search));
            }
            Err(err) => return Err(err),
        };
        self.phase.set(RunPhase::Merging);
        self.reporter.message("Merging search and metadata results.");
        source.merge_strategy().merge(&search, &metadata)
    }

    /// Hand non-empty results to the sink. Returns whether the sink was invoked.
    fn persist(&mut self, results: &ResultSet<TableKey>) -> CollectResult<bool> {
        if results.all_empty() {
            self.reporter.message("No results found, nothing to save.");
            return Ok(false);
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(false);
        };
        self.state.ensure_running()?;
        self.phase.set(RunPhase::Persisting);
        let tables: Vec<(String, &ResultTable)> = results
            .iter()
            .filter_map(|(key, table)| Some((key.file_stem(), table?)))
            .collect();
        self.reporter
            .message(format!("Saving output to {}", sink.describe()));
        sink.persist(&tables, self.format)?;
        self.reporter.message("Save complete.");
        Ok(true)
    }
}

//! Run pipeline: controller state machine, worker thread, persistence sinks.

pub mod controller;
pub mod sink;
pub mod worker;

pub use controller::{RunController, RunPhase, RunReport};
pub use sink::{JsonDirSink, MemorySink, OutputFormat, PersistedTable, PersistenceSink};
pub use worker::{RunHandle, observe_until_done, spawn_run};

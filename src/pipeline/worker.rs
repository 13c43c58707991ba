//! Collection worker thread and the observer loop that polls it.

use anyhow::{Context, Result, anyhow};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::engine::channel::ProgressReceiver;
use crate::engine::progress::{ProgressObserver, dispatch};
use crate::engine::state::RunState;
use crate::pipeline::controller::{RunController, RunReport};
use crate::CollectResult;
use crate::utils::config::PackagePaths;

/// A run executing on its own thread.
pub struct RunHandle {
    state: RunState,
    handle: JoinHandle<CollectResult<RunReport>>,
}

/// Move `controller` onto a named worker thread and start the run.
pub fn spawn_run(mut controller: RunController) -> Result<RunHandle> {
    let state = controller.state().clone();
    let handle = thread::Builder::new()
        .name(format!("{}-worker", PackagePaths::get().pkg_name()))
        .spawn(move || controller.run())
        .context("spawn collection worker")?;
    Ok(RunHandle { state, handle })
}

impl RunHandle {
    /// Run flag shared with the worker. Clearing it stops the run before the next request.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<RunReport> {
        let report = self
            .handle
            .join()
            .map_err(|_| anyhow!("collection worker thread panicked"))??;
        Ok(report)
    }
}

/// Poll `receiver` every `interval` and feed `observer` until the worker exits, then drain
/// whatever is left so the observer sees the terminal message.
pub fn observe_until_done(
    receiver: &ProgressReceiver,
    observer: &mut dyn ProgressObserver,
    interval: Duration,
    handle: &RunHandle,
) {
    loop {
        let finished = handle.is_finished();
        while let Some(event) = receiver.try_receive() {
            dispatch(&event, observer);
        }
        if finished {
            break;
        }
        thread::sleep(interval);
    }
    observer.finish();
}

//! Progress observers: turn the event stream into log lines or kdam bars.

use kdam::{Animation, Bar, BarExt};
use log::info;

use crate::{ProgressEvent, ProgressMode};

/// Consumer side of the progress channel. Any implementation can drive a UI, a log, or a
/// test harness.
pub trait ProgressObserver {
    fn on_message(&mut self, text: &str);
    fn on_progress(
        &mut self,
        current_ref: &str,
        mode: ProgressMode,
        completed: Option<usize>,
        total: Option<usize>,
    );
    /// Called once after the last event of a run.
    fn finish(&mut self) {}
}

/// Route one event to the matching observer callback.
pub fn dispatch(event: &ProgressEvent, observer: &mut dyn ProgressObserver) {
    match event {
        ProgressEvent::Message(text) => observer.on_message(text),
        ProgressEvent::Progress {
            current_ref,
            mode,
            completed,
            total,
        } => observer.on_progress(current_ref, *mode, *completed, *total),
    }
}

/// Messages at info, progress updates at debug.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ProgressObserver for LogObserver {
    fn on_message(&mut self, text: &str) {
        info!("{}", text);
    }

    fn on_progress(
        &mut self,
        current_ref: &str,
        _mode: ProgressMode,
        completed: Option<usize>,
        total: Option<usize>,
    ) {
        match (completed, total) {
            (Some(completed), Some(total)) => log::debug!("{current_ref} [{completed}/{total}]"),
            _ => log::debug!("{current_ref}"),
        }
    }
}

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

pub fn create_progress_bar(config: ProgressBarConfig) -> Bar {
    kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation
    )
}

/// Counter for unknown totals (shows count without percentage)
pub fn create_counter(desc: &'static str) -> Bar {
    kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " pages"
    )
}

/// Counter bar while paging through searches, `completed/total` bar while iterating a
/// known list. Switches bar whenever the mode flips. Messages go to the log.
#[derive(Default)]
pub struct BarObserver {
    bar: Option<(ProgressMode, Bar)>,
}

impl BarObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn close(&mut self) {
        if let Some((_, mut bar)) = self.bar.take() {
            let _ = bar.refresh();
            eprintln!();
        }
    }
}

impl ProgressObserver for BarObserver {
    fn on_message(&mut self, text: &str) {
        self.close();
        info!("{}", text);
    }

    fn on_progress(
        &mut self,
        current_ref: &str,
        mode: ProgressMode,
        completed: Option<usize>,
        total: Option<usize>,
    ) {
        if self.bar.as_ref().is_some_and(|(m, _)| *m != mode) {
            self.close();
        }
        let (_, bar) = self.bar.get_or_insert_with(|| {
            let bar = match mode {
                ProgressMode::Determinate => create_progress_bar(ProgressBarConfig::new(
                    total.unwrap_or(0),
                    "metadata",
                    Animation::Classic,
                )),
                ProgressMode::Indeterminate => create_counter("search"),
            };
            (mode, bar)
        });
        bar.set_description(current_ref);
        let _ = match mode {
            ProgressMode::Determinate => {
                if let Some(total) = total {
                    bar.total = total;
                }
                bar.update_to(completed.unwrap_or(0))
            }
            ProgressMode::Indeterminate => bar.update(1),
        };
    }

    fn finish(&mut self) {
        self.close();
    }
}

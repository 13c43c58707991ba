//! Progress transport between the collection worker and its observer.
//!
//! Unbounded FIFO: the producer never blocks, the consumer polls with [`ProgressReceiver::try_receive`]
//! on its own schedule. Events are delivered in the order they were sent.

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::debug;
use std::cell::Cell;

use crate::{CollectResult, ProgressEvent, ProgressMode};

/// Create a connected sender/receiver pair.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = unbounded();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Producer end. Sending never blocks and never fails: a dropped receiver discards events.
#[derive(Debug)]
pub struct ProgressSender {
    tx: Sender<ProgressEvent>,
}

impl ProgressSender {
    pub fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Consumer end.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Next event if one is queued.
    pub fn try_receive(&self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// Every event queued right now, in order.
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.rx.try_iter().collect()
    }
}

/// Worker-side reporter: free-text messages plus page/progress updates.
///
/// Tracks the `(completed, total)` pair of the bounded iteration in progress, `None` while
/// the current work has no known size. Page updates inherit whichever mode is active.
#[derive(Debug)]
pub struct ProgressReporter {
    sender: ProgressSender,
    counts: Cell<Option<(usize, usize)>>,
}

impl ProgressReporter {
    pub fn new(sender: ProgressSender) -> Self {
        Self {
            sender,
            counts: Cell::new(None),
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        let text = text.into();
        debug!("{}", text);
        self.sender.send(ProgressEvent::Message(text));
    }

    /// Current `(completed, total)`, `None` while indeterminate.
    pub fn counts(&self) -> Option<(usize, usize)> {
        self.counts.get()
    }

    /// Report the unit currently being fetched (e.g. `"cats page 3"`).
    pub fn page(&self, current_ref: impl Into<String>) {
        let event = match self.counts.get() {
            Some((completed, total)) => ProgressEvent::Progress {
                current_ref: current_ref.into(),
                mode: ProgressMode::Determinate,
                completed: Some(completed),
                total: Some(total),
            },
            None => ProgressEvent::Progress {
                current_ref: current_ref.into(),
                mode: ProgressMode::Indeterminate,
                completed: None,
                total: None,
            },
        };
        self.sender.send(event);
    }

    /// Run `f` over a list of known length, reporting `completed/total` before each item and
    /// once more after the last. Returns to indeterminate mode afterwards, also on error.
    pub fn determinate<T, L, F>(&self, items: &[T], label: L, mut f: F) -> CollectResult<()>
    where
        L: Fn(&T) -> String,
        F: FnMut(&T) -> CollectResult<()>,
    {
        let total = items.len();
        let previous = self.counts.replace(Some((0, total)));
        let result = items.iter().enumerate().try_for_each(|(completed, item)| {
            self.counts.set(Some((completed, total)));
            self.page(label(item));
            f(item)
        });
        if result.is_ok()
            && let Some(last) = items.last()
        {
            self.counts.set(Some((total, total)));
            self.page(label(last));
        }
        self.counts.set(previous);
        result
    }
}

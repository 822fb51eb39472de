//! Transfer progress reporting.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Integer percentage of `loaded` over `total`, rounded to nearest.
///
/// An empty transfer counts as complete.
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let loaded = u128::from(loaded.min(total));
    let total = u128::from(total);
    ((loaded * 200 + total) / (total * 2)) as u8
}

/// Receiving side of an upload's progress updates.
///
/// Values are non-decreasing, each is reported once, and a successful
/// transfer always ends with 100. The stream closes when the upload
/// finishes either way.
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<u8>,
}

impl ProgressStream {
    pub async fn next(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    /// Drain everything already reported without waiting.
    pub fn drain(&mut self) -> Vec<u8> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }
}

#[derive(Debug)]
struct ReporterState {
    total: u64,
    loaded: u64,
    last: Option<u8>,
    tx: Option<mpsc::UnboundedSender<u8>>,
}

/// Sending side, shared between the body stream and the orchestrator.
#[derive(Debug, Clone)]
pub(crate) struct ProgressReporter {
    state: Arc<Mutex<ReporterState>>,
}

impl ProgressReporter {
    pub(crate) fn channel(total: u64) -> (Self, ProgressStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_sender(total, Some(tx)), ProgressStream { rx })
    }

    /// Reporter that tracks progress without publishing it.
    pub(crate) fn silent(total: u64) -> Self {
        Self::with_sender(total, None)
    }

    fn with_sender(total: u64, tx: Option<mpsc::UnboundedSender<u8>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReporterState {
                total,
                loaded: 0,
                last: None,
                tx,
            })),
        }
    }

    pub(crate) fn advance(&self, bytes: u64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.loaded = state.loaded.saturating_add(bytes).min(state.total);
        let value = percent(state.loaded, state.total);
        emit(&mut state, value);
    }

    pub(crate) fn finish(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.loaded = state.total;
        emit(&mut state, 100);
    }

    #[cfg(test)]
    pub(crate) fn last(&self) -> Option<u8> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last
    }
}

fn emit(state: &mut ReporterState, value: u8) {
    if state.last.is_some_and(|last| value <= last) {
        return;
    }
    state.last = Some(value);
    if let Some(tx) = &state.tx {
        // Receiver gone means nobody is watching; keep tracking anyway.
        let _ = tx.send(value);
    }
}

//! Controller layer: UI events, operation workflows, and command orchestration.

pub mod detail;
pub mod events;
pub mod orchestration;
pub mod summary;

use std::sync::{Mutex, MutexGuard};

use crossbeam_channel::Sender;
use tracing::debug;

use crate::controller::events::UiEvent;

fn emit(ui_tx: &Sender<UiEvent>, event: UiEvent) {
    if ui_tx.send(event).is_err() {
        debug!("ui event dropped; ui thread has shut down");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

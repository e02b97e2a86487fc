//! "Inspect one log" workflow behind the summary table's sync action.
//!
//! Repeated opens follow a latest-wins policy: each open takes a new
//! generation and cancels the request it supersedes. Results from an older
//! generation are dropped here and again by the renderer.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use crossbeam_channel::Sender;
use lila_client::{CancelToken, LilaClient, RemoteCall};
use lila_shared::domain::{LogPath, PackageId};
use tracing::{debug, info, warn};

use crate::controller::{
    emit,
    events::{UiError, UiErrorContext, UiEvent},
    lock,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub log_path: LogPath,
    pub package: PackageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    Loaded { rows: usize },
    /// A newer open or a close happened first; the result was dropped.
    Superseded,
    Cancelled,
    Failed,
}

/// An inspection that has been announced to the UI but not yet sent.
#[derive(Debug)]
pub struct DetailTicket {
    generation: u64,
    request: DetailRequest,
    cancel: CancelToken,
}

impl DetailTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct DetailModalController<G: RemoteCall> {
    client: Arc<LilaClient<G>>,
    ui_tx: Sender<UiEvent>,
    generation: AtomicU64,
    in_flight: Mutex<Option<(u64, CancelToken)>>,
}

impl<G: RemoteCall> DetailModalController<G> {
    pub fn new(client: Arc<LilaClient<G>>, ui_tx: Sender<UiEvent>) -> Self {
        Self {
            client,
            ui_tx,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Starts an inspection and returns once `DetailOpened` is emitted.
    /// Generation allocation, superseding and the emit happen under one lock,
    /// so callers that start in order see generations and events in order.
    pub fn start(&self, request: DetailRequest) -> DetailTicket {
        let cancel = CancelToken::new();
        let mut in_flight = lock(&self.in_flight);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((previous, token)) = in_flight.replace((generation, cancel.clone())) {
            debug!(previous, generation, "superseding in-flight log inspection");
            token.cancel();
        }

        info!(log = %request.log_path, package = %request.package, generation, "inspecting testlog");
        emit(
            &self.ui_tx,
            UiEvent::DetailOpened {
                generation,
                request: request.clone(),
            },
        );
        DetailTicket {
            generation,
            request,
            cancel,
        }
    }

    pub async fn finish(&self, ticket: DetailTicket) -> DetailOutcome {
        let DetailTicket {
            generation,
            request,
            cancel,
        } = ticket;
        let result = self
            .client
            .check_testlog(request.log_path, request.package, &cancel)
            .await;

        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight.as_ref().is_some_and(|(current, _)| *current == generation) {
                *in_flight = None;
            }
        }

        if !self.is_current(generation) {
            debug!(generation, "dropping result of superseded log inspection");
            return DetailOutcome::Superseded;
        }

        match result {
            Ok(warnings) => {
                let rows = warnings.warnings.as_ref().map_or(0, Vec::len);
                emit(&self.ui_tx, UiEvent::DetailLoaded { generation, warnings });
                DetailOutcome::Loaded { rows }
            }
            Err(err) if err.is_cancelled() => DetailOutcome::Cancelled,
            Err(err) => {
                warn!(generation, "log inspection failed: {err}");
                emit(
                    &self.ui_tx,
                    UiEvent::DetailFailed {
                        generation,
                        error: UiError::from_gateway(UiErrorContext::LogInspection, &err),
                    },
                );
                DetailOutcome::Failed
            }
        }
    }

    pub async fn open(&self, request: DetailRequest) -> DetailOutcome {
        let ticket = self.start(request);
        self.finish(ticket).await
    }

    /// Dismissal: cancels the in-flight request and retires its generation.
    pub fn close(&self) {
        let mut in_flight = lock(&self.in_flight);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some((generation, token)) = in_flight.take() {
            debug!(generation, "log inspection closed before completion");
            token.cancel();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

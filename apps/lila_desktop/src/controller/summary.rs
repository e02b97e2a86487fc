//! "Check workspace" workflow: page load, workspace switching, and the
//! busy-guarded summary scan with live progress.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crossbeam_channel::Sender;
use lila_client::{CancelToken, LilaClient, Localizer, ProgressHub, RemoteCall};
use lila_shared::domain::{Language, WorkspaceName};
use tracing::{debug, info, warn};

use crate::controller::{
    emit,
    events::{UiError, UiErrorContext, UiEvent},
    lock,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed,
    /// Another scan was already running; nothing was invoked.
    Ignored,
    Cancelled,
    Failed,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct WorkspaceSummaryController<G: RemoteCall> {
    client: Arc<LilaClient<G>>,
    progress: Arc<ProgressHub>,
    localizer: Arc<Localizer>,
    ui_tx: Sender<UiEvent>,
    busy: AtomicBool,
    in_flight: Mutex<Option<CancelToken>>,
}

impl<G: RemoteCall> WorkspaceSummaryController<G> {
    pub fn new(
        client: Arc<LilaClient<G>>,
        progress: Arc<ProgressHub>,
        localizer: Arc<Localizer>,
        ui_tx: Sender<UiEvent>,
    ) -> Self {
        Self {
            client,
            progress,
            localizer,
            ui_tx,
            busy: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// First paint: translations, backend notices, package sync, then the
    /// cached (non-forced) summary.
    pub async fn page_load(&self) -> ScanOutcome {
        match self.localizer.dictionary(&self.client).await {
            Ok(dictionary) => emit(&self.ui_tx, UiEvent::Translations(dictionary)),
            Err(err) => emit(
                &self.ui_tx,
                UiEvent::Error(UiError::from_gateway(UiErrorContext::PageLoad, &err)),
            ),
        }

        match self.client.messages(&CancelToken::new()).await {
            Ok(payload) => {
                if let Some(text) = payload.notification.filter(|t| !t.trim().is_empty()) {
                    emit(&self.ui_tx, UiEvent::Notification(text));
                }
            }
            Err(err) => {
                warn!("failed to fetch backend messages: {err}");
                emit(
                    &self.ui_tx,
                    UiEvent::Error(UiError::from_gateway(UiErrorContext::PageLoad, &err)),
                );
            }
        }

        self.client.sync_package_data();
        let outcome = self.run_scan(false).await;
        emit(&self.ui_tx, UiEvent::PageReady);
        outcome
    }

    pub fn change_workspace(&self, name: WorkspaceName) {
        info!(workspace = %name, "workspace selection changed");
        self.client.update_workspace(name);
        emit(&self.ui_tx, UiEvent::WorkspaceOutdated);
    }

    pub async fn check(&self) -> ScanOutcome {
        self.run_scan(true).await
    }

    /// Returns `false` when no scan is running.
    pub fn cancel_check(&self) -> bool {
        match lock(&self.in_flight).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn change_language(&self, language: Language) -> ScanOutcome {
        if let Err(err) = self
            .client
            .change_language(language.label(), &CancelToken::new())
            .await
        {
            warn!("failed to change language: {err}");
            emit(
                &self.ui_tx,
                UiEvent::Error(UiError::from_gateway(UiErrorContext::Language, &err)),
            );
            return ScanOutcome::Failed;
        }

        info!(language = language.label(), "language changed; reloading page");
        self.localizer.reset().await;
        emit(&self.ui_tx, UiEvent::Reloading);
        self.page_load().await
    }

    async fn run_scan(&self, force: bool) -> ScanOutcome {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            debug!(force, "ignoring workspace check while another is running");
            return ScanOutcome::Ignored;
        };

        emit(&self.ui_tx, UiEvent::CheckStarted);
        let cancel = CancelToken::new();
        *lock(&self.in_flight) = Some(cancel.clone());
        let mut progress = self.progress.register("get_workspace_summary");

        let result = {
            let call = self.client.workspace_summary(force, &cancel);
            tokio::pin!(call);
            loop {
                tokio::select! {
                    biased;
                    Some(update) = progress.recv() => emit(&self.ui_tx, UiEvent::Progress(update)),
                    result = &mut call => break result,
                }
            }
        };
        while let Some(update) = progress.try_recv() {
            emit(&self.ui_tx, UiEvent::Progress(update));
        }
        drop(progress);
        lock(&self.in_flight).take();

        let outcome = match result {
            Ok(summary) => {
                info!(force, "workspace summary loaded");
                emit(&self.ui_tx, UiEvent::SummaryLoaded(summary));
                ScanOutcome::Completed
            }
            Err(err) if err.is_cancelled() => {
                info!("workspace check cancelled");
                emit(&self.ui_tx, UiEvent::Info("Workspace check cancelled".to_string()));
                ScanOutcome::Cancelled
            }
            Err(err) => {
                warn!(force, "workspace check failed: {err}");
                let context = if force {
                    UiErrorContext::WorkspaceCheck
                } else {
                    UiErrorContext::PageLoad
                };
                emit(&self.ui_tx, UiEvent::Error(UiError::from_gateway(context, &err)));
                ScanOutcome::Failed
            }
        };
        emit(&self.ui_tx, UiEvent::CheckFinished);
        outcome
    }
}

//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender};
use lila_client::{BridgeTransport, CancelToken, LilaClient, Localizer, ProgressHub, RemoteCall};
use lila_shared::domain::FileKind;

use crate::backend_bridge::commands::BackendCommand;
use crate::config::Settings;
use crate::controller::{
    detail::{DetailModalController, DetailRequest},
    events::{classify_startup_failure, UiError, UiErrorContext, UiEvent},
    summary::WorkspaceSummaryController,
};

struct Workers<G: RemoteCall> {
    client: Arc<LilaClient<G>>,
    summary: Arc<WorkspaceSummaryController<G>>,
    detail: Arc<DetailModalController<G>>,
    ui_tx: Sender<UiEvent>,
}

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: Settings) {
    thread::spawn(move || {
        let _ = ui_tx.send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let message = format!("failed to build backend runtime: {err}");
                tracing::error!("{message}");
                let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BridgeStartup,
                    classify_startup_failure(&message),
                )));
                return;
            }
        };

        runtime.block_on(async move {
            let progress = ProgressHub::new();
            let transport =
                match BridgeTransport::connect(&settings.backend_url, Arc::clone(&progress)).await {
                    Ok(transport) => transport,
                    Err(err) => {
                        let message = format!("{err:#}");
                        tracing::error!("backend bridge startup failed: {message}");
                        let _ = ui_tx.send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::BridgeStartup,
                            classify_startup_failure(&message),
                        )));
                        return;
                    }
                };

            let client =
                Arc::new(LilaClient::new(transport).with_timeout(settings.operation_timeout()));
            let workers = Workers {
                summary: Arc::new(WorkspaceSummaryController::new(
                    Arc::clone(&client),
                    progress,
                    Arc::new(Localizer::new()),
                    ui_tx.clone(),
                )),
                detail: Arc::new(DetailModalController::new(
                    Arc::clone(&client),
                    ui_tx.clone(),
                )),
                client,
                ui_tx: ui_tx.clone(),
            };
            let _ = ui_tx.send(UiEvent::BridgeReady);

            let summary = Arc::clone(&workers.summary);
            tokio::spawn(async move {
                summary.page_load().await;
            });

            while let Ok(cmd) = cmd_rx.recv() {
                workers.handle(cmd);
            }
            tracing::info!("ui command queue closed; stopping backend worker");
        });
    });
}

impl<G: RemoteCall + 'static> Workers<G> {
    fn handle(&self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::ChangeWorkspace { name } => self.summary.change_workspace(name),
            BackendCommand::CheckWorkspace => {
                let summary = Arc::clone(&self.summary);
                tokio::spawn(async move {
                    summary.check().await;
                });
            }
            BackendCommand::CancelCheck => {
                if !self.summary.cancel_check() {
                    tracing::debug!("no workspace check to cancel");
                }
            }
            BackendCommand::InspectLog { log_path, package } => {
                // Started on the command loop so generations follow click order.
                let ticket = self.detail.start(DetailRequest { log_path, package });
                tracing::debug!(generation = ticket.generation(), "log inspection started");
                let detail = Arc::clone(&self.detail);
                tokio::spawn(async move {
                    detail.finish(ticket).await;
                });
            }
            BackendCommand::CloseInspection => self.detail.close(),
            BackendCommand::ChangeLanguage { language } => {
                let summary = Arc::clone(&self.summary);
                tokio::spawn(async move {
                    summary.change_language(language).await;
                });
            }
            BackendCommand::SelectFolder => self.spawn_picker(None),
            BackendCommand::SelectFile { kind } => self.spawn_picker(Some(kind)),
        }
    }

    fn spawn_picker(&self, kind: Option<FileKind>) {
        let client = Arc::clone(&self.client);
        let ui_tx = self.ui_tx.clone();
        tokio::spawn(async move {
            let cancel = CancelToken::new();
            let picked = match kind {
                Some(kind) => client.select_file(kind, &cancel).await,
                None => client.select_folder(&cancel).await,
            };
            let event = match picked {
                Ok(path) => UiEvent::PathSelected(path),
                Err(err) => UiEvent::Error(UiError::from_gateway(UiErrorContext::General, &err)),
            };
            let _ = ui_tx.send(event);
        });
    }
}

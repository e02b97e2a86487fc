use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender};
use lila_client::Dictionary;
use lila_shared::{
    domain::{FileKind, Language, WorkspaceName},
    protocol::{CellStatus, TableCell},
};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{
        events::{UiErrorCategory, UiErrorContext, UiEvent},
        orchestration::dispatch_backend_command,
    },
    ui::{
        render,
        state::{DetailModalView, SummaryView, TableView},
    },
};

fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Backend => "Backend",
        UiErrorCategory::Decode => "Decode",
        UiErrorCategory::Cancelled => "Cancelled",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

fn cell_color(status: CellStatus) -> egui::Color32 {
    match status {
        CellStatus::Ok => egui::Color32::from_rgb(67, 160, 71),
        CellStatus::Ng => egui::Color32::from_rgb(229, 57, 53),
        CellStatus::Nc => egui::Color32::from_rgb(251, 140, 0),
    }
}

fn show_cell(ui: &mut egui::Ui, cell: Option<&TableCell>) {
    match cell {
        Some(TableCell {
            text,
            status: Some(status),
        }) => {
            ui.colored_label(cell_color(*status), text);
        }
        Some(cell) => {
            ui.label(&cell.text);
        }
        None => {
            ui.label("");
        }
    }
}

/// Things the user did this frame; applied after the panels are drawn.
#[derive(Debug)]
enum UiAction {
    SelectWorkspace(WorkspaceName),
    Check,
    CancelCheck,
    ToggleRow(usize),
    InspectRow(usize),
    CloseModal,
    ChangeLanguage(Language),
    SelectFolder,
    SelectFile(FileKind),
    DismissBanner,
}

pub struct LilaApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    dictionary: Arc<Dictionary>,
    summary: SummaryView,
    modal: DetailModalView,
    bridge_ready: bool,
    status: String,
    status_banner: Option<String>,
}

impl LilaApp {
    pub fn bootstrap(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            dictionary: Arc::new(Dictionary::default()),
            summary: SummaryView::default(),
            modal: DetailModalView::default(),
            bridge_ready: false,
            status: "Starting...".to_string(),
            status_banner: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => {
                self.status = message;
            }
            UiEvent::BridgeReady => {
                self.bridge_ready = true;
                self.status = "Connected to backend".to_string();
                self.status_banner = None;
            }
            UiEvent::Translations(dictionary) => {
                self.dictionary = dictionary;
            }
            UiEvent::Notification(text) => {
                self.summary.notification = Some(text);
            }
            UiEvent::PageReady => {
                self.summary.preloader = false;
            }
            UiEvent::Reloading => {
                self.summary = SummaryView::default();
                self.modal = DetailModalView::default();
                self.dictionary = Arc::new(Dictionary::default());
                self.status = "Reloading...".to_string();
            }
            UiEvent::WorkspaceOutdated => render::mark_outdated(&mut self.summary),
            UiEvent::CheckStarted => render::begin_check(&mut self.summary),
            UiEvent::Progress(update) => render::apply_progress(&mut self.summary, update),
            UiEvent::SummaryLoaded(result) => {
                render::apply_summary(&mut self.summary, result);
                self.status = "Workspace summary updated".to_string();
            }
            UiEvent::CheckFinished => render::finish_check(&mut self.summary),
            UiEvent::DetailOpened {
                generation,
                request,
            } => render::open_detail(&mut self.modal, generation, request),
            UiEvent::DetailLoaded {
                generation,
                warnings,
            } => {
                if !render::load_detail(&mut self.modal, generation, warnings) {
                    tracing::debug!(generation, "ignored stale log inspection result");
                }
            }
            UiEvent::DetailFailed { generation, error } => {
                let message = error.message().to_string();
                if render::fail_detail(&mut self.modal, generation, message) {
                    self.status =
                        format!("{} error: {}", err_label(error.category()), error.message());
                }
            }
            UiEvent::PathSelected(path) => {
                self.status = match &path {
                    Some(path) => format!("Selected {}", path.display()),
                    None => "Selection cancelled".to_string(),
                };
                self.summary.selected_path = path;
            }
            UiEvent::Error(err) => {
                self.status = format!("{} error: {}", err_label(err.category()), err.message());
                if err.context() == UiErrorContext::BridgeStartup {
                    // Queued commands will never be answered.
                    self.bridge_ready = false;
                    self.summary.preloader = false;
                    render::finish_check(&mut self.summary);
                }
                if matches!(
                    err.context(),
                    UiErrorContext::BridgeStartup
                        | UiErrorContext::PageLoad
                        | UiErrorContext::WorkspaceCheck
                        | UiErrorContext::Language
                ) {
                    self.status_banner = Some(self.status.clone());
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) -> bool {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status)
    }

    fn perform(&mut self, action: UiAction) {
        match action {
            UiAction::SelectWorkspace(name) => {
                if render::select_workspace(&mut self.summary, name.clone()) {
                    self.dispatch(BackendCommand::ChangeWorkspace { name });
                }
            }
            UiAction::Check => {
                if self.summary.check_enabled && self.dispatch(BackendCommand::CheckWorkspace) {
                    render::begin_check(&mut self.summary);
                }
            }
            UiAction::CancelCheck => {
                self.dispatch(BackendCommand::CancelCheck);
            }
            UiAction::ToggleRow(row) => {
                if let Some(table) = self.summary.table.as_mut() {
                    table.toggle_row(row);
                }
            }
            UiAction::InspectRow(row) => {
                let Some(log_path) = self
                    .summary
                    .table
                    .as_ref()
                    .and_then(|table| table.table.rows.get(row))
                    .map(|row| row.log_path.clone())
                else {
                    return;
                };
                let Some(package) = render::selected_package(&self.summary) else {
                    self.status = "Select a workspace before inspecting a log".to_string();
                    return;
                };
                self.dispatch(BackendCommand::InspectLog { log_path, package });
            }
            UiAction::CloseModal => {
                render::close_detail(&mut self.modal);
                self.dispatch(BackendCommand::CloseInspection);
            }
            UiAction::ChangeLanguage(language) => {
                self.dispatch(BackendCommand::ChangeLanguage { language });
            }
            UiAction::SelectFolder => {
                self.dispatch(BackendCommand::SelectFolder);
            }
            UiAction::SelectFile(kind) => {
                self.dispatch(BackendCommand::SelectFile { kind });
            }
            UiAction::DismissBanner => {
                self.status_banner = None;
            }
        }
    }

    fn show_top_bar(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let dict = &self.dictionary;
        egui::TopBottomPanel::top("lila_top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Lila");
                ui.separator();
                ui.menu_button(dict.translate("File"), |ui| {
                    if ui.button(dict.translate("Select folder")).clicked() {
                        actions.push(UiAction::SelectFolder);
                    }
                    if ui.button(dict.translate("Select Excel file")).clicked() {
                        actions.push(UiAction::SelectFile(FileKind::Excel));
                    }
                });
                ui.menu_button(dict.translate("Language"), |ui| {
                    for language in Language::ALL {
                        if ui.button(language.label()).clicked() {
                            actions.push(UiAction::ChangeLanguage(language));
                        }
                    }
                });
                if let Some(path) = &self.summary.selected_path {
                    ui.separator();
                    ui.weak(path.display().to_string());
                }
            });
            if let Some(notification) = &self.summary.notification {
                ui.colored_label(egui::Color32::from_rgb(66, 165, 245), notification);
            }
        });
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("lila_status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let (color, text) = if self.bridge_ready {
                    (egui::Color32::from_rgb(67, 160, 71), "online")
                } else {
                    (egui::Color32::GRAY, "offline")
                };
                ui.colored_label(color, text);
                ui.separator();
                ui.label(&self.status);
            });
        });
    }

    fn show_summary(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        let dict = &self.dictionary;
        let summary = &self.summary;
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(banner) = &self.status_banner {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(229, 57, 53), banner);
                    if ui.small_button("x").clicked() {
                        actions.push(UiAction::DismissBanner);
                    }
                });
                ui.separator();
            }

            if summary.preloader {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(dict.translate("Loading..."));
                });
            }

            ui.horizontal(|ui| {
                ui.label(dict.translate("Workspace"));
                let mut picked = summary.selected_workspace.clone();
                let selected_text = picked
                    .as_ref()
                    .map(|name| name.to_string())
                    .unwrap_or_default();
                egui::ComboBox::from_id_salt("workspace_picker")
                    .selected_text(selected_text)
                    .show_ui(ui, |ui| {
                        for entry in &summary.workspaces {
                            ui.selectable_value(
                                &mut picked,
                                Some(entry.name.clone()),
                                entry.name.as_str(),
                            );
                        }
                    });
                if picked != summary.selected_workspace {
                    if let Some(name) = picked {
                        actions.push(UiAction::SelectWorkspace(name));
                    }
                }

                let check = egui::Button::new(dict.translate("Check"));
                if ui.add_enabled(summary.check_enabled, check).clicked() {
                    actions.push(UiAction::Check);
                }
                if !summary.check_enabled {
                    if ui.button(dict.translate("Cancel")).clicked() {
                        actions.push(UiAction::CancelCheck);
                    }
                    ui.spinner();
                }
            });

            if summary.progress.visible {
                ui.add(egui::ProgressBar::new(summary.progress.fraction()).show_percentage());
            }
            if summary.outdated_banner {
                ui.colored_label(
                    egui::Color32::from_rgb(251, 140, 0),
                    dict.translate("Workspace changed. Press Check to update the summary."),
                );
            }

            ui.separator();
            match &summary.table {
                Some(table) => show_summary_table(ui, table, dict, actions),
                None if !summary.preloader => {
                    ui.weak(dict.translate("No summary yet"));
                }
                None => {}
            }
        });
    }

    fn show_detail_modal(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        if !self.modal.open {
            return;
        }
        let dict = &self.dictionary;
        let modal = &self.modal;
        let mut open = true;
        egui::Window::new(dict.translate("Log check"))
            .open(&mut open)
            .collapsible(false)
            .resizable(true)
            .default_width(720.0)
            .show(ctx, |ui| {
                if let Some(request) = &modal.request {
                    ui.label(format!("{} ({})", request.log_path, request.package));
                    ui.separator();
                }
                if modal.loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(dict.translate("Checking..."));
                    });
                    return;
                }
                if let Some(error) = &modal.error {
                    ui.colored_label(egui::Color32::from_rgb(229, 57, 53), error);
                    return;
                }
                if modal.rows.is_empty() {
                    ui.weak(dict.translate("No warnings"));
                    return;
                }
                egui::ScrollArea::vertical().max_height(480.0).show(ui, |ui| {
                    egui::Grid::new("warning_rows")
                        .striped(true)
                        .num_columns(5)
                        .show(ui, |ui| {
                            for title in ["File", "Item", "Result", "Value", "Hint"] {
                                ui.strong(dict.translate(title));
                            }
                            ui.end_row();
                            for row in &modal.rows {
                                ui.label(&row.file);
                                ui.label(&row.item);
                                match row.passed {
                                    Some(true) => ui.colored_label(cell_color(CellStatus::Ok), "OK"),
                                    Some(false) => ui.colored_label(cell_color(CellStatus::Ng), "NG"),
                                    None => ui.label("-"),
                                };
                                ui.label(&row.value);
                                ui.label(&row.hint);
                                ui.end_row();
                            }
                        });
                });
            });
        if !open {
            actions.push(UiAction::CloseModal);
        }
    }
}

fn show_summary_table(
    ui: &mut egui::Ui,
    table: &TableView,
    dict: &Dictionary,
    actions: &mut Vec<UiAction>,
) {
    let expandable = table.has_hidden_columns();
    egui::ScrollArea::both().show(ui, |ui| {
        egui::Grid::new("summary_table").striped(true).show(ui, |ui| {
            ui.label("");
            for (_, column) in table.visible_columns() {
                ui.strong(dict.translate(&column.title));
            }
            ui.label("");
            ui.end_row();

            for (index, row) in table.table.rows.iter().enumerate() {
                if expandable {
                    let marker = if table.is_expanded(index) { "v" } else { ">" };
                    if ui.small_button(marker).clicked() {
                        actions.push(UiAction::ToggleRow(index));
                    }
                } else {
                    ui.label("");
                }
                for (column, _) in table.visible_columns() {
                    show_cell(ui, row.cells.get(column));
                }
                let sync = ui
                    .small_button(dict.translate("Sync"))
                    .on_hover_text(row.log_path.as_str());
                if sync.clicked() {
                    actions.push(UiAction::InspectRow(index));
                }
                ui.end_row();

                if table.is_expanded(index) {
                    ui.label("");
                    ui.vertical(|ui| {
                        for (column, header) in table.hidden_columns() {
                            ui.horizontal(|ui| {
                                ui.strong(dict.translate(&header.title));
                                show_cell(ui, row.cells.get(column));
                            });
                        }
                    });
                    ui.end_row();
                }
            }
        });
    });
}

impl eframe::App for LilaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        let mut actions = Vec::new();
        self.show_top_bar(ctx, &mut actions);
        self.show_status_bar(ctx);
        self.show_summary(ctx, &mut actions);
        self.show_detail_modal(ctx, &mut actions);
        for action in actions {
            self.perform(action);
        }

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::{bounded, unbounded};
    use lila_shared::{
        domain::{LogPath, PackageId},
        protocol::{
            ProgressUpdate, SummaryResult, SummaryRow, SummaryTable, TableColumn, ViewFragment,
            WarningList, WorkspaceEntry,
        },
    };

    use super::*;
    use crate::controller::{detail::DetailRequest, events::UiError};

    fn app() -> (LilaApp, Receiver<BackendCommand>) {
        let (cmd_tx, cmd_rx) = bounded(8);
        let (_ui_tx, ui_rx) = unbounded();
        (LilaApp::bootstrap(cmd_tx, ui_rx), cmd_rx)
    }

    fn loaded_summary() -> SummaryResult {
        SummaryResult {
            fragment: ViewFragment {
                workspaces: Some(vec![WorkspaceEntry {
                    name: WorkspaceName::new("A"),
                    path: "/ws/a".to_string(),
                    package: PackageId::new("pkgA"),
                }]),
                last_workspace: Some(WorkspaceName::new("A")),
                table: Some(SummaryTable {
                    columns: vec![TableColumn {
                        title: "Log".to_string(),
                        visible: true,
                    }],
                    rows: vec![SummaryRow {
                        log_path: LogPath::new("/logs/1.log"),
                        cells: vec![TableCell::text("1.log")],
                    }],
                }),
            },
        }
    }

    #[test]
    fn check_events_drive_trigger_and_progress() {
        let (mut app, _cmd_rx) = app();
        app.apply_event(UiEvent::CheckStarted);
        assert!(!app.summary.check_enabled);
        app.apply_event(UiEvent::Progress(ProgressUpdate::percent(40.0)));
        assert!(app.summary.progress.visible);
        app.apply_event(UiEvent::Progress(ProgressUpdate::percent(100.0)));
        assert!(!app.summary.progress.visible);
        app.apply_event(UiEvent::SummaryLoaded(loaded_summary()));
        app.apply_event(UiEvent::CheckFinished);
        app.apply_event(UiEvent::PageReady);

        assert!(app.summary.check_enabled);
        assert!(!app.summary.preloader);
        assert_eq!(app.summary.workspaces.len(), 1);
    }

    #[test]
    fn inspect_row_sends_log_and_selected_package() {
        let (mut app, cmd_rx) = app();
        app.apply_event(UiEvent::SummaryLoaded(loaded_summary()));

        app.perform(UiAction::InspectRow(0));

        match cmd_rx.try_recv().expect("command") {
            BackendCommand::InspectLog { log_path, package } => {
                assert_eq!(log_path, LogPath::new("/logs/1.log"));
                assert_eq!(package, PackageId::new("pkgA"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn repeated_check_clicks_queue_one_command() {
        let (mut app, cmd_rx) = app();
        app.perform(UiAction::Check);
        app.perform(UiAction::Check);
        assert_eq!(cmd_rx.try_iter().count(), 1);
    }

    #[test]
    fn changing_workspace_only_sends_on_real_change() {
        let (mut app, cmd_rx) = app();
        app.apply_event(UiEvent::SummaryLoaded(loaded_summary()));

        app.perform(UiAction::SelectWorkspace(WorkspaceName::new("A")));
        assert!(cmd_rx.try_recv().is_err());

        app.perform(UiAction::SelectWorkspace(WorkspaceName::new("B")));
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::ChangeWorkspace { .. })
        ));
    }

    #[test]
    fn closing_modal_drops_late_result() {
        let (mut app, cmd_rx) = app();
        app.apply_event(UiEvent::DetailOpened {
            generation: 1,
            request: DetailRequest {
                log_path: LogPath::new("/logs/1.log"),
                package: PackageId::new("pkgA"),
            },
        });
        app.perform(UiAction::CloseModal);
        app.apply_event(UiEvent::DetailLoaded {
            generation: 1,
            warnings: WarningList::default(),
        });

        assert!(!app.modal.open);
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::CloseInspection)));
    }

    #[test]
    fn bridge_startup_failure_reenables_check() {
        let (mut app, _cmd_rx) = app();
        app.perform(UiAction::Check);
        assert!(!app.summary.check_enabled);

        app.apply_event(UiEvent::Error(UiError::from_message(
            UiErrorContext::BridgeStartup,
            "Backend unreachable; make sure the Lila backend is running and relaunch.",
        )));

        assert!(app.summary.check_enabled);
        assert!(!app.summary.preloader);
        assert!(app.status_banner.is_some());
    }

    #[test]
    fn reload_resets_page_state() {
        let (mut app, _cmd_rx) = app();
        app.apply_event(UiEvent::SummaryLoaded(loaded_summary()));
        app.apply_event(UiEvent::PageReady);
        app.apply_event(UiEvent::Reloading);

        assert!(app.summary.preloader);
        assert!(app.summary.table.is_none());
        assert!(app.dictionary.is_empty());
    }
}

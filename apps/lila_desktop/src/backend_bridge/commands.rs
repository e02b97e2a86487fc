//! Backend commands queued from UI to backend worker.

use lila_shared::domain::{FileKind, Language, LogPath, PackageId, WorkspaceName};

#[derive(Debug)]
pub enum BackendCommand {
    ChangeWorkspace { name: WorkspaceName },
    CheckWorkspace,
    CancelCheck,
    InspectLog {
        log_path: LogPath,
        package: PackageId,
    },
    CloseInspection,
    ChangeLanguage { language: Language },
    SelectFolder,
    SelectFile { kind: FileKind },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::ChangeWorkspace { .. } => "change_workspace",
            BackendCommand::CheckWorkspace => "check_workspace",
            BackendCommand::CancelCheck => "cancel_check",
            BackendCommand::InspectLog { .. } => "inspect_log",
            BackendCommand::CloseInspection => "close_inspection",
            BackendCommand::ChangeLanguage { .. } => "change_language",
            BackendCommand::SelectFolder => "select_folder",
            BackendCommand::SelectFile { .. } => "select_file",
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{FileKind, LogPath, PackageId, WorkspaceAction, WorkspaceName};

/// Name of the push callback the backend invokes with progress payloads.
pub const PROGRESS_CALLBACK: &str = "updateProgress";

/// Whether the caller waits for the reply of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Awaited,
    /// Sent in order with other calls; the reply is only logged.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SelectFolder,
    SelectFile {
        kind: FileKind,
    },
    ChangeLanguage {
        label: String,
    },
    GetLanguageText,
    GetMessages,
    SyncPackageData,
    UpdateWorkspace {
        name: WorkspaceName,
        action: WorkspaceAction,
    },
    GetWorkspaceSummary {
        force: bool,
    },
    CheckTestlog {
        log_path: LogPath,
        package: PackageId,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SelectFolder => "select_folder",
            Operation::SelectFile { .. } => "select_file",
            Operation::ChangeLanguage { .. } => "change_language",
            Operation::GetLanguageText => "get_language_text",
            Operation::GetMessages => "get_messages",
            Operation::SyncPackageData => "sync_package_data",
            Operation::UpdateWorkspace { .. } => "update_workspace",
            Operation::GetWorkspaceSummary { .. } => "get_workspace_summary",
            Operation::CheckTestlog { .. } => "check_testlog",
        }
    }

    /// Positional arguments in the order the backend function declares them.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Operation::SelectFolder
            | Operation::GetLanguageText
            | Operation::GetMessages
            | Operation::SyncPackageData => Vec::new(),
            Operation::SelectFile { kind } => vec![json!(kind.as_str())],
            Operation::ChangeLanguage { label } => vec![json!(label)],
            Operation::UpdateWorkspace { name, action } => {
                vec![json!({ "name": name }), json!(action)]
            }
            Operation::GetWorkspaceSummary { force } => vec![json!(force)],
            Operation::CheckTestlog { log_path, package } => {
                vec![json!(log_path), json!(package)]
            }
        }
    }

    pub fn delivery(&self) -> Delivery {
        match self {
            Operation::SyncPackageData | Operation::UpdateWorkspace { .. } => Delivery::BestEffort,
            _ => Delivery::Awaited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    pub name: WorkspaceName,
    #[serde(default)]
    pub path: String,
    pub package: PackageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellStatus {
    Ok,
    Ng,
    Nc,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableCell {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CellStatus>,
}

impl TableCell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub title: String,
    /// Hidden columns are rendered inside the expanded detail row.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub log_path: LogPath,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<SummaryRow>,
}

/// Partial view state; every absent field leaves its region untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewFragment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<Vec<WorkspaceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_workspace: Option<WorkspaceName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<SummaryTable>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<f64>,
    #[serde(flatten)]
    pub fragment: ViewFragment,
}

impl ProgressUpdate {
    pub fn percent(percent: f64) -> Self {
        Self {
            percent: Some(percent),
            fragment: ViewFragment::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryResult {
    #[serde(flatten)]
    pub fragment: ViewFragment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRow {
    pub file: String,
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarningList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<WarningRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<WarningRow>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessagesPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

/// A call in either direction: UI to backend for operations, backend to UI
/// for pushes such as [`PROGRESS_CALLBACK`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    pub call: u64,
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl CallFrame {
    pub fn for_operation(call: u64, operation: &Operation) -> Self {
        Self {
            call,
            name: operation.name().to_string(),
            args: operation.args(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnFrame {
    #[serde(rename = "return")]
    pub call: u64,
    pub status: ReturnStatus,
    #[serde(default)]
    pub value: Value,
}

impl ReturnFrame {
    pub fn ok(call: u64, value: Value) -> Self {
        Self {
            call,
            status: ReturnStatus::Ok,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundFrame {
    Return(ReturnFrame),
    Call(CallFrame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_workspace_args_match_backend_signature() {
        let op = Operation::UpdateWorkspace {
            name: WorkspaceName::new("ws-1"),
            action: WorkspaceAction::Update,
        };
        assert_eq!(op.name(), "update_workspace");
        assert_eq!(op.args(), vec![json!({"name": "ws-1"}), json!("update")]);
        assert_eq!(op.delivery(), Delivery::BestEffort);
    }

    #[test]
    fn summary_and_check_are_awaited() {
        assert_eq!(
            Operation::GetWorkspaceSummary { force: true }.args(),
            vec![json!(true)]
        );
        let check = Operation::CheckTestlog {
            log_path: LogPath::new("/log1"),
            package: PackageId::new("pkgX"),
        };
        assert_eq!(check.args(), vec![json!("/log1"), json!("pkgX")]);
        assert_eq!(check.delivery(), Delivery::Awaited);
    }

    #[test]
    fn inbound_frames_distinguish_returns_from_pushes() {
        let ret: InboundFrame =
            serde_json::from_str(r#"{"return": 7, "status": "ok", "value": {"table": null}}"#)
                .expect("return frame");
        assert!(matches!(ret, InboundFrame::Return(ReturnFrame { call: 7, .. })));

        let push: InboundFrame = serde_json::from_str(
            r#"{"call": 3, "name": "updateProgress", "args": [{"percent": 40}]}"#,
        )
        .expect("push frame");
        match push {
            InboundFrame::Call(frame) => {
                assert_eq!(frame.name, PROGRESS_CALLBACK);
                let update: ProgressUpdate =
                    serde_json::from_value(frame.args[0].clone()).expect("progress");
                assert_eq!(update.percent, Some(40.0));
                assert_eq!(update.fragment, ViewFragment::default());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn progress_payload_carries_optional_fragment() {
        let update: ProgressUpdate = serde_json::from_value(json!({
            "workspaces": [{"name": "A", "path": "/a", "package": "pkgA"}],
            "last_workspace": "A"
        }))
        .expect("progress");
        assert_eq!(update.percent, None);
        assert_eq!(
            update.fragment.last_workspace,
            Some(WorkspaceName::new("A"))
        );
        assert!(update.fragment.table.is_none());
    }
}

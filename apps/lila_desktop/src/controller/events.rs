//! Events flowing from the bridge worker to the UI thread, and error modeling.

use std::{path::PathBuf, sync::Arc};

use lila_client::{Dictionary, GatewayError};
use lila_shared::protocol::{ProgressUpdate, SummaryResult, WarningList};

use crate::controller::detail::DetailRequest;

#[derive(Debug)]
pub enum UiEvent {
    Info(String),
    BridgeReady,
    Translations(Arc<Dictionary>),
    Notification(String),
    /// Page load finished; the preloader can go.
    PageReady,
    /// The page is about to load again from scratch (language change).
    Reloading,
    WorkspaceOutdated,
    CheckStarted,
    Progress(ProgressUpdate),
    SummaryLoaded(SummaryResult),
    CheckFinished,
    DetailOpened {
        generation: u64,
        request: DetailRequest,
    },
    DetailLoaded {
        generation: u64,
        warnings: WarningList,
    },
    DetailFailed {
        generation: u64,
        error: UiError,
    },
    PathSelected(Option<PathBuf>),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Backend,
    Decode,
    Cancelled,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BridgeStartup,
    PageLoad,
    WorkspaceCheck,
    LogInspection,
    Language,
    General,
}

pub fn classify_startup_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("failed to build backend runtime") {
        "Backend worker startup failure; verify local app environment and relaunch.".to_string()
    } else if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Backend unreachable; make sure the Lila backend is running and relaunch.".to_string()
    } else {
        format!("Backend bridge error: {message}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_gateway(context: UiErrorContext, err: &GatewayError) -> Self {
        let category = match err {
            GatewayError::Backend { .. } => UiErrorCategory::Backend,
            GatewayError::Transport { .. }
            | GatewayError::TimedOut { .. }
            | GatewayError::Disconnected { .. } => UiErrorCategory::Transport,
            GatewayError::Decode { .. } => UiErrorCategory::Decode,
            GatewayError::Cancelled { .. } => UiErrorCategory::Cancelled,
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connect")
            || message_lower.contains("disconnect")
            || message_lower.contains("websocket")
            || message_lower.contains("unreachable")
        {
            UiErrorCategory::Transport
        } else if message_lower.contains("decode") || message_lower.contains("malformed") {
            UiErrorCategory::Decode
        } else if message_lower.contains("cancel") {
            UiErrorCategory::Cancelled
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

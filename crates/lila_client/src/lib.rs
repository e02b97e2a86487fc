use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use lila_shared::{
    domain::{FileKind, LogPath, PackageId, WorkspaceAction, WorkspaceName},
    error::ApiError,
    protocol::{MessagesPayload, Operation, SummaryResult, WarningList},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod cancel;
pub mod localization;
pub mod progress;
pub mod transport;

pub use cancel::CancelToken;
pub use localization::{Dictionary, Localizer};
pub use progress::{ProgressHub, ProgressSubscription};
pub use transport::BridgeTransport;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("backend rejected {operation}: {}", .error.message)]
    Backend {
        operation: &'static str,
        error: ApiError,
    },
    #[error("transport failure during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },
    #[error("failed to decode {operation} response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },
    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },
    #[error("{operation} timed out after {after:?}")]
    TimedOut {
        operation: &'static str,
        after: Duration,
    },
    #[error("backend bridge disconnected before {operation} completed")]
    Disconnected { operation: &'static str },
}

impl GatewayError {
    pub fn operation(&self) -> &'static str {
        match self {
            GatewayError::Backend { operation, .. }
            | GatewayError::Transport { operation, .. }
            | GatewayError::Decode { operation, .. }
            | GatewayError::Cancelled { operation }
            | GatewayError::TimedOut { operation, .. }
            | GatewayError::Disconnected { operation } => operation,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GatewayError::Cancelled { .. })
    }
}

/// Single-shot asynchronous access to the backend's named operations.
#[async_trait]
pub trait RemoteCall: Send + Sync {
    async fn invoke(&self, operation: Operation) -> Result<Value, GatewayError>;

    /// Sends a best-effort call. The call is ordered with respect to later
    /// calls on the same gateway, but its reply is never observed.
    fn notify(&self, operation: Operation);
}

#[async_trait]
impl<T> RemoteCall for Arc<T>
where
    T: RemoteCall + ?Sized,
{
    async fn invoke(&self, operation: Operation) -> Result<Value, GatewayError> {
        (**self).invoke(operation).await
    }

    fn notify(&self, operation: Operation) {
        (**self).notify(operation)
    }
}

/// Typed operations on top of a [`RemoteCall`] gateway.
pub struct LilaClient<G: RemoteCall> {
    gateway: G,
    timeout: Option<Duration>,
}

impl<G: RemoteCall> LilaClient<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub async fn select_folder(
        &self,
        cancel: &CancelToken,
    ) -> Result<Option<PathBuf>, GatewayError> {
        let path: Option<String> = self.call_decoded(Operation::SelectFolder, cancel).await?;
        Ok(non_empty_path(path))
    }

    pub async fn select_file(
        &self,
        kind: FileKind,
        cancel: &CancelToken,
    ) -> Result<Option<PathBuf>, GatewayError> {
        let path: Option<String> = self
            .call_decoded(Operation::SelectFile { kind }, cancel)
            .await?;
        Ok(non_empty_path(path))
    }

    pub async fn change_language(
        &self,
        label: &str,
        cancel: &CancelToken,
    ) -> Result<(), GatewayError> {
        self.call(
            Operation::ChangeLanguage {
                label: label.to_string(),
            },
            cancel,
        )
        .await
        .map(|_| ())
    }

    pub async fn language_text(
        &self,
        cancel: &CancelToken,
    ) -> Result<HashMap<String, String>, GatewayError> {
        self.call_decoded(Operation::GetLanguageText, cancel).await
    }

    pub async fn messages(&self, cancel: &CancelToken) -> Result<MessagesPayload, GatewayError> {
        self.call_decoded(Operation::GetMessages, cancel).await
    }

    pub fn sync_package_data(&self) {
        self.gateway.notify(Operation::SyncPackageData);
    }

    pub fn update_workspace(&self, name: WorkspaceName) {
        self.gateway.notify(Operation::UpdateWorkspace {
            name,
            action: WorkspaceAction::Update,
        });
    }

    pub async fn workspace_summary(
        &self,
        force: bool,
        cancel: &CancelToken,
    ) -> Result<SummaryResult, GatewayError> {
        self.call_decoded(Operation::GetWorkspaceSummary { force }, cancel)
            .await
    }

    pub async fn check_testlog(
        &self,
        log_path: LogPath,
        package: PackageId,
        cancel: &CancelToken,
    ) -> Result<WarningList, GatewayError> {
        self.call_decoded(Operation::CheckTestlog { log_path, package }, cancel)
            .await
    }

    async fn call(
        &self,
        operation: Operation,
        cancel: &CancelToken,
    ) -> Result<Value, GatewayError> {
        let name = operation.name();
        let call = self.gateway.invoke(operation);
        let bounded = async {
            match self.timeout {
                Some(after) => match tokio::time::timeout(after, call).await {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::TimedOut {
                        operation: name,
                        after,
                    }),
                },
                None => call.await,
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = cancel.cancelled() => Err(GatewayError::Cancelled { operation: name }),
        }
    }

    async fn call_decoded<T: DeserializeOwned>(
        &self,
        operation: Operation,
        cancel: &CancelToken,
    ) -> Result<T, GatewayError> {
        let name = operation.name();
        let value = self.call(operation, cancel).await?;
        decode(name, value)
    }
}

/// Backends answer "nothing to report" with `null`; decode that as an empty
/// object so every optional field reads as absent.
fn decode<T: DeserializeOwned>(operation: &'static str, value: Value) -> Result<T, GatewayError> {
    let value = match value {
        Value::Null => match serde_json::from_value::<T>(Value::Null) {
            Ok(decoded) => return Ok(decoded),
            Err(_) => Value::Object(Default::default()),
        },
        other => other,
    };
    serde_json::from_value(value).map_err(|err| GatewayError::Decode {
        operation,
        message: err.to_string(),
    })
}

fn non_empty_path(path: Option<String>) -> Option<PathBuf> {
    path.map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

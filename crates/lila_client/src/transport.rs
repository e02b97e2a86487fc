//! Websocket bridge to the backend process.
//!
//! Calls go out as `{"call", "name", "args"}` frames and resolve when the
//! matching `{"return", "status", "value"}` frame arrives. The backend pushes
//! progress as call frames naming [`PROGRESS_CALLBACK`]; those are routed to
//! the [`ProgressHub`] and acknowledged. One reader task handles inbound
//! frames in arrival order, so pushes sent before a return frame are
//! delivered before that call resolves.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use lila_shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        CallFrame, InboundFrame, Operation, ProgressUpdate, ReturnFrame, ReturnStatus,
        PROGRESS_CALLBACK,
    },
};
use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{GatewayError, ProgressHub, RemoteCall};

type Reply = oneshot::Sender<Result<Value, GatewayError>>;

struct PendingCall {
    operation: &'static str,
    /// `None` for best-effort calls; their outcome is only logged.
    reply: Option<Reply>,
}

#[derive(Default)]
struct PendingCalls {
    closed: bool,
    calls: HashMap<u64, PendingCall>,
}

pub struct BridgeTransport {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Arc<Mutex<PendingCalls>>,
    next_call: AtomicU64,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl BridgeTransport {
    pub async fn connect(url: &str, progress: Arc<ProgressHub>) -> Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect backend bridge: {url}"))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending = Arc::new(Mutex::new(PendingCalls::default()));

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(err) = ws_writer.send(message).await {
                    warn!("backend bridge write failed: {err}");
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        let reader_pending = Arc::clone(&pending);
        let reader_outbound = outbound.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        handle_inbound(&text, &reader_pending, &progress, &reader_outbound)
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("backend bridge read failed: {err}");
                        break;
                    }
                }
            }
            fail_pending(&reader_pending);
            info!("backend bridge closed");
        });

        info!(url, "backend bridge connected");
        Ok(Arc::new(Self {
            outbound,
            pending,
            next_call: AtomicU64::new(0),
            reader,
            writer,
        }))
    }

    pub fn pending_calls(&self) -> usize {
        lock_pending(&self.pending).calls.len()
    }

    fn send_call(&self, operation: &Operation, reply: Option<Reply>) -> Result<u64, GatewayError> {
        let name = operation.name();
        let call = self.next_call.fetch_add(1, Ordering::Relaxed) + 1;
        let text = serde_json::to_string(&CallFrame::for_operation(call, operation)).map_err(
            |err| GatewayError::Transport {
                operation: name,
                message: err.to_string(),
            },
        )?;

        {
            let mut pending = lock_pending(&self.pending);
            if pending.closed {
                return Err(GatewayError::Disconnected { operation: name });
            }
            pending.calls.insert(
                call,
                PendingCall {
                    operation: name,
                    reply,
                },
            );
        }

        if self.outbound.send(Message::Text(text)).is_err() {
            lock_pending(&self.pending).calls.remove(&call);
            return Err(GatewayError::Disconnected { operation: name });
        }
        debug!(operation = name, call, "sent bridge call");
        Ok(call)
    }
}

impl Drop for BridgeTransport {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

#[async_trait]
impl RemoteCall for BridgeTransport {
    async fn invoke(&self, operation: Operation) -> Result<Value, GatewayError> {
        let name = operation.name();
        let (tx, rx) = oneshot::channel();
        let call = self.send_call(&operation, Some(tx))?;
        let _pending = PendingGuard {
            pending: &self.pending,
            call,
        };
        rx.await
            .unwrap_or(Err(GatewayError::Disconnected { operation: name }))
    }

    fn notify(&self, operation: Operation) {
        if let Err(err) = self.send_call(&operation, None) {
            warn!("failed to send best-effort call: {err}");
        }
    }
}

/// Forgets an awaited call when its caller stops waiting (cancel, timeout).
/// A no-op once the reader has already resolved it.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingCalls>,
    call: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).calls.remove(&self.call);
    }
}

fn lock_pending(pending: &Mutex<PendingCalls>) -> MutexGuard<'_, PendingCalls> {
    pending
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn handle_inbound(
    text: &str,
    pending: &Mutex<PendingCalls>,
    progress: &ProgressHub,
    outbound: &mpsc::UnboundedSender<Message>,
) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!("ignoring malformed bridge frame: {err}");
            return;
        }
    };

    match frame {
        InboundFrame::Return(ret) => resolve_call(ret, pending),
        InboundFrame::Call(push) => {
            let ack = handle_push(push, progress);
            match serde_json::to_string(&ack) {
                Ok(text) => {
                    let _ = outbound.send(Message::Text(text));
                }
                Err(err) => warn!("failed to encode push acknowledgement: {err}"),
            }
        }
    }
}

fn resolve_call(ret: ReturnFrame, pending: &Mutex<PendingCalls>) {
    let Some(call) = lock_pending(pending).calls.remove(&ret.call) else {
        debug!(call = ret.call, "reply for unknown or abandoned call");
        return;
    };

    let result = match ret.status {
        ReturnStatus::Ok => Ok(ret.value),
        ReturnStatus::Error => Err(GatewayError::Backend {
            operation: call.operation,
            error: ApiError::from_value(ret.value),
        }),
    };

    match call.reply {
        Some(reply) => {
            // The caller may have been cancelled and dropped its receiver.
            let _ = reply.send(result);
        }
        None => match result {
            Ok(_) => debug!(operation = call.operation, "best-effort call completed"),
            Err(err) => warn!("best-effort call failed: {err}"),
        },
    }
}

fn handle_push(push: CallFrame, progress: &ProgressHub) -> ReturnFrame {
    if push.name != PROGRESS_CALLBACK {
        warn!(name = %push.name, "backend invoked a callback that is not exposed");
        return error_frame(
            push.call,
            ApiError::new(
                ErrorCode::NotExposed,
                format!("callback {} is not exposed", push.name),
            ),
        );
    }

    let update = match push.args.into_iter().next() {
        Some(payload) => match serde_json::from_value::<ProgressUpdate>(payload) {
            Ok(update) => update,
            Err(err) => {
                warn!("ignoring malformed progress payload: {err}");
                return error_frame(push.call, ApiError::new(ErrorCode::Validation, err.to_string()));
            }
        },
        None => ProgressUpdate::default(),
    };
    progress.deliver(update);
    ReturnFrame::ok(push.call, Value::Null)
}

fn error_frame(call: u64, error: ApiError) -> ReturnFrame {
    ReturnFrame {
        call,
        status: ReturnStatus::Error,
        value: serde_json::to_value(error).unwrap_or(Value::Null),
    }
}

fn fail_pending(pending: &Mutex<PendingCalls>) {
    let drained: Vec<PendingCall> = {
        let mut guard = lock_pending(pending);
        guard.closed = true;
        guard.calls.drain().map(|(_, call)| call).collect()
    };
    for call in drained {
        if let Some(reply) = call.reply {
            let _ = reply.send(Err(GatewayError::Disconnected {
                operation: call.operation,
            }));
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;

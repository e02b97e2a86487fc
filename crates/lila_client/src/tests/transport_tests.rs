use super::*;
use std::{future::Future, time::Duration};

use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    routing::get,
    Router,
};
use lila_shared::domain::{LogPath, PackageId, WorkspaceAction, WorkspaceName};
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_backend<F, Fut>(handler: F) -> String
where
    F: Fn(WebSocket) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let app = Router::new().route(
        "/eel",
        get(move |ws: WebSocketUpgrade| {
            let handler = handler.clone();
            async move { ws.on_upgrade(handler) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("ws://{addr}/eel")
}

/// Reads the next call frame, skipping acknowledgements of pushes.
async fn next_call(socket: &mut WebSocket) -> Option<CallFrame> {
    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Text(text) = message {
            if let Ok(frame) = serde_json::from_str::<CallFrame>(&text) {
                return Some(frame);
            }
        }
    }
    None
}

async fn send_json(socket: &mut WebSocket, value: Value) {
    socket
        .send(WsMessage::Text(value.to_string()))
        .await
        .expect("send frame");
}

async fn scanning_backend(mut socket: WebSocket) {
    while let Some(frame) = next_call(&mut socket).await {
        match frame.name.as_str() {
            "get_workspace_summary" => {
                for (offset, percent) in [25, 50, 100].into_iter().enumerate() {
                    send_json(
                        &mut socket,
                        json!({
                            "call": 1000 + offset,
                            "name": PROGRESS_CALLBACK,
                            "args": [{"percent": percent}]
                        }),
                    )
                    .await;
                }
                send_json(
                    &mut socket,
                    json!({"return": frame.call, "status": "ok", "value": {"last_workspace": "B"}}),
                )
                .await;
            }
            "check_testlog" => {
                send_json(
                    &mut socket,
                    json!({
                        "return": frame.call,
                        "status": "error",
                        "value": {"code": "internal", "message": "testlog not found"}
                    }),
                )
                .await;
            }
            _ => {
                send_json(
                    &mut socket,
                    json!({"return": frame.call, "status": "ok", "value": null}),
                )
                .await;
            }
        }
    }
}

#[tokio::test]
async fn pushes_before_the_reply_reach_the_subscription_in_order() {
    let url = spawn_backend(scanning_backend).await;
    let hub = ProgressHub::new();
    let transport = BridgeTransport::connect(&url, Arc::clone(&hub))
        .await
        .expect("connect");

    let mut progress = hub.register("workspace_summary");
    let value = transport
        .invoke(Operation::GetWorkspaceSummary { force: true })
        .await
        .expect("summary");
    assert_eq!(value, json!({"last_workspace": "B"}));

    let mut percents = Vec::new();
    while let Some(update) = progress.try_recv() {
        percents.push(update.percent);
    }
    assert_eq!(percents, vec![Some(25.0), Some(50.0), Some(100.0)]);
    assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn error_returns_become_backend_errors() {
    let url = spawn_backend(scanning_backend).await;
    let transport = BridgeTransport::connect(&url, ProgressHub::new())
        .await
        .expect("connect");

    let err = transport
        .invoke(Operation::CheckTestlog {
            log_path: LogPath::new("/log1"),
            package: PackageId::new("pkgX"),
        })
        .await
        .expect_err("rejected");
    match err {
        GatewayError::Backend { operation, error } => {
            assert_eq!(operation, "check_testlog");
            assert_eq!(error.message, "testlog not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn closed_socket_fails_pending_and_later_calls() {
    let url = spawn_backend(|mut socket: WebSocket| async move {
        let _ = next_call(&mut socket).await;
        let _ = socket.send(WsMessage::Close(None)).await;
    })
    .await;
    let transport = BridgeTransport::connect(&url, ProgressHub::new())
        .await
        .expect("connect");

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        transport.invoke(Operation::GetMessages),
    )
    .await
    .expect("resolved after close")
    .expect_err("disconnected");
    assert!(matches!(err, GatewayError::Disconnected { operation: "get_messages" }));

    let err = transport
        .invoke(Operation::GetLanguageText)
        .await
        .expect_err("still disconnected");
    assert!(matches!(err, GatewayError::Disconnected { .. }));
}

#[tokio::test]
async fn abandoned_calls_leave_no_pending_entry() {
    let url = spawn_backend(|mut socket: WebSocket| async move {
        while next_call(&mut socket).await.is_some() {}
    })
    .await;
    let transport = BridgeTransport::connect(&url, ProgressHub::new())
        .await
        .expect("connect");

    for _ in 0..3 {
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            transport.invoke(Operation::GetWorkspaceSummary { force: true }),
        )
        .await;
        assert!(abandoned.is_err(), "backend never replies");
    }
    assert_eq!(transport.pending_calls(), 0);
}

#[tokio::test]
async fn best_effort_calls_keep_wire_order() {
    let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel::<CallFrame>();
    let url = spawn_backend(move |mut socket: WebSocket| {
        let seen_tx = seen_tx.clone();
        async move {
            while let Some(frame) = next_call(&mut socket).await {
                let call = frame.call;
                let _ = seen_tx.send(frame);
                send_json(
                    &mut socket,
                    json!({"return": call, "status": "ok", "value": null}),
                )
                .await;
            }
        }
    })
    .await;
    let transport = BridgeTransport::connect(&url, ProgressHub::new())
        .await
        .expect("connect");

    transport.notify(Operation::UpdateWorkspace {
        name: WorkspaceName::new("B"),
        action: WorkspaceAction::Update,
    });
    transport
        .invoke(Operation::GetWorkspaceSummary { force: false })
        .await
        .expect("summary");

    let first = seen_rx.recv().await.expect("first frame");
    let second = seen_rx.recv().await.expect("second frame");
    assert_eq!(first.name, "update_workspace");
    assert_eq!(first.args, vec![json!({"name": "B"}), json!("update")]);
    assert_eq!(second.name, "get_workspace_summary");
    assert_eq!(second.args, vec![json!(false)]);
}

#[tokio::test]
async fn pushes_for_unknown_callbacks_are_rejected() {
    let (ack_tx, mut ack_rx) = tokio::sync::mpsc::unbounded_channel::<ReturnFrame>();
    let url = spawn_backend(move |mut socket: WebSocket| {
        let ack_tx = ack_tx.clone();
        async move {
            send_json(
                &mut socket,
                json!({"call": 9, "name": "showToast", "args": ["hi"]}),
            )
            .await;
            while let Some(Ok(WsMessage::Text(text))) = socket.recv().await {
                if let Ok(ack) = serde_json::from_str::<ReturnFrame>(&text) {
                    let _ = ack_tx.send(ack);
                }
            }
        }
    })
    .await;
    let hub = ProgressHub::new();
    let _transport = BridgeTransport::connect(&url, Arc::clone(&hub))
        .await
        .expect("connect");

    let ack = tokio::time::timeout(Duration::from_secs(5), ack_rx.recv())
        .await
        .expect("ack in time")
        .expect("ack");
    assert_eq!(ack.call, 9);
    assert_eq!(ack.status, ReturnStatus::Error);
}

//! WebSocket connection handlers.
//!
//! 1 接続の流れ: `auth-start` → 認証（試行回数とタイムアウトで制限）→ 受付 → 入力行の処理 → 終了。
//! 受付後のサーバー発フレームは全てセッションの outbox を経由し、writer タスクだけがソケットに書く。

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    watch,
};

use crate::{
    domain::{RejectCode, ServerEvent, SessionCommand, SessionId, Username},
    infrastructure::{
        dto::websocket::{ClientFrame, ServerFrame},
        message_pusher::outbox_channel,
    },
    ui::state::AppState,
    usecase::{AuthKind, AuthRequest, ConnectError, RouteError, remaining_attempts},
};

/// How long the writer may keep flushing after the session is released
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let connection = state.connections.enter();
    ws.on_upgrade(move |socket| async move {
        let _connection = connection;
        handle_socket(socket, state).await;
    })
}

/// Resolves once the shutdown flag is set. Never resolves if the flag owner is gone without setting it.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn send_frame(sender: &mut WsSender, frame: &ServerFrame) -> Result<(), axum::Error> {
    let json = frame.to_json().map_err(axum::Error::new)?;
    sender.send(Message::Text(json.into())).await
}

/// Outcome of the authentication phase
enum AuthOutcome {
    Authenticated(Username),
    /// Attempts exhausted, timed out, client gone or server shutting down
    Rejected,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut shutdown = state.shutdown.clone();

    let max_attempts = state.authenticate_usecase.max_attempts();
    if send_frame(&mut sender, &ServerFrame::AuthStart { max_attempts })
        .await
        .is_err()
    {
        return;
    }

    let outcome = tokio::select! {
        result = tokio::time::timeout(
            state.settings.auth_timeout,
            authenticate(&mut sender, &mut receiver, &state),
        ) => match result {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::info!("Authentication timed out");
                let frame = ServerEvent::Rejected {
                    code: RejectCode::AuthTimeout,
                    message: "authentication timed out".to_string(),
                };
                let _ = send_frame(&mut sender, &frame.into()).await;
                AuthOutcome::Rejected
            }
        },
        _ = wait_for_shutdown(&mut shutdown) => {
            let _ = send_frame(&mut sender, &ServerFrame::ServerShutdown).await;
            AuthOutcome::Rejected
        }
    };

    let AuthOutcome::Authenticated(username) = outcome else {
        let _ = sender.close().await;
        return;
    };

    let session_id = SessionId::generate();
    let (tx, rx) = outbox_channel(state.settings.outbox_capacity);
    match state
        .connect_session_usecase
        .execute(session_id, username.clone(), tx)
        .await
    {
        Ok(_) => {}
        Err(ConnectError::AlreadyConnected(name)) => {
            tracing::warn!("User '{}' already has a live session. Rejecting.", name);
            let frame = ServerFrame::Error {
                code: "already-connected".to_string(),
                message: format!("user '{name}' already has a live session"),
            };
            let _ = send_frame(&mut sender, &frame).await;
            let _ = sender.close().await;
            return;
        }
        Err(ConnectError::ShuttingDown) => {
            let _ = send_frame(&mut sender, &ServerFrame::ServerShutdown).await;
            let _ = sender.close().await;
            return;
        }
    }

    let mut send_task = pusher_loop(rx, sender, username.clone());

    tokio::select! {
        _ = session_loop(&mut receiver, &state, session_id) => {}
        // `server-shutdown` is already queued and the outbox closed by the time the flag is set.
        _ = wait_for_shutdown(&mut shutdown) => {
            tracing::info!("Closing session '{}' ({}) for shutdown", session_id, username);
        }
        _ = &mut send_task => {
            tracing::debug!("Writer for '{}' stopped", username);
        }
    }

    // Release drops the outbox sender, so the writer drains what is left and stops.
    // After a shutdown the session is already closed and this is a no-op.
    state.disconnect_session_usecase.execute(&session_id).await;
    if !send_task.is_finished()
        && tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut send_task)
            .await
            .is_err()
    {
        send_task.abort();
    }
    tracing::info!("Client '{}' disconnected", username);
}

/// Runs the login / register exchange until success or the attempt bound is hit.
async fn authenticate(
    sender: &mut WsSender,
    receiver: &mut WsReceiver,
    state: &AppState,
) -> AuthOutcome {
    let max_attempts = state.authenticate_usecase.max_attempts();
    let mut failed = 0;

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket error during authentication: {}", e);
                break;
            }
        };

        let request = match ClientFrame::parse(text.as_str()) {
            Some(ClientFrame::Login { username, password }) => AuthRequest {
                kind: AuthKind::Login,
                username,
                password,
            },
            Some(ClientFrame::Register { username, password }) => AuthRequest {
                kind: AuthKind::Register,
                username,
                password,
            },
            _ => {
                let frame = ServerEvent::Rejected {
                    code: RejectCode::InvalidFrame,
                    message: "expected a login or register frame".to_string(),
                };
                if send_frame(sender, &frame.into()).await.is_err() {
                    break;
                }
                continue;
            }
        };

        match state.authenticate_usecase.execute(request).await {
            Ok(username) => {
                let frame = ServerFrame::AuthOk {
                    username: username.to_string(),
                };
                if send_frame(sender, &frame).await.is_err() {
                    break;
                }
                return AuthOutcome::Authenticated(username);
            }
            Err(e) => {
                failed += 1;
                let remaining = remaining_attempts(failed, max_attempts);
                tracing::info!("Authentication failed ({}), {} attempt(s) left", e, remaining);
                let frame = ServerFrame::AuthFailed {
                    reason: e.reason_code().to_string(),
                    remaining_attempts: remaining,
                };
                if send_frame(sender, &frame).await.is_err() || remaining == 0 {
                    if remaining == 0 {
                        let frame = ServerEvent::Rejected {
                            code: RejectCode::AuthExhausted,
                            message: "too many failed attempts".to_string(),
                        };
                        let _ = send_frame(sender, &frame.into()).await;
                    }
                    break;
                }
            }
        }
    }

    AuthOutcome::Rejected
}

/// Forwards outbox events to the socket until the outbox closes.
///
/// A lagging client loses the oldest events; the loss is logged and the loop continues.
fn pusher_loop(
    mut rx: broadcast::Receiver<ServerEvent>,
    mut sender: WsSender,
    username: Username,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Client '{}' is too slow, dropped {} oldest event(s)",
                        username,
                        skipped
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let is_shutdown = event == ServerEvent::Shutdown;
            if send_frame(&mut sender, &event.into()).await.is_err() {
                break;
            }
            if is_shutdown {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

/// Processes input lines of an admitted session until `/exit` or disconnect.
async fn session_loop(receiver: &mut WsReceiver, state: &AppState, session_id: SessionId) {
    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket error on '{}': {}", session_id, e);
                break;
            }
        };
        tracing::debug!("Received from '{}': {}", session_id, text);

        let line = match ClientFrame::parse(text.as_str()) {
            Some(ClientFrame::Line { text }) => text,
            Some(_) => {
                reject(state, session_id, RejectCode::InvalidFrame, "already authenticated").await;
                continue;
            }
            None => {
                reject(state, session_id, RejectCode::InvalidFrame, "unknown frame").await;
                continue;
            }
        };

        match SessionCommand::parse(&line) {
            Ok(SessionCommand::Exit) => break,
            Ok(SessionCommand::Mute) => {
                state.toggle_mute_usecase.execute(&session_id, true).await;
            }
            Ok(SessionCommand::Unmute) => {
                state.toggle_mute_usecase.execute(&session_id, false).await;
            }
            Ok(SessionCommand::Chat(body)) => {
                match state.send_message_usecase.execute(session_id, body).await {
                    Ok(_) => {}
                    Err(RouteError::NotActive) => {
                        reject(
                            state,
                            session_id,
                            RejectCode::NotActive,
                            "you are still waiting in the queue",
                        )
                        .await;
                    }
                    Err(RouteError::SessionClosed) => break,
                    // The warning frame has already been queued for the sender.
                    Err(RouteError::Unpersisted { .. }) => {}
                }
            }
            Err(e) => {
                reject(state, session_id, RejectCode::InvalidMessage, &e.to_string()).await;
            }
        }
    }
}

async fn reject(state: &AppState, session_id: SessionId, code: RejectCode, message: &str) {
    let event = ServerEvent::Rejected {
        code,
        message: message.to_string(),
    };
    if let Err(e) = state.message_pusher.push_to(&session_id, event).await {
        tracing::debug!("Failed to push rejection to '{}': {}", session_id, e);
    }
}

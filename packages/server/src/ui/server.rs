//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use luconnect_shared::time::Clock;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;

use crate::{
    config::{ConfigError, ServerConfig},
    domain::{AuthGateway, MessagePusher, MessageStore},
    infrastructure::message_pusher::OutboxMessagePusher,
    usecase::{
        AdmissionController, AuthenticateUseCase, ConnectSessionUseCase,
        DisconnectSessionUseCase, GetAdmissionSnapshotUseCase, GetHistoryUseCase,
        NotificationDispatcher, SendMessageUseCase, ToggleMuteUseCase,
    },
};

use super::{
    handler::{get_history, get_sessions, health_check, websocket_handler},
    signal::shutdown_signal,
    state::{AppState, ConnectionCounter, SessionSettings},
};

const SESSION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// LU-Connect chat server
///
/// # Example
///
/// ```ignore
/// let server = Server::from_config(&config, auth_gateway, message_store, Arc::new(SystemClock))?;
/// server.run().await?;
/// ```
pub struct Server {
    authenticate_usecase: Arc<AuthenticateUseCase>,
    connect_session_usecase: Arc<ConnectSessionUseCase>,
    disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    send_message_usecase: Arc<SendMessageUseCase>,
    toggle_mute_usecase: Arc<ToggleMuteUseCase>,
    get_admission_snapshot_usecase: Arc<GetAdmissionSnapshotUseCase>,
    get_history_usecase: Arc<GetHistoryUseCase>,
    message_pusher: Arc<dyn MessagePusher>,
    settings: SessionSettings,
    bind_addr: String,
}

impl Server {
    /// Wire the server from its configuration and external collaborators.
    ///
    /// Dependencies are created in order:
    /// 1. MessagePusher
    /// 2. AdmissionController and NotificationDispatcher
    /// 3. UseCases
    pub fn from_config(
        config: &ServerConfig,
        auth_gateway: Arc<dyn AuthGateway>,
        message_store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        // 1. MessagePusher (per-session outbox)
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(OutboxMessagePusher::new());

        // 2. Admission and notification
        let admission = Arc::new(
            AdmissionController::new(
                config.admission_policy()?,
                message_pusher.clone(),
                clock.clone(),
            )
            .with_history_replay(config.history_replay),
        );
        let dispatcher = Arc::new(NotificationDispatcher::new(
            message_pusher.clone(),
            clock.clone(),
        ));

        // 3. UseCases
        let get_history_usecase = Arc::new(GetHistoryUseCase::new(message_store.clone()));
        let authenticate_usecase = Arc::new(AuthenticateUseCase::new(
            auth_gateway,
            admission.clone(),
            config.max_auth_attempts,
        ));
        let connect_session_usecase = Arc::new(ConnectSessionUseCase::new(
            admission.clone(),
            get_history_usecase.clone(),
            config.history_replay,
        ));
        let disconnect_session_usecase = Arc::new(DisconnectSessionUseCase::new(admission.clone()));
        let send_message_usecase = Arc::new(SendMessageUseCase::new(
            admission.clone(),
            message_store,
            dispatcher,
            message_pusher.clone(),
            clock,
        ));
        let toggle_mute_usecase = Arc::new(ToggleMuteUseCase::new(admission.clone()));
        let get_admission_snapshot_usecase = Arc::new(GetAdmissionSnapshotUseCase::new(admission));

        Ok(Self {
            authenticate_usecase,
            connect_session_usecase,
            disconnect_session_usecase,
            send_message_usecase,
            toggle_mute_usecase,
            get_admission_snapshot_usecase,
            get_history_usecase,
            message_pusher,
            settings: SessionSettings {
                outbox_capacity: config.outbox_capacity,
                auth_timeout: config.auth_timeout,
            },
            bind_addr: config.bind_addr(),
        })
    }

    /// Bind the configured address and serve until Ctrl+C / SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or the listener fails while serving.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws", self.bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// On shutdown every live session, waiting ones included, receives `server-shutdown`
    /// and is closed in one step, so nobody is promoted while the server goes down.
    pub async fn serve<F>(
        self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.connect_session_usecase.preload_history().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let connections = ConnectionCounter::default();
        let disconnect_usecase = self.disconnect_session_usecase.clone();

        let app_state = Arc::new(AppState {
            authenticate_usecase: self.authenticate_usecase,
            connect_session_usecase: self.connect_session_usecase,
            disconnect_session_usecase: self.disconnect_session_usecase,
            send_message_usecase: self.send_message_usecase,
            toggle_mute_usecase: self.toggle_mute_usecase,
            get_admission_snapshot_usecase: self.get_admission_snapshot_usecase,
            get_history_usecase: self.get_history_usecase,
            message_pusher: self.message_pusher,
            settings: self.settings,
            shutdown: shutdown_rx,
            connections: connections.clone(),
        });

        let app = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/sessions", get(get_sessions))
            .route("/api/history", get(get_history))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        tracing::info!(
            "LU-Connect server listening on {}",
            listener.local_addr()?
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Closing all sessions");
                disconnect_usecase.shutdown_all().await;
                let _ = shutdown_tx.send(true);
            })
            .await?;

        // Upgraded WebSocket connections outlive the HTTP server; wait for them to flush and close.
        let drained = tokio::time::timeout(SESSION_DRAIN_TIMEOUT, async {
            while connections.live() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                "{} connection(s) did not close within {:?}",
                connections.live(),
                SESSION_DRAIN_TIMEOUT
            );
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

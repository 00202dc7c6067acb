//! UseCase layer
//!
//! 受付制御・メッセージルーティング・通知配送など、アプリケーションの操作を提供します。
//! 外部コラボレーターには Domain 層の trait 経由でのみアクセスします。

mod admission;
mod authenticate;
mod connect_session;
mod disconnect_session;
mod error;
mod get_admission_snapshot;
mod get_history;
mod notification;
mod send_message;
mod toggle_mute;

pub use admission::{AdmissionController, AdmissionSnapshot, ReleaseSummary, WaitingSnapshot};
pub use authenticate::{AuthKind, AuthRequest, AuthenticateUseCase, remaining_attempts};
pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{AuthenticateError, ConnectError, RouteError};
pub use get_admission_snapshot::GetAdmissionSnapshotUseCase;
pub use get_history::GetHistoryUseCase;
pub use notification::NotificationDispatcher;
pub use send_message::{RouteReceipt, SendMessageUseCase};
pub use toggle_mute::ToggleMuteUseCase;

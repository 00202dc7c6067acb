//! Domain layer
//!
//! セッション・メッセージのドメインモデルと、受付制御（Admission）の純粋な状態遷移、
//! および外部コラボレーター（認証・メッセージストア・通知チャンネル）の trait を定義します。
//! このレイヤーは Infrastructure 層・UI 層に依存しません。

pub mod admission;
pub mod command;
pub mod entity;
pub mod error;
pub mod event;
pub mod history;
pub mod message_pusher;
pub mod repository;
pub mod value_object;

pub use admission::{
    AdmissionPolicy, AdmissionResult, AdmissionState, QueueEntry, Recipient, Release,
};
pub use command::SessionCommand;
pub use entity::{ChatMessage, Delivery, Session, SessionState};
pub use error::{AdmissionError, AuthError, MessagePushError, StoreError, ValueObjectError};
pub use event::{RejectCode, ServerEvent};
pub use history::RecentMessages;
pub use message_pusher::{MessagePusher, PusherChannel};
pub use repository::{AuthGateway, MessageStore};
pub use value_object::{MessageBody, SessionId, Timestamp, Username};

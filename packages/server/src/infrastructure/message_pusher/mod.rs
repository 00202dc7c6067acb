//! メッセージ送信（通知）の実装
//!
//! - `outbox`: セッションごとの容量付き outbox を使った実装

pub mod outbox;

pub use outbox::{OutboxMessagePusher, outbox_channel};

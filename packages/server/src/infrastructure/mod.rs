//! Infrastructure layer
//!
//! ドメイン層が定義する trait の具体的な実装と、ワイヤ表現（DTO）を提供します。

pub mod auth;
pub mod dto;
pub mod message_pusher;
pub mod store;

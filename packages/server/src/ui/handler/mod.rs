//! Request handlers.

mod http;
mod websocket;

pub use http::{get_history, get_sessions, health_check};
pub use websocket::websocket_handler;

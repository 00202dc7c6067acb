//! WebSocket frame DTOs.
//!
//! The frames themselves live in `luconnect_shared::protocol` so the client can
//! speak the same protocol without depending on the server.

pub use luconnect_shared::protocol::{ClientFrame, HistoryEntry, ServerFrame};

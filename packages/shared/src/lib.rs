//! Utilities shared by the LU-Connect server and client.

pub mod logger;
pub mod protocol;
pub mod time;

//! Terminal client for the LU-Connect chat server.

mod domain;
mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use error::ClientError;
pub use runner::{Credentials, run_client};

//! LU-Connect chat server.
//!
//! Authenticated sessions are admitted into a bounded Active set (capacity 3 by
//! default) or placed in a FIFO waiting queue. Messages from an Active session are
//! persisted and routed to every other Active session.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

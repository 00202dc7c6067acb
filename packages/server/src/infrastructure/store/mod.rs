//! Message Store の実装
//!
//! - `inmemory`: プロセス内のみで保持する実装
//! - `jsonl`: JSON Lines ファイルへ追記する実装

pub mod inmemory;
pub mod jsonl;

pub use inmemory::InMemoryMessageStore;
pub use jsonl::JsonLinesMessageStore;

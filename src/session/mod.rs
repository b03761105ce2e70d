//! 会话层：checkpoint 存储与按 session id 串行执行的会话管理

pub mod manager;
pub mod store;

pub use manager::{SessionManager, TurnReply};
pub use store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};

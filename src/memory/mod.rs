//! 消息模型：用户可见对话与 agent history 共用

pub mod conversation;

pub use conversation::{render_transcript, Message, MessageMetadata, Role, ToolCallRecord};

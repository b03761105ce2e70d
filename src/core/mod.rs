//! 核心编排层：错误与恢复、会话状态、装配

pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod state;

pub use error::{AgentError, RecoveryAction};
pub use orchestrator::{
    build_graph, create_assistant, create_calendar_provider, create_checkpoint_store, create_llm_from_config,
    create_timezone,
};
pub use recovery::RecoveryEngine;
pub use state::ConversationState;

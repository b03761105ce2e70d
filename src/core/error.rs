//! Agent 错误类型与恢复动作
//!
//! 工具层、供应商层的失败以文本形式回灌给模型（见 tools::ToolError）；
//! 这里的 AgentError 是编排层的结构性错误，由 RecoveryEngine 决定重试、降级到澄清或终止本轮。

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolError;

/// 编排过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// Supervisor 输出无法映射到路由表中的任何路由
    #[error("Unparsable supervisor decision: {0}")]
    UnparsableDecision(String),

    #[error("Worker {worker} exceeded its reasoning budget of {max_steps} steps")]
    ReasoningBudgetExceeded { worker: String, max_steps: usize },

    #[error("Supervisor made more than {max_decisions} decisions in one turn")]
    RoutingCycleExceeded { max_decisions: usize },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

impl From<LlmError> for AgentError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Timeout(secs) => {
                AgentError::ProviderUnavailable(format!("language model timed out after {secs}s"))
            }
            other => AgentError::Llm(other),
        }
    }
}

impl From<ToolError> for AgentError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::UnknownTool(name) => AgentError::UnknownTool(name),
            ToolError::InvalidArguments { tool, reason } => {
                AgentError::InvalidArguments { tool, reason }
            }
            ToolError::UpstreamFailure(msg) => AgentError::UpstreamFailure(msg),
            ToolError::ProviderUnavailable(msg) => AgentError::ProviderUnavailable(msg),
        }
    }
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 将纠正提示注入下一次决策，让 Supervisor 重试
    RetryWithPrompt(String),
    /// 重试耗尽后转到澄清节点，请用户补充信息
    FallbackToClarification,
    /// 终止本轮，返回致歉文本
    Abort(String),
}

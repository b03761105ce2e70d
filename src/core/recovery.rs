//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction：Supervisor 决策无法解析时带纠正提示重试，
//! 重试耗尽后转澄清节点；预算/循环/供应商错误终止本轮并给出致歉文本。

use crate::core::{AgentError, RecoveryAction};
use crate::graph::Route;
use crate::llm::LlmError;

#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    /// 决策失败时的最大重试次数
    decision_retries: usize,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self { decision_retries: 1 }
    }
}

impl RecoveryEngine {
    pub fn new(decision_retries: usize) -> Self {
        Self { decision_retries }
    }

    /// attempt 为已经进行过的重试次数
    pub fn handle(&self, err: &AgentError, attempt: usize) -> RecoveryAction {
        match err {
            AgentError::UnparsableDecision(_) | AgentError::Llm(LlmError::EmptyResponse) => {
                if attempt < self.decision_retries {
                    let routes: Vec<&str> = Route::ALL.iter().map(|r| r.as_str()).collect();
                    RecoveryAction::RetryWithPrompt(format!(
                        "Your previous reply could not be used ({}). Reply with ONLY a JSON object \
                         of the form {{\"next\": \"<route>\"}} where <route> is exactly one of: {}.",
                        err,
                        routes.join(", ")
                    ))
                } else {
                    RecoveryAction::FallbackToClarification
                }
            }
            other => RecoveryAction::Abort(self.apology(other)),
        }
    }

    /// 本轮失败时展示给用户的文本
    pub fn apology(&self, err: &AgentError) -> String {
        let reason = match err {
            AgentError::ProviderUnavailable(_) | AgentError::Llm(_) => {
                "one of the services I rely on is not responding right now"
            }
            AgentError::ReasoningBudgetExceeded { .. } | AgentError::RoutingCycleExceeded { .. } => {
                "I went around in circles trying to work that out"
            }
            AgentError::UnparsableDecision(_) => "I could not decide how to handle that",
            _ => "something went wrong on my side",
        };
        format!("Sorry, {}. Please try again or rephrase your request.", reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unparsable_decision_retries_then_falls_back() {
        let engine = RecoveryEngine::new(1);
        let err = AgentError::UnparsableDecision("FINISH".into());
        match engine.handle(&err, 0) {
            RecoveryAction::RetryWithPrompt(msg) => {
                assert!(msg.contains("\"next\""));
                assert!(msg.contains("HumanClarification"));
            }
            other => panic!("Expected RetryWithPrompt, got {:?}", other),
        }
        assert_eq!(engine.handle(&err, 1), RecoveryAction::FallbackToClarification);
    }

    #[test]
    fn test_zero_retries_goes_straight_to_clarification() {
        let engine = RecoveryEngine::new(0);
        let err = AgentError::Llm(LlmError::EmptyResponse);
        assert_eq!(engine.handle(&err, 0), RecoveryAction::FallbackToClarification);
    }

    #[test]
    fn test_structural_errors_abort_with_apology() {
        let engine = RecoveryEngine::default();
        let err = AgentError::RoutingCycleExceeded { max_decisions: 15 };
        match engine.handle(&err, 0) {
            RecoveryAction::Abort(msg) => assert!(msg.starts_with("Sorry")),
            other => panic!("Expected Abort, got {:?}", other),
        }
        let err = AgentError::ProviderUnavailable("timeout".into());
        assert!(engine.apology(&err).contains("not responding"));
    }
}

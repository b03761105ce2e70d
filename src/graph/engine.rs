//! 路由图执行引擎
//!
//! 每轮从 Supervisor 开始，节点严格顺序执行：
//! Supervisor 决策 -> 路由表映射到节点 -> worker 结果写入 agent history 后回到 Supervisor，
//! 直到终止节点给出回复（结束）、澄清节点提问（中断）或 end_chat 结束会话。
//! Supervisor 决策超过上限返回 RoutingCycleExceeded。

use std::collections::BTreeMap;

use crate::core::{AgentError, ConversationState, RecoveryAction, RecoveryEngine};
use crate::graph::{NodeName, Responder, Route, Supervisor, TurnOutcome, TurnResult};
use crate::memory::Message;
use crate::react::Worker;

/// 节点执行后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Goto(NodeName),
    /// 本轮结束
    End,
    /// 本轮中断，下一轮从指定节点继续
    InterruptThen(NodeName),
}

pub struct RoutingGraph {
    supervisor: Supervisor,
    workers: BTreeMap<NodeName, Worker>,
    terminal: (NodeName, Responder),
    clarification: Option<(NodeName, Responder)>,
    edges: BTreeMap<NodeName, Transition>,
    max_decisions: usize,
    recovery: RecoveryEngine,
}

impl RoutingGraph {
    pub(crate) fn new(
        supervisor: Supervisor,
        workers: BTreeMap<NodeName, Worker>,
        terminal: (NodeName, Responder),
        clarification: Option<(NodeName, Responder)>,
        edges: BTreeMap<NodeName, Transition>,
        max_decisions: usize,
        recovery: RecoveryEngine,
    ) -> Self {
        Self {
            supervisor,
            workers,
            terminal,
            clarification,
            edges,
            max_decisions,
            recovery,
        }
    }

    pub fn transition(&self, node: NodeName) -> Option<Transition> {
        self.edges.get(&node).copied()
    }

    pub fn max_decisions(&self) -> usize {
        self.max_decisions
    }

    pub fn recovery(&self) -> &RecoveryEngine {
        &self.recovery
    }

    /// Supervisor 决策：失败时按 RecoveryEngine 重试，重试耗尽转澄清节点
    async fn decide(&self, state: &ConversationState) -> Result<NodeName, AgentError> {
        let mut attempt = 0;
        let mut correction: Option<String> = None;
        loop {
            let err = match self.supervisor.decide(state, correction.as_deref()).await {
                Ok(route) => return self.resolve(route),
                Err(e) => e,
            };
            match self.recovery.handle(&err, attempt) {
                RecoveryAction::RetryWithPrompt(prompt) => {
                    tracing::warn!(error = %err, attempt, "supervisor decision rejected, retrying");
                    attempt += 1;
                    correction = Some(prompt);
                }
                RecoveryAction::FallbackToClarification => match &self.clarification {
                    Some((name, _)) => {
                        tracing::warn!(error = %err, "supervisor decision rejected, asking the user instead");
                        return Ok(*name);
                    }
                    None => return Err(err),
                },
                RecoveryAction::Abort(_) => return Err(err),
            }
        }
    }

    fn resolve(&self, route: Route) -> Result<NodeName, AgentError> {
        self.supervisor
            .routes()
            .resolve(route)
            .ok_or_else(|| AgentError::UnparsableDecision(format!("route {} is not available", route)))
    }

    /// 执行一轮；调用方负责在此之前把用户消息追加到 state
    pub async fn run_turn(&self, state: &mut ConversationState) -> Result<TurnResult, AgentError> {
        let mut path = Vec::new();
        let mut decisions = 0usize;
        let mut node = NodeName::Supervisor;
        state.set_next(node);

        loop {
            path.push(node);

            if node == NodeName::Supervisor {
                decisions += 1;
                if decisions > self.max_decisions {
                    return Err(AgentError::RoutingCycleExceeded {
                        max_decisions: self.max_decisions,
                    });
                }
                node = self.decide(state).await?;
                state.set_next(node);
                continue;
            }

            if let Some(worker) = self.workers.get(&node) {
                tracing::info!(node = %node, "running worker");
                let latest = state
                    .latest_user_message()
                    .cloned()
                    .unwrap_or_else(|| Message::user(""));
                let output = worker.run(&latest, state.agent_history()).await?;
                state.append_agent_history(Message::from_worker(node.as_str(), output.text.clone(), output.trace));
                if output.end_session {
                    state.append_message(Message::from_node(node.as_str(), output.text.clone()));
                    return Ok(TurnResult {
                        reply: output.text,
                        outcome: TurnOutcome::SessionEnded,
                        path,
                    });
                }
                node = self.follow(node)?;
                state.set_next(node);
                continue;
            }

            if node == self.terminal.0 {
                tracing::info!(node = %node, "composing reply");
                let reply = self.terminal.1.respond(state).await?;
                state.append_message(Message::from_node(node.as_str(), reply.clone()));
                state.set_next(NodeName::Supervisor);
                return Ok(TurnResult {
                    reply,
                    outcome: TurnOutcome::Completed,
                    path,
                });
            }

            if let Some((name, responder)) = &self.clarification {
                if node == *name {
                    tracing::info!(node = %node, "asking for clarification");
                    let question = responder.respond(state).await?;
                    state.append_message(Message::from_node(node.as_str(), question.clone()));
                    let resume = match self.transition(node) {
                        Some(Transition::InterruptThen(n)) | Some(Transition::Goto(n)) => n,
                        _ => NodeName::Supervisor,
                    };
                    state.set_next(resume);
                    return Ok(TurnResult {
                        reply: question,
                        outcome: TurnOutcome::AwaitingClarification,
                        path,
                    });
                }
            }

            return Err(AgentError::ConfigError(format!("node {} is not part of the graph", node)));
        }
    }

    /// worker 节点的后继
    fn follow(&self, node: NodeName) -> Result<NodeName, AgentError> {
        match self.transition(node) {
            Some(Transition::Goto(next)) => Ok(next),
            other => Err(AgentError::ConfigError(format!(
                "node {} has unexpected transition {:?}",
                node, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::graph::{GraphBuilder, RouteTable};
    use crate::llm::{LlmClient, ScriptedLlmClient};
    use crate::prompts;
    use crate::tools::{EndChatTool, ToolExecutor, ToolRegistry, GOODBYE};

    fn graph(llm: Arc<dyn LlmClient>, max_decisions: usize) -> RoutingGraph {
        let mut calendar_tools = ToolRegistry::new();
        calendar_tools.register(EndChatTool);
        GraphBuilder::new()
            .supervisor(Supervisor::new(llm.clone(), prompts::SUPERVISOR, RouteTable::standard(), Route::Calendar))
            .worker(
                NodeName::DateTime,
                Worker::new("DateTime", prompts::DATETIME_AGENT, llm.clone(), ToolExecutor::new(ToolRegistry::new(), 5), 3),
            )
            .worker(
                NodeName::Calendar,
                Worker::new("Calendar", prompts::CALENDAR_AGENT, llm.clone(), ToolExecutor::new(calendar_tools, 5), 3),
            )
            .terminal(NodeName::Communicate, Responder::new(llm.clone(), prompts::COMMUNICATOR))
            .clarification(NodeName::HumanClarification, Responder::new(llm, prompts::HUMAN_CLARIFICATION))
            .max_supervisor_decisions(max_decisions)
            .recovery(RecoveryEngine::new(1))
            .build()
            .unwrap()
    }

    fn state_with(text: &str) -> ConversationState {
        let mut state = ConversationState::new();
        state.append_message(Message::user(text));
        state
    }

    #[tokio::test]
    async fn test_workers_then_terminal() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"next": "DateTime"}"#,
            "Today is 2025-01-01.",
            r#"{"next": "Calendar"}"#,
            "No events on 2025-01-01.",
            r#"{"next": "Communicate"}"#,
            "You're free today!",
        ]));
        let g = graph(llm, 15);
        let mut state = state_with("anything today?");

        let result = g.run_turn(&mut state).await.unwrap();
        assert_eq!(result.outcome, TurnOutcome::Completed);
        assert_eq!(result.reply, "You're free today!");
        assert_eq!(
            result.path,
            vec![
                NodeName::Supervisor,
                NodeName::DateTime,
                NodeName::Supervisor,
                NodeName::Calendar,
                NodeName::Supervisor,
                NodeName::Communicate,
            ]
        );
        assert_eq!(state.agent_history().len(), 2);
        assert_eq!(state.agent_history()[0].label(), "DateTime");
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.messages()[1].label(), "Communicate");
    }

    #[tokio::test]
    async fn test_routing_cycle_exceeded() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()).with_fallback(r#"{"next": "DateTime"}"#));
        let g = graph(llm.clone(), 3);
        let mut state = state_with("loop forever");

        let err = g.run_turn(&mut state).await.unwrap_err();
        assert!(matches!(err, AgentError::RoutingCycleExceeded { max_decisions: 3 }));
        // 3 次决策 + 3 次 worker 运行
        assert_eq!(llm.call_count(), 6);
        assert_eq!(state.agent_history().len(), 3);
    }

    #[tokio::test]
    async fn test_unparsable_decision_is_retried() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"next": "FINISH"}"#,
            r#"{"next": "Communicate"}"#,
            "Hello!",
        ]));
        let g = graph(llm.clone(), 15);
        let mut state = state_with("hi");

        let result = g.run_turn(&mut state).await.unwrap();
        assert_eq!(result.reply, "Hello!");
        assert_eq!(result.path, vec![NodeName::Supervisor, NodeName::Communicate]);
        let retry_prompt = &llm.requests()[1];
        assert!(retry_prompt.last().unwrap().content.contains("could not be used"));
    }

    #[tokio::test]
    async fn test_repeated_unparsable_falls_back_to_clarification() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "I think the calendar agent",
            "definitely calendar",
            "Which calendar do you mean, work or personal?",
        ]));
        let g = graph(llm, 15);
        let mut state = state_with("move my thing");

        let result = g.run_turn(&mut state).await.unwrap();
        assert_eq!(result.outcome, TurnOutcome::AwaitingClarification);
        assert_eq!(result.path, vec![NodeName::Supervisor, NodeName::HumanClarification]);
        assert_eq!(state.next(), NodeName::Supervisor);
        assert_eq!(state.messages().last().unwrap().label(), "HumanClarification");
    }

    #[tokio::test]
    async fn test_end_chat_ends_session() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"next": "Calendar"}"#, r#"{"tool": "end_chat"}"#]));
        let g = graph(llm, 15);
        let mut state = state_with("thanks, that's all");

        let result = g.run_turn(&mut state).await.unwrap();
        assert_eq!(result.outcome, TurnOutcome::SessionEnded);
        assert_eq!(result.reply, GOODBYE);
        assert_eq!(state.agent_history()[0].tool_calls()[0].tool, "end_chat");
    }

    #[tokio::test]
    async fn test_missing_next_uses_default_route() {
        let llm = Arc::new(ScriptedLlmClient::new([
            "{}",
            "Found 1 event.",
            r#"{"next": "Communicate"}"#,
            "One event.",
        ]));
        let g = graph(llm, 15);
        let mut state = state_with("events?");
        let result = g.run_turn(&mut state).await.unwrap();
        assert_eq!(result.path[1], NodeName::Calendar);
    }
}

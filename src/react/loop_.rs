//! Worker 推理循环
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到模型给出最终答案或达到步数上限。
//! 工具失败以文本 observation 回填给模型，worker 自己不重试；格式错误同样回填并消耗一步。
//! Worker 本身无状态，所有可变状态都在 ConversationState 中。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{render_transcript, Message, ToolCallRecord};
use crate::react::{parse_llm_output, WorkerStep};
use crate::tools::{tool_call_format_instructions, ToolEffect, ToolExecutor};

/// 日志中模型输出预览的最大字符数
const OUTPUT_PREVIEW_CHARS: usize = 200;

/// 一次 worker 运行的结果
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutput {
    pub text: String,
    pub trace: Vec<ToolCallRecord>,
    /// 运行中调用了 end_chat
    pub end_session: bool,
}

pub struct Worker {
    name: String,
    system_prompt: String,
    llm: Arc<dyn LlmClient>,
    tools: ToolExecutor,
    max_steps: usize,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tools: ToolExecutor,
        max_steps: usize,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            llm,
            tools,
            max_steps: max_steps.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.tool_names()
    }

    /// system = 角色 prompt + 可用工具 schema + 输出格式 + 其他 worker 的历史输出
    fn build_system(&self, agent_history: &[Message]) -> String {
        format!(
            "{}\n\nAvailable tools:\n{}\n\n{}\n\nWork done so far by other agents:\n{}",
            self.system_prompt,
            self.tools.schema_json(),
            tool_call_format_instructions(),
            render_transcript(agent_history)
        )
    }

    /// 以最新一条用户消息和 agent history 为输入运行到最终答案
    pub async fn run(
        &self,
        latest_user: &Message,
        agent_history: &[Message],
    ) -> Result<WorkerOutput, AgentError> {
        let mut messages = vec![
            Message::system(self.build_system(agent_history)),
            latest_user.clone(),
        ];
        let mut trace = Vec::new();

        for step in 0..self.max_steps {
            let output = self.llm.complete(&messages).await?;
            tracing::debug!(
                worker = %self.name,
                step,
                output = %output.chars().take(OUTPUT_PREVIEW_CHARS).collect::<String>(),
                "worker step"
            );

            match parse_llm_output(&output) {
                Ok(WorkerStep::FinalAnswer(text)) => {
                    tracing::info!(worker = %self.name, steps = step + 1, tool_calls = trace.len(), "worker finished");
                    return Ok(WorkerOutput {
                        text,
                        trace,
                        end_session: false,
                    });
                }
                Ok(WorkerStep::ToolCall(tc)) => {
                    let (observation, ok, effect) = match self.tools.execute(&tc.tool, tc.args.clone()).await {
                        Ok(out) => (out.content, true, out.effect),
                        Err(e) => {
                            tracing::warn!(worker = %self.name, tool = %tc.tool, error = %e, "tool failed");
                            (e.to_observation(), false, ToolEffect::None)
                        }
                    };
                    trace.push(ToolCallRecord {
                        tool: tc.tool.clone(),
                        args: tc.args,
                        observation: observation.clone(),
                        ok,
                    });
                    if effect == ToolEffect::EndSession {
                        tracing::info!(worker = %self.name, "session end requested");
                        return Ok(WorkerOutput {
                            text: observation,
                            trace,
                            end_session: true,
                        });
                    }
                    // 将工具调用与结果写回对话，供下一轮 Plan 使用
                    messages.push(Message::assistant(output));
                    messages.push(Message::user(format!(
                        "Observation from {}: {}",
                        tc.tool, observation
                    )));
                }
                Err(e) => {
                    tracing::warn!(worker = %self.name, error = %e, "unparsable worker output");
                    messages.push(Message::assistant(output));
                    messages.push(Message::user(format!(
                        "Your last reply could not be parsed ({}). Reply with exactly one JSON tool call, or with your final answer as plain text.",
                        e
                    )));
                }
            }
        }

        Err(AgentError::ReasoningBudgetExceeded {
            worker: self.name.clone(),
            max_steps: self.max_steps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::tools::{EndChatTool, ToolRegistry};

    fn executor() -> ToolExecutor {
        let mut reg = ToolRegistry::new();
        reg.register(EndChatTool);
        ToolExecutor::new(reg, 5)
    }

    #[tokio::test]
    async fn test_final_answer_without_tools() {
        let llm = Arc::new(ScriptedLlmClient::new(["All clear."]));
        let worker = Worker::new("Calendar", "You manage calendars.", llm.clone(), executor(), 3);
        let history = vec![Message::from_node("DateTime", "It is 2025-01-01")];
        let out = worker.run(&Message::user("anything today?"), &history).await.unwrap();
        assert_eq!(out.text, "All clear.");
        assert!(out.trace.is_empty());

        let system = &llm.requests()[0][0].content;
        assert!(system.starts_with("You manage calendars."));
        assert!(system.contains("end_chat"));
        assert!(system.contains("[DateTime] It is 2025-01-01"));
    }

    #[tokio::test]
    async fn test_tool_failure_becomes_observation() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "teleport", "args": {}}"#,
            "Sorry, I cannot do that.",
        ]));
        let worker = Worker::new("Calendar", "p", llm.clone(), executor(), 3);
        let out = worker.run(&Message::user("go"), &[]).await.unwrap();
        assert_eq!(out.trace.len(), 1);
        assert!(!out.trace[0].ok);

        let second = &llm.requests()[1];
        let observation = &second.last().unwrap().content;
        assert!(observation.starts_with("Observation from teleport: Error: tool 'teleport' does not exist"));
    }

    #[tokio::test]
    async fn test_end_chat_stops_loop() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"tool": "end_chat"}"#, "unreachable"]));
        let worker = Worker::new("Calendar", "p", llm.clone(), executor(), 3);
        let out = worker.run(&Message::user("bye"), &[]).await.unwrap();
        assert!(out.end_session);
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_budget_exceeded() {
        let llm = Arc::new(ScriptedLlmClient::new(Vec::<String>::new()).with_fallback("{\"tool\": \"teleport\"}"));
        let worker = Worker::new("DateTime", "p", llm.clone(), executor(), 2);
        let err = worker.run(&Message::user("loop"), &[]).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::ReasoningBudgetExceeded { ref worker, max_steps: 2 } if worker == "DateTime"
        ));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_output_consumes_a_step() {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"tool": "end_chat", "args": }"#, "Fine."]));
        let worker = Worker::new("Calendar", "p", llm.clone(), executor(), 3);
        let out = worker.run(&Message::user("hm"), &[]).await.unwrap();
        assert_eq!(out.text, "Fine.");
        assert!(llm.requests()[1].last().unwrap().content.contains("could not be parsed"));
    }
}

//! 回复节点：Communicate（终止节点）与 HumanClarification（澄清节点）
//!
//! 两者都只读取最新一条用户消息与 agent history，调用一次模型，产出面向用户的文本。

use std::sync::Arc;

use crate::core::{AgentError, ConversationState};
use crate::llm::LlmClient;
use crate::memory::{render_transcript, Message};
use crate::prompts;

pub struct Responder {
    llm: Arc<dyn LlmClient>,
    /// 含 {agent_history} 占位符的模板
    template: String,
}

impl Responder {
    pub fn new(llm: Arc<dyn LlmClient>, template: impl Into<String>) -> Self {
        Self {
            llm,
            template: template.into(),
        }
    }

    pub async fn respond(&self, state: &ConversationState) -> Result<String, AgentError> {
        let history = render_transcript(state.agent_history());
        let system = prompts::render(&self.template, &[("agent_history", history.as_str())]);
        let mut messages = vec![Message::system(system)];
        if let Some(latest) = state.latest_user_message() {
            messages.push(latest.clone());
        }
        let reply = self.llm.complete(&messages).await?;
        Ok(reply.trim().to_string())
    }
}

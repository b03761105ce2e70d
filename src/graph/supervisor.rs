//! Supervisor：由模型选择下一个节点
//!
//! 输出格式为 `{"next": "<Route>"}`，schema 由 schemars 生成并注入 prompt。
//! 解析规则：缺少 next 时使用默认路由；next 不在路由表内、或输出根本不是 JSON 对象时返回 UnparsableDecision，
//! 从不静默兜底。

use std::sync::Arc;

use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use serde_json::Value;

use crate::core::{AgentError, ConversationState};
use crate::graph::{Route, RouteTable};
use crate::llm::LlmClient;
use crate::memory::{render_transcript, Message};
use crate::prompts;
use crate::react::planner::extract_json;

/// Supervisor 的结构化输出
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SupervisorDecision {
    /// The team member that should act next
    #[serde(default)]
    pub next: Option<Route>,
}

/// 注入 prompt 的输出格式说明
pub fn decision_format_instructions() -> String {
    let schema = serde_json::to_string_pretty(&schema_for!(SupervisorDecision)).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
         ```\n{}\n```\n\
         Respond with ONLY the JSON object, for example {{\"next\": \"Calendar\"}}.",
        schema
    )
}

/// 将模型原始输出解析为路由；只接受路由表中的值
pub fn parse_decision(raw: &str, routes: &RouteTable, default_route: Route) -> Result<Route, AgentError> {
    let json_str = extract_json(raw).ok_or_else(|| AgentError::UnparsableDecision(raw.trim().to_string()))?;
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| AgentError::UnparsableDecision(format!("{}: {}", e, json_str)))?;
    if !value.is_object() {
        return Err(AgentError::UnparsableDecision(json_str.to_string()));
    }
    let decision: SupervisorDecision = serde_json::from_value(value)
        .map_err(|e| AgentError::UnparsableDecision(format!("{}: {}", e, json_str)))?;
    let route = decision.next.unwrap_or(default_route);
    if routes.contains(route) {
        Ok(route)
    } else {
        Err(AgentError::UnparsableDecision(format!("route {} is not available", route)))
    }
}

pub struct Supervisor {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    routes: RouteTable,
    default_route: Route,
}

impl Supervisor {
    /// template 支持 {members} / {options} / {format_instructions} 占位符
    pub fn new(llm: Arc<dyn LlmClient>, template: &str, routes: RouteTable, default_route: Route) -> Self {
        let names: Vec<&str> = routes.routes().iter().map(|r| r.as_str()).collect();
        let options = format!("[{}]", names.iter().map(|n| format!("'{}'", n)).collect::<Vec<_>>().join(", "));
        let members = names.join(", ");
        let format_instructions = decision_format_instructions();
        let system_prompt = prompts::render(
            template,
            &[
                ("members", members.as_str()),
                ("options", options.as_str()),
                ("format_instructions", format_instructions.as_str()),
            ],
        );
        Self {
            llm,
            system_prompt,
            routes,
            default_route,
        }
    }

    pub fn default_route(&self) -> Route {
        self.default_route
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn build_messages(&self, state: &ConversationState, correction: Option<&str>) -> Vec<Message> {
        let latest = state
            .latest_user_message()
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let mut messages = vec![
            Message::system(self.system_prompt.clone()),
            Message::user(format!(
                "Conversation so far:\n{}\n\nWork done by the team in this conversation:\n{}\n\nLatest user message: {}",
                render_transcript(state.messages()),
                render_transcript(state.agent_history()),
                latest
            )),
        ];
        if let Some(c) = correction {
            messages.push(Message::user(c.to_string()));
        }
        messages
    }

    /// 选择下一个路由；correction 为上一次失败后的纠正提示
    pub async fn decide(
        &self,
        state: &ConversationState,
        correction: Option<&str>,
    ) -> Result<Route, AgentError> {
        let raw = self.llm.complete(&self.build_messages(state, correction)).await?;
        let route = parse_decision(&raw, &self.routes, self.default_route)?;
        tracing::info!(route = %route, "supervisor decision");
        Ok(route)
    }
}

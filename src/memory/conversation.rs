//! 消息模型：用户可见对话与智能体内部历史共用的单条消息
//!
//! Message 一经创建即不可变；Conversation State 只追加、不修改、不删除。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单次工具调用记录（Worker 的 call trace）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub args: serde_json::Value,
    /// 工具返回给模型的文本（失败时为错误说明）
    pub observation: String,
    pub ok: bool,
}

/// 消息附带的结构化元数据
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
}

/// 单条消息；name 标记产生该消息的节点（如 "Calendar"），用户消息为 None
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            name: None,
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            name: None,
            metadata: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            name: None,
            metadata: None,
        }
    }

    /// 由某个图节点产生的 assistant 消息
    pub fn from_node(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::assistant(content)
        }
    }

    /// Worker 输出：附带本次运行的工具调用轨迹
    pub fn from_worker(
        name: impl Into<String>,
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRecord>,
    ) -> Self {
        let metadata = if tool_calls.is_empty() {
            None
        } else {
            Some(MessageMetadata { tool_calls })
        };
        Self {
            metadata,
            ..Self::from_node(name, content)
        }
    }

    /// 渲染进 prompt 时使用的标签：节点名优先，否则为角色
    pub fn label(&self) -> &str {
        match (&self.name, &self.role) {
            (Some(name), _) => name,
            (None, Role::User) => "user",
            (None, Role::Assistant) => "assistant",
            (None, Role::System) => "system",
        }
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        self.metadata
            .as_ref()
            .map(|m| m.tool_calls.as_slice())
            .unwrap_or(&[])
    }
}

/// 渲染为 `[label] content` 逐行文本，供拼入 prompt；空列表返回 "(none)"
pub fn render_transcript(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "(none)".to_string();
    }
    messages
        .iter()
        .map(|m| format!("[{}] {}", m.label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

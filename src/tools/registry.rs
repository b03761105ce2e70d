//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找。
//! 参数由 serde 反序列化为各工具的参数结构体，schema 由 schemars 从同一结构体生成，两者不会漂移。
//! 工具失败统一为 ToolError，交给 worker 时转成文本 observation，不会以错误形式打断推理循环。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::calendar::CalendarError;

/// 工具执行的副作用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolEffect {
    #[default]
    None,
    /// 结束当前会话（end_chat）
    EndSession,
}

/// 工具输出：文本结果 + 副作用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub content: String,
    pub effect: ToolEffect,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            effect: ToolEffect::None,
        }
    }

    pub fn end_session(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            effect: ToolEffect::EndSession,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl ToolError {
    /// 作为 observation 回填给模型的文本
    pub fn to_observation(&self) -> String {
        match self {
            ToolError::UnknownTool(name) => {
                format!("Error: tool '{}' does not exist. Use one of the listed tools.", name)
            }
            ToolError::InvalidArguments { tool, reason } => format!(
                "Error: invalid arguments for '{}': {}. Check the parameter schema and try again.",
                tool, reason
            ),
            other => format!("Error: {}", other),
        }
    }
}

impl From<CalendarError> for ToolError {
    fn from(e: CalendarError) -> Self {
        match e {
            CalendarError::Unavailable(msg) => ToolError::ProviderUnavailable(msg),
            other => ToolError::UpstreamFailure(other.to_string()),
        }
    }
}

/// 将 JSON 参数解析为工具参数结构体；null 视为空对象
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

/// 由参数结构体生成 JSON Schema
pub fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（用于 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema；默认无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>；同名后注册者覆盖
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 按名调用工具
    pub async fn invoke(&self, name: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(args).await
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// 取出若干工具组成 worker 绑定的子集；任一名称未注册则失败
    pub fn subset(&self, names: &[&str]) -> Result<ToolRegistry, ToolError> {
        let mut sub = ToolRegistry::new();
        for name in names {
            let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
            sub.register_arc(tool);
        }
        Ok(sub)
    }

    /// 工具列表 JSON（name / description / parameters），注入 system prompt
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|(name, tool)| {
                serde_json::json!({
                    "name": name,
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, JsonSchema)]
    struct ShoutArgs {
        text: String,
    }

    struct ShoutTool;

    #[async_trait]
    impl Tool for ShoutTool {
        fn name(&self) -> &str {
            "shout"
        }

        fn description(&self) -> &str {
            "Upper-cases text."
        }

        fn parameters_schema(&self) -> Value {
            schema_of::<ShoutArgs>()
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
            let args: ShoutArgs = parse_args(self.name(), args)?;
            Ok(ToolOutput::text(args.text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_invoke_and_errors() {
        let mut reg = ToolRegistry::new();
        reg.register(ShoutTool);

        let out = reg.invoke("shout", serde_json::json!({"text": "hi"})).await.unwrap();
        assert_eq!(out, ToolOutput::text("HI"));

        let err = reg.invoke("whisper", Value::Null).await.unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("whisper".into()));

        let err = reg.invoke("shout", serde_json::json!({"txt": 1})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "shout"));
        assert!(err.to_observation().contains("invalid arguments"));
    }

    #[test]
    fn test_subset_and_schema() {
        let mut reg = ToolRegistry::new();
        reg.register(ShoutTool);
        assert!(reg.subset(&["shout", "missing"]).is_err());

        let sub = reg.subset(&["shout"]).unwrap();
        assert_eq!(sub.tool_names(), vec!["shout".to_string()]);
        let schema = sub.to_schema_json();
        assert!(schema.contains("\"text\""));
        assert!(schema.contains("Upper-cases text."));
    }

    #[test]
    fn test_calendar_error_mapping() {
        let e: ToolError = CalendarError::Unavailable("timeout".into()).into();
        assert!(matches!(e, ToolError::ProviderUnavailable(_)));
        let e: ToolError = CalendarError::Auth("401".into()).into();
        assert!(matches!(e, ToolError::UpstreamFailure(_)));
    }
}

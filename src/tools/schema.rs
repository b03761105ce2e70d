//! 工具调用 JSON Schema 生成（schemars）
//!
//! 将「合法 tool call」的 JSON 结构注入 worker 的 system prompt，减少模型输出格式错误。

use schemars::{schema_for, JsonSchema};
use serde_json::{Map, Value};

/// 工具调用请求格式：与 worker 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，必须是可用工具列表中的一个
    pub tool: String,
    /// 工具参数，结构见对应工具的 parameters
    pub args: Map<String, Value>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// worker 的输出格式说明：调用工具输出一个 JSON 对象，否则直接输出最终答案文本
pub fn tool_call_format_instructions() -> String {
    format!(
        "To call a tool, reply with ONLY a JSON object matching this schema:\n{}\n\
         Call at most one tool per reply. When you have everything you need, \
         reply with your final answer as plain text (no JSON).",
        tool_call_schema_json()
    )
}

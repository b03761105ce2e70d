//! Planner：解析模型单步输出
//!
//! parse_llm_output 从文本中提取 JSON：`{"tool": ..., "args": ...}` 为工具调用，
//! `{"final_answer": ...}` 或不含 JSON 的纯文本为最终答案；看起来是 JSON 却无法解析时返回 MalformedStep，
//! 由 worker 把错误说明回填给模型。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// 模型请求的工具调用（`{"tool": "fetch_events", "args": {"count": 5}}`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// worker 单步结果
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerStep {
    FinalAnswer(String),
    ToolCall(ToolCall),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed tool call: {0}")]
pub struct MalformedStep(pub String);

/// 提取 ```json 代码块或首个 `{` 到末个 `}` 之间的内容
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim()));
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// 解析模型输出为 WorkerStep
pub fn parse_llm_output(output: &str) -> Result<WorkerStep, MalformedStep> {
    let trimmed = output.trim();
    let Some(json_str) = extract_json(trimmed) else {
        return Ok(WorkerStep::FinalAnswer(trimmed.to_string()));
    };

    match serde_json::from_str::<Value>(json_str) {
        Ok(Value::Object(map)) => {
            if let Some(tool) = map.get("tool").and_then(Value::as_str) {
                if tool.trim().is_empty() {
                    return Err(MalformedStep("empty tool name".into()));
                }
                return Ok(WorkerStep::ToolCall(ToolCall {
                    tool: tool.to_string(),
                    args: map.get("args").cloned().unwrap_or(Value::Null),
                }));
            }
            if let Some(answer) = map.get("final_answer").and_then(Value::as_str) {
                return Ok(WorkerStep::FinalAnswer(answer.to_string()));
            }
            // 普通 JSON 数据（如模型直接给出事件列表）视为答案
            Ok(WorkerStep::FinalAnswer(trimmed.to_string()))
        }
        Ok(_) => Ok(WorkerStep::FinalAnswer(trimmed.to_string())),
        Err(e) => {
            // 只有整段以 JSON 开头（明显想调用工具）才算格式错误，否则是夹带花括号的普通文本
            if trimmed.starts_with('{') || trimmed.starts_with("```") {
                Err(MalformedStep(format!("{}: {}", e, json_str)))
            } else {
                Ok(WorkerStep::FinalAnswer(trimmed.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_final_answer() {
        assert_eq!(
            parse_llm_output("  You have 2 meetings today. ").unwrap(),
            WorkerStep::FinalAnswer("You have 2 meetings today.".into())
        );
    }

    #[test]
    fn test_tool_call_variants() {
        let step = parse_llm_output(r#"{"tool": "fetch_events", "args": {"count": 3}}"#).unwrap();
        assert_eq!(
            step,
            WorkerStep::ToolCall(ToolCall {
                tool: "fetch_events".into(),
                args: serde_json::json!({"count": 3})
            })
        );

        let fenced = "I'll check.\n```json\n{\"tool\": \"current_datetime\"}\n```";
        match parse_llm_output(fenced).unwrap() {
            WorkerStep::ToolCall(tc) => {
                assert_eq!(tc.tool, "current_datetime");
                assert!(tc.args.is_null());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_final_answer_object_and_braces_in_text() {
        assert_eq!(
            parse_llm_output(r#"{"final_answer": "done"}"#).unwrap(),
            WorkerStep::FinalAnswer("done".into())
        );
        let text = "Use the {name} placeholder.";
        assert_eq!(parse_llm_output(text).unwrap(), WorkerStep::FinalAnswer(text.into()));
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_llm_output(r#"{"tool": "fetch_events", "args": {"count": }"#).is_err());
        assert!(parse_llm_output(r#"{"tool": ""}"#).is_err());
    }
}

//! end_chat：用户满意并希望结束对话时调用，发出会话终止信号（不会退出进程）

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolError, ToolOutput};

pub const GOODBYE: &str = "Goodbye, will see you again 👋";

pub struct EndChatTool;

#[async_trait]
impl Tool for EndChatTool {
    fn name(&self) -> &str {
        "end_chat"
    }

    fn description(&self) -> &str {
        "Execute this if the user is satisfied and wants to end the chat. Takes no arguments."
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::end_session(GOODBYE))
    }
}

//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Gemini / DeepSeek / Mock）

pub mod mock;
pub mod openai;
pub mod providers;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use providers::{create_deepseek_client, create_gemini_client, DEEPSEEK_CHAT, GEMINI_FLASH};
pub use traits::{LlmClient, LlmError, TimeoutLlmClient};

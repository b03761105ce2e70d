//! Jarvis - Rust 日历助手
//!
//! 模块划分：
//! - **calendar**: 日历供应商抽象（Google REST / 内存）、时区换算、文本渲染
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、会话状态、装配
//! - **graph**: 路由表、Supervisor、回复节点、路由图构建与执行
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Gemini / DeepSeek / Mock）
//! - **memory**: 消息模型
//! - **react**: worker 推理循环与单步解析
//! - **session**: checkpoint 存储与会话管理
//! - **tools**: 时间/日历工具、注册表与执行器

pub mod calendar;
pub mod config;
pub mod core;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompts;
pub mod react;
pub mod session;
pub mod tools;

//! 装配：根据配置创建 LLM、日历供应商、工具、worker、Supervisor、路由图与会话管理器

use std::sync::Arc;

use crate::calendar::{CalendarProvider, GoogleCalendarClient, InMemoryCalendar, SystemClock, TimeZoneConfig};
use crate::config::AppConfig;
use crate::core::{AgentError, RecoveryEngine};
use crate::graph::{GraphBuilder, NodeName, Responder, Route, RouteTable, RoutingGraph, Supervisor};
use crate::llm::{create_deepseek_client, create_gemini_client, LlmClient, MockLlmClient, OpenAiClient, TimeoutLlmClient};
use crate::prompts;
use crate::react::Worker;
use crate::session::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, SessionManager};
use crate::tools::{default_registry, ToolContext, ToolExecutor, CALENDAR_TOOLS, DATETIME_TOOLS};

/// 根据配置与环境变量选择 LLM 后端（Gemini / DeepSeek / OpenAI 兼容 / Mock），并加上单次调用超时
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let model = cfg.llm.model.as_deref();
    let has_key = |name: &str| std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false);

    let inner: Arc<dyn LlmClient> = match provider.as_str() {
        "gemini" if has_key("GEMINI_API_KEY") => {
            tracing::info!(model = model.unwrap_or(crate::llm::GEMINI_FLASH), "using Gemini LLM");
            Arc::new(create_gemini_client(model, None))
        }
        "deepseek" if has_key("DEEPSEEK_API_KEY") || has_key("OPENAI_API_KEY") => {
            tracing::info!(model = model.unwrap_or(crate::llm::DEEPSEEK_CHAT), "using DeepSeek LLM");
            Arc::new(create_deepseek_client(model))
        }
        "openai" if has_key("OPENAI_API_KEY") => {
            let model = model.unwrap_or("gpt-4o-mini");
            tracing::info!(model, "using OpenAI-compatible LLM");
            Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref(), model, None))
        }
        "mock" => Arc::new(MockLlmClient),
        other => {
            tracing::warn!(provider = other, "no API key set or provider unknown, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    };
    Arc::new(TimeoutLlmClient::new(inner, cfg.llm.timeouts.request))
}

pub fn create_timezone(cfg: &AppConfig) -> Result<TimeZoneConfig, AgentError> {
    TimeZoneConfig::from_offset_str(&cfg.app.timezone).map_err(|e| AgentError::ConfigError(e.to_string()))
}

/// google（默认）或 memory
pub fn create_calendar_provider(cfg: &AppConfig, tz: TimeZoneConfig) -> Result<Arc<dyn CalendarProvider>, AgentError> {
    match cfg.calendar.provider.to_lowercase().as_str() {
        "google" => Ok(Arc::new(GoogleCalendarClient::new(
            cfg.calendar.base_url.clone(),
            cfg.calendar.token_file.clone(),
            cfg.calendar.request_timeout_secs,
            tz,
        ))),
        "memory" => {
            tracing::info!("using in-memory calendar");
            Ok(Arc::new(InMemoryCalendar::new()))
        }
        other => Err(AgentError::ConfigError(format!("unknown calendar provider: {}", other))),
    }
}

/// checkpoint_dir 未配置时使用内存存储
pub fn create_checkpoint_store(cfg: &AppConfig) -> Arc<dyn CheckpointStore> {
    match &cfg.session.checkpoint_dir {
        Some(dir) => Arc::new(FileCheckpointStore::new(dir)),
        None => Arc::new(MemoryCheckpointStore::new()),
    }
}

/// 用给定的 LLM 与工具上下文组装标准路由图
pub fn build_graph(cfg: &AppConfig, llm: Arc<dyn LlmClient>, ctx: Arc<ToolContext>) -> Result<RoutingGraph, AgentError> {
    let default_route = Route::parse(&cfg.graph.default_route)
        .ok_or_else(|| AgentError::ConfigError(format!("invalid default_route: {}", cfg.graph.default_route)))?;

    let registry = default_registry(ctx);
    let timeout = cfg.tools.tool_timeout_secs;
    let steps = cfg.graph.max_worker_steps;
    let datetime_tools = ToolExecutor::new(registry.subset(DATETIME_TOOLS)?, timeout);
    let calendar_tools = ToolExecutor::new(registry.subset(CALENDAR_TOOLS)?, timeout);

    GraphBuilder::new()
        .supervisor(Supervisor::new(
            llm.clone(),
            &prompts::load_prompt("supervisor", prompts::SUPERVISOR),
            RouteTable::standard(),
            default_route,
        ))
        .worker(
            NodeName::DateTime,
            Worker::new(
                NodeName::DateTime.as_str(),
                prompts::load_prompt("datetime", prompts::DATETIME_AGENT),
                llm.clone(),
                datetime_tools,
                steps,
            ),
        )
        .worker(
            NodeName::Calendar,
            Worker::new(
                NodeName::Calendar.as_str(),
                prompts::load_prompt("calendar", prompts::CALENDAR_AGENT),
                llm.clone(),
                calendar_tools,
                steps,
            ),
        )
        .terminal(
            NodeName::Communicate,
            Responder::new(llm.clone(), prompts::load_prompt("communicator", prompts::COMMUNICATOR)),
        )
        .clarification(
            NodeName::HumanClarification,
            Responder::new(llm, prompts::load_prompt("clarification", prompts::HUMAN_CLARIFICATION)),
        )
        .max_supervisor_decisions(cfg.graph.max_supervisor_decisions)
        .recovery(RecoveryEngine::new(cfg.graph.decision_retries))
        .build()
        .map_err(|e| AgentError::ConfigError(e.to_string()))
}

/// 按配置创建完整的助手
pub fn create_assistant(cfg: &AppConfig) -> Result<SessionManager, AgentError> {
    let tz = create_timezone(cfg)?;
    let provider = create_calendar_provider(cfg, tz)?;
    let ctx = ToolContext::new(provider, Arc::new(SystemClock), tz)
        .with_default_calendar(cfg.calendar.primary_calendar.clone())
        .with_event_limit(cfg.calendar.event_limit);
    let llm = create_llm_from_config(cfg);
    let graph = build_graph(cfg, llm, Arc::new(ctx))?;
    tracing::info!(
        max_decisions = graph.max_decisions(),
        default_route = %cfg.graph.default_route,
        "routing graph ready"
    );
    Ok(SessionManager::new(Arc::new(graph), create_checkpoint_store(cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        cfg.calendar.provider = "memory".to_string();
        cfg
    }

    #[test]
    fn test_bad_default_route_is_config_error() {
        let mut cfg = offline();
        cfg.graph.default_route = "FINISH".to_string();
        assert!(matches!(create_assistant(&cfg), Err(AgentError::ConfigError(_))));
    }

    #[test]
    fn test_bad_timezone_and_provider() {
        let mut cfg = offline();
        cfg.app.timezone = "Asia/Kolkata".to_string();
        assert!(matches!(create_assistant(&cfg), Err(AgentError::ConfigError(_))));

        let mut cfg = offline();
        cfg.calendar.provider = "outlook".to_string();
        assert!(matches!(create_assistant(&cfg), Err(AgentError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_offline_assistant_answers() {
        let assistant = create_assistant(&offline()).unwrap();
        let reply = assistant.submit_user_message("t1", "hello").await.unwrap();
        assert_eq!(reply.text, "Echo from Mock: hello");
        assert!(!reply.ended);
        let state = assistant.state("t1").await.unwrap();
        assert_eq!(state.messages().len(), 2);
    }
}

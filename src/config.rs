//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `JARVIS__*` 覆盖（双下划线表示嵌套，如 `JARVIS__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::calendar::{DEFAULT_UTC_OFFSET, EVENT_LIMIT, GOOGLE_CALENDAR_BASE_URL, PRIMARY_CALENDAR};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub calendar: CalendarSection,
    pub tools: ToolsSection,
    pub graph: GraphSection,
    pub session: SessionSection,
}

/// [app] 段：应用名、时区偏移、CLI 使用的会话 id
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 固定 UTC 偏移，如 "+05:30"
    pub timezone: String,
    pub session_id: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Jarvis".to_string(),
            timezone: DEFAULT_UTC_OFFSET.to_string(),
            session_id: "default-thread".to_string(),
        }
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// gemini / deepseek / openai / mock
    pub provider: String,
    /// 未设置时使用各后端的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次 complete 调用超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [calendar] 段：供应商、REST 地址、默认日历、令牌文件、条数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    /// google / memory
    pub provider: String,
    pub base_url: String,
    pub primary_calendar: String,
    pub token_file: PathBuf,
    pub event_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            base_url: GOOGLE_CALENDAR_BASE_URL.to_string(),
            primary_calendar: PRIMARY_CALENDAR.to_string(),
            token_file: PathBuf::from("token.json"),
            event_limit: EVENT_LIMIT,
            request_timeout_secs: 30,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self { tool_timeout_secs: 30 }
    }
}

/// [graph] 段：路由图的步数上限与默认路由
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    /// 单轮内 Supervisor 决策次数上限
    pub max_supervisor_decisions: usize,
    /// 单个 worker 的推理步数上限
    pub max_worker_steps: usize,
    /// 决策对象缺少 next 字段时使用的路由
    pub default_route: String,
    /// 决策无法解析时的重试次数，耗尽后转澄清节点
    pub decision_retries: usize,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            max_supervisor_decisions: 15,
            max_worker_steps: 10,
            default_route: "Calendar".to_string(),
            decision_retries: 1,
        }
    }
}

/// [session] 段：checkpoint_dir 未设置时使用内存存储
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub checkpoint_dir: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 JARVIS__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 JARVIS__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("JARVIS")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

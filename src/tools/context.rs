//! 日历/时间工具共享的依赖：供应商、时钟、时区、默认日历与条数上限

use std::sync::Arc;

use crate::calendar::{CalendarProvider, Clock, TimeZoneConfig, EVENT_LIMIT, PRIMARY_CALENDAR};

#[derive(Clone)]
pub struct ToolContext {
    pub provider: Arc<dyn CalendarProvider>,
    pub clock: Arc<dyn Clock>,
    pub tz: TimeZoneConfig,
    pub default_calendar: String,
    pub event_limit: usize,
}

impl ToolContext {
    pub fn new(provider: Arc<dyn CalendarProvider>, clock: Arc<dyn Clock>, tz: TimeZoneConfig) -> Self {
        Self {
            provider,
            clock,
            tz,
            default_calendar: PRIMARY_CALENDAR.to_string(),
            event_limit: EVENT_LIMIT,
        }
    }

    pub fn with_default_calendar(mut self, id: impl Into<String>) -> Self {
        self.default_calendar = id.into();
        self
    }

    /// 上限不会超过 EVENT_LIMIT
    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit.clamp(1, EVENT_LIMIT);
        self
    }

    pub fn calendar_or_default(&self, id: Option<String>) -> String {
        id.filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_calendar.clone())
    }

    /// 调用方请求条数截断到上限
    pub fn cap(&self, requested: usize) -> usize {
        requested.min(self.event_limit)
    }
}

//! 日历供应商抽象

use async_trait::async_trait;
use thiserror::Error;

use super::types::{Calendar, Event, ListQuery, NewEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// 供应商返回错误（非 2xx / 响应无法解析）
    #[error("calendar provider error: {0}")]
    Upstream(String),

    /// 超时或无法连接
    #[error("calendar provider unavailable: {0}")]
    Unavailable(String),

    #[error("calendar authorization failed: {0}")]
    Auth(String),

    #[error("invalid time: {0}")]
    InvalidTime(String),
}

/// 日历供应商：列出事件 / 列出日历 / 新建事件
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn list_events(&self, query: &ListQuery) -> Result<Vec<Event>, CalendarError>;

    async fn list_calendars(&self) -> Result<Vec<Calendar>, CalendarError>;

    async fn create_event(&self, calendar_id: &str, event: NewEvent) -> Result<Event, CalendarError>;
}

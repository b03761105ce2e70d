//! 日历领域类型

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// 默认日历 id
pub const PRIMARY_CALENDAR: &str = "primary";

/// 单次列表请求的硬上限
pub const EVENT_LIMIT: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    /// 是否为当前用户自己
    #[serde(default)]
    pub is_self: bool,
}

impl Attendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_self: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub attendees: Vec<Attendee>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub event_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
}

/// 新建事件请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub description: Option<String>,
    pub attendees: Vec<Attendee>,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub event_type: String,
}

/// 事件列表查询；窗口两端均可缺省
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub calendar_id: String,
    pub window_start: Option<DateTime<FixedOffset>>,
    pub window_end: Option<DateTime<FixedOffset>>,
    pub max: usize,
}

impl ListQuery {
    pub fn new(calendar_id: impl Into<String>, max: usize) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            window_start: None,
            window_end: None,
            max,
        }
    }

    pub fn after(mut self, start: DateTime<FixedOffset>) -> Self {
        self.window_start = Some(start);
        self
    }

    pub fn before(mut self, end: DateTime<FixedOffset>) -> Self {
        self.window_end = Some(end);
        self
    }

    /// 实际请求条数：min(max, EVENT_LIMIT)
    pub fn capped_max(&self) -> usize {
        self.max.min(EVENT_LIMIT)
    }

    /// 窗口语义：事件结束晚于窗口开始，且开始早于窗口结束
    pub fn matches(&self, event: &Event) -> bool {
        let after_start = self.window_start.map_or(true, |ws| event.end > ws);
        let before_end = self.window_end.map_or(true, |we| event.start < we);
        after_start && before_end
    }
}

//! 内存日历：离线模式与测试使用，窗口语义与 Google 一致

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::provider::{CalendarError, CalendarProvider};
use super::types::{Calendar, Event, ListQuery, NewEvent, PRIMARY_CALENDAR};

pub struct InMemoryCalendar {
    calendars: RwLock<Vec<Calendar>>,
    events: RwLock<HashMap<String, Vec<Event>>>,
}

impl InMemoryCalendar {
    /// 仅含 primary 日历
    pub fn new() -> Self {
        Self {
            calendars: RwLock::new(vec![Calendar {
                id: PRIMARY_CALENDAR.to_string(),
                summary: Some("Primary".to_string()),
                description: None,
                kind: Some("calendar#calendarListEntry".to_string()),
            }]),
            events: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_calendar(&self, calendar: Calendar) {
        self.calendars.write().await.push(calendar);
    }

    /// 直接写入一个已存在的事件（测试准备数据）
    pub async fn insert(&self, calendar_id: &str, event: Event) {
        self.events
            .write()
            .await
            .entry(calendar_id.to_string())
            .or_default()
            .push(event);
    }

    pub async fn event_count(&self, calendar_id: &str) -> usize {
        self.events
            .read()
            .await
            .get(calendar_id)
            .map_or(0, Vec::len)
    }
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CalendarProvider for InMemoryCalendar {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_events(&self, query: &ListQuery) -> Result<Vec<Event>, CalendarError> {
        let events = self.events.read().await;
        let mut matched: Vec<Event> = events
            .get(&query.calendar_id)
            .map(|list| list.iter().filter(|e| query.matches(e)).cloned().collect())
            .unwrap_or_default();
        matched.sort_by_key(|e| e.start);
        matched.truncate(query.capped_max());
        Ok(matched)
    }

    async fn list_calendars(&self) -> Result<Vec<Calendar>, CalendarError> {
        Ok(self.calendars.read().await.clone())
    }

    async fn create_event(&self, calendar_id: &str, event: NewEvent) -> Result<Event, CalendarError> {
        if event.end < event.start {
            return Err(CalendarError::InvalidTime(format!(
                "end {} is before start {}",
                event.end.to_rfc3339(),
                event.start.to_rfc3339()
            )));
        }
        let known = self
            .calendars
            .read()
            .await
            .iter()
            .any(|c| c.id == calendar_id);
        if !known {
            return Err(CalendarError::Upstream(format!("calendar not found: {}", calendar_id)));
        }

        let created = Event {
            id: uuid::Uuid::new_v4().to_string(),
            summary: event.summary,
            description: event.description,
            attendees: event.attendees,
            start: event.start,
            end: event.end,
            event_type: event.event_type,
        };
        self.insert(calendar_id, created.clone()).await;
        Ok(created)
    }
}

//! 将事件 / 日历列表渲染为供模型阅读的文本

use serde::Serialize;

use super::time::TimeZoneConfig;
use super::types::{Calendar, Event};

pub const EVENT_INFO_PREFIX: &str = "Here are the calendar events for the users: \n";
pub const CALENDAR_INFO_PREFIX: &str = "Here are the different calendars for the user: \n";
pub const NO_EVENTS: &str = "No upcoming events!";

/// 编号列出事件：summary / description / attendees（排除用户自己）/ start / end
pub fn format_events(events: &[Event], tz: &TimeZoneConfig) -> String {
    if events.is_empty() {
        return NO_EVENTS.to_string();
    }
    let mut content = String::from(EVENT_INFO_PREFIX);
    for (i, event) in events.iter().enumerate() {
        content.push_str(&format!("\n{}. ", i + 1));
        content.push_str(&format!("summary: {}\n", event.summary));
        if let Some(desc) = &event.description {
            content.push_str(&format!("description: {}\n", desc));
        }
        let emails: Vec<&str> = event
            .attendees
            .iter()
            .filter(|a| !a.is_self)
            .map(|a| a.email.as_str())
            .collect();
        if !emails.is_empty() {
            content.push_str(&format!("attendees: {}\n", emails.join(",")));
        }
        content.push_str(&format!("start: {}\n", tz.display(&event.start)));
        content.push_str(&format!("end: {}\n", tz.display(&event.end)));
    }
    content
}

#[derive(Serialize)]
struct CalendarView<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
}

/// 编号列出日历，每项为 {id, summary, description, kind} 的 JSON
pub fn format_calendars(calendars: &[Calendar]) -> String {
    let mut content = String::from(CALENDAR_INFO_PREFIX);
    for (i, cal) in calendars.iter().enumerate() {
        let view = CalendarView {
            id: &cal.id,
            summary: cal.summary.as_deref(),
            description: cal.description.as_deref(),
            kind: cal.kind.as_deref(),
        };
        let json = serde_json::to_string(&view).unwrap_or_else(|_| format!("{{\"id\":\"{}\"}}", cal.id));
        content.push_str(&format!("{}. {}\n", i + 1, json));
    }
    content
}

/// 单个新建事件的确认文本
pub fn format_created(event: &Event, tz: &TimeZoneConfig) -> String {
    format!(
        "Created event '{}' (id: {}) from {} to {}",
        event.summary,
        event.id,
        tz.display(&event.start),
        tz.display(&event.end)
    )
}

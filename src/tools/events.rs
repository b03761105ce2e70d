//! 事件查询工具：fetch_upcoming_events / fetch_events / fetch_events_after
//!
//! 请求条数一律截断到 event_limit（最多 25）。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::calendar::{format_events, shift, ListQuery, TimeError};
use crate::tools::{parse_args, schema_of, Tool, ToolContext, ToolError, ToolOutput};

fn invalid(tool: &str, reason: impl ToString) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpcomingArgs {
    /// Number of upcoming events to fetch (at most 25)
    pub num_events: usize,
    /// Calendar id; defaults to the primary calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
}

pub struct FetchUpcomingEventsTool {
    ctx: Arc<ToolContext>,
}

impl FetchUpcomingEventsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FetchUpcomingEventsTool {
    fn name(&self) -> &str {
        "fetch_upcoming_events"
    }

    fn description(&self) -> &str {
        "Fetches the next `num_events` upcoming events from the user's calendar, starting from now."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<UpcomingArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: UpcomingArgs = parse_args(self.name(), args)?;
        let now = self.ctx.tz.now(self.ctx.clock.as_ref());
        let query = ListQuery::new(
            self.ctx.calendar_or_default(args.calendar_id),
            self.ctx.cap(args.num_events),
        )
        .after(now);
        let events = self.ctx.provider.list_events(&query).await?;
        Ok(ToolOutput::text(format_events(&events, &self.ctx.tz)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FetchEventsArgs {
    /// Maximum number of events to return (at most 25)
    pub count: usize,
    /// Only events ending after this ISO-8601 date/time
    #[serde(default)]
    pub after: Option<String>,
    /// Only events starting before this ISO-8601 date/time
    #[serde(default)]
    pub before: Option<String>,
    /// Calendar id; defaults to the primary calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
}

pub struct FetchEventsTool {
    ctx: Arc<ToolContext>,
}

impl FetchEventsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    fn parse_bound(&self, raw: Option<&str>) -> Result<Option<DateTime<FixedOffset>>, ToolError> {
        raw.map(|s| self.ctx.tz.normalize(s).map_err(|e| invalid(self.name(), e)))
            .transpose()
    }
}

#[async_trait]
impl Tool for FetchEventsTool {
    fn name(&self) -> &str {
        "fetch_events"
    }

    fn description(&self) -> &str {
        "Fetches up to `count` events within an optional time window [after, before]. \
         Times are ISO-8601; times without an offset are read in the user's timezone."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<FetchEventsArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: FetchEventsArgs = parse_args(self.name(), args)?;
        let after = self.parse_bound(args.after.as_deref())?;
        let before = self.parse_bound(args.before.as_deref())?;
        if let (Some(a), Some(b)) = (after, before) {
            if b < a {
                return Err(invalid(self.name(), "`before` is earlier than `after`"));
            }
        }

        let mut query = ListQuery::new(
            self.ctx.calendar_or_default(args.calendar_id),
            self.ctx.cap(args.count),
        );
        query.window_start = after;
        query.window_end = before;
        let events = self.ctx.provider.list_events(&query).await?;
        Ok(ToolOutput::text(format_events(&events, &self.ctx.tz)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EventsAfterArgs {
    /// Hours from now; only events starting at or after now + hours are returned
    pub hours: f64,
    /// Maximum number of events (default and maximum 25)
    #[serde(default)]
    pub count: Option<usize>,
    /// Calendar id; defaults to the primary calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
}

/// now + hours，供 fetch_events_after 使用
pub fn events_after_target(now: DateTime<FixedOffset>, hours: f64) -> Result<DateTime<FixedOffset>, TimeError> {
    shift(now, 0, hours, 0)
}

pub struct FetchEventsAfterTool {
    ctx: Arc<ToolContext>,
}

impl FetchEventsAfterTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FetchEventsAfterTool {
    fn name(&self) -> &str {
        "fetch_events_after"
    }

    fn description(&self) -> &str {
        "Fetches events starting at least `hours` hours from now, e.g. hours=2 for 'after two hours from now'."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<EventsAfterArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: EventsAfterArgs = parse_args(self.name(), args)?;
        let now = self.ctx.tz.now(self.ctx.clock.as_ref());
        let target = events_after_target(now, args.hours).map_err(|e| invalid(self.name(), e))?;
        let count = self.ctx.cap(args.count.unwrap_or(self.ctx.event_limit));
        // 供应商窗口按结束时间过滤：先取满上限，按开始时间筛选后再截断到 count
        let query = ListQuery::new(self.ctx.calendar_or_default(args.calendar_id), self.ctx.event_limit).after(target);

        let mut events = self.ctx.provider.list_events(&query).await?;
        events.retain(|e| e.start >= target);
        events.truncate(count);
        Ok(ToolOutput::text(format!(
            "Events starting after {}:\n{}",
            self.ctx.tz.to_provider(&target),
            format_events(&events, &self.ctx.tz)
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::calendar::{
        CalendarProvider, FixedClock, InMemoryCalendar, NewEvent, TimeZoneConfig, NO_EVENTS,
        PRIMARY_CALENDAR,
    };

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    async fn seeded(n: usize) -> (Arc<InMemoryCalendar>, Arc<ToolContext>) {
        let cal = Arc::new(InMemoryCalendar::new());
        let base = at("2025-01-01T01:00:00+05:30");
        for i in 0..n {
            let start = base + Duration::hours(i as i64);
            cal.create_event(
                PRIMARY_CALENDAR,
                NewEvent {
                    summary: format!("event {}", i),
                    description: None,
                    attendees: vec![],
                    start,
                    end: start + Duration::minutes(30),
                    event_type: "default".into(),
                },
            )
            .await
            .unwrap();
        }
        let ctx = Arc::new(ToolContext::new(
            cal.clone(),
            Arc::new(FixedClock::parse("2025-01-01T00:00:00+05:30").unwrap()),
            TimeZoneConfig::default(),
        ));
        (cal, ctx)
    }

    fn count_entries(text: &str) -> usize {
        text.matches("summary: ").count()
    }

    #[tokio::test]
    async fn test_fetch_events_caps_count() {
        let (_cal, ctx) = seeded(40).await;
        let out = FetchEventsTool::new(ctx)
            .execute(serde_json::json!({"count": 1000}))
            .await
            .unwrap();
        assert_eq!(count_entries(&out.content), 25);
    }

    #[tokio::test]
    async fn test_fetch_events_window_and_validation() {
        let (_cal, ctx) = seeded(5).await;
        let tool = FetchEventsTool::new(ctx);
        let out = tool
            .execute(serde_json::json!({
                "count": 10,
                "after": "2025-01-01T02:00:00+05:30",
                "before": "2025-01-01T04:00"
            }))
            .await
            .unwrap();
        assert_eq!(count_entries(&out.content), 2);
        assert!(out.content.contains("event 1"));
        assert!(out.content.contains("event 2"));

        let err = tool
            .execute(serde_json::json!({"count": 1, "after": "2025-01-02", "before": "2025-01-01"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_fetch_events_after_target_is_deterministic() {
        let now = at("2025-01-01T00:00:00+05:30");
        let tz = TimeZoneConfig::default();
        assert_eq!(tz.to_provider(&events_after_target(now, 2.0).unwrap()), "2025-01-01T02:00:00+05:30");

        let (_cal, ctx) = seeded(4).await;
        let out = FetchEventsAfterTool::new(ctx)
            .execute(serde_json::json!({"hours": 2}))
            .await
            .unwrap();
        assert!(out.content.starts_with("Events starting after 2025-01-01T02:00:00+05:30"));
        assert!(!out.content.contains("event 0"));
        assert_eq!(count_entries(&out.content), 3);
    }

    #[tokio::test]
    async fn test_fetch_events_after_skips_events_in_progress_before_capping() {
        let (cal, ctx) = seeded(0).await;
        for (summary, start, end) in [
            ("workshop", "2025-01-01T01:00:00+05:30", "2025-01-01T06:00:00+05:30"),
            ("dinner", "2025-01-01T03:00:00+05:30", "2025-01-01T04:00:00+05:30"),
        ] {
            cal.create_event(
                PRIMARY_CALENDAR,
                NewEvent {
                    summary: summary.into(),
                    description: None,
                    attendees: vec![],
                    start: at(start),
                    end: at(end),
                    event_type: "default".into(),
                },
            )
            .await
            .unwrap();
        }
        let out = FetchEventsAfterTool::new(ctx)
            .execute(serde_json::json!({"hours": 2, "count": 1}))
            .await
            .unwrap();
        assert!(out.content.contains("summary: dinner"), "{}", out.content);
        assert!(!out.content.contains("workshop"));
        assert_eq!(count_entries(&out.content), 1);
    }

    #[tokio::test]
    async fn test_fetch_events_after_huge_hours_is_invalid() {
        let (_cal, ctx) = seeded(0).await;
        let tool = FetchEventsAfterTool::new(ctx);
        let err = tool.execute(serde_json::json!({"hours": 1e300})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_upcoming_empty_calendar() {
        let (_cal, ctx) = seeded(0).await;
        let out = FetchUpcomingEventsTool::new(ctx)
            .execute(serde_json::json!({"num_events": 5}))
            .await
            .unwrap();
        assert_eq!(out.content, NO_EVENTS);
    }
}

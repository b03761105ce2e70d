//! 日历工具：fetch_calendar_list / create_event

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::calendar::{format_calendars, format_created, Attendee, NewEvent};
use crate::tools::{parse_args, schema_of, Tool, ToolContext, ToolError, ToolOutput};

pub struct FetchCalendarListTool {
    ctx: Arc<ToolContext>,
}

impl FetchCalendarListTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FetchCalendarListTool {
    fn name(&self) -> &str {
        "fetch_calendar_list"
    }

    fn description(&self) -> &str {
        "Fetches all calendars of the user (id, summary, description, kind). Takes no arguments."
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        let calendars = self.ctx.provider.list_calendars().await?;
        Ok(ToolOutput::text(format_calendars(&calendars)))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateEventArgs {
    /// Title of the event
    pub summary: String,
    /// ISO-8601 start; without an offset it is read in the user's timezone
    pub start: String,
    /// ISO-8601 end; must not be before start
    pub end: String,
    /// Attendee email addresses
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Calendar id; defaults to the primary calendar
    #[serde(default)]
    pub calendar_id: Option<String>,
    /// Event type, e.g. "default", "focusTime", "outOfOffice"
    #[serde(default)]
    pub event_type: Option<String>,
}

pub struct CreateEventTool {
    ctx: Arc<ToolContext>,
}

impl CreateEventTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    fn invalid(&self, reason: impl ToString) -> ToolError {
        ToolError::InvalidArguments {
            tool: self.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "create_event"
    }

    fn description(&self) -> &str {
        "Creates a calendar event with summary, start, end and optional attendees/description. \
         Resolve relative times (e.g. 'tomorrow 5pm') to ISO-8601 before calling."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<CreateEventArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: CreateEventArgs = parse_args(self.name(), args)?;
        if args.summary.trim().is_empty() {
            return Err(self.invalid("`summary` must not be empty"));
        }
        let tz = &self.ctx.tz;
        let start = tz.normalize(&args.start).map_err(|e| self.invalid(e))?;
        let end = tz.normalize(&args.end).map_err(|e| self.invalid(e))?;
        if end < start {
            return Err(self.invalid("`end` is before `start`"));
        }

        let calendar_id = self.ctx.calendar_or_default(args.calendar_id);
        let event = NewEvent {
            summary: args.summary,
            description: args.description,
            attendees: args.attendees.into_iter().map(Attendee::new).collect(),
            start,
            end,
            event_type: args.event_type.unwrap_or_else(|| "default".to_string()),
        };
        let created = self.ctx.provider.create_event(&calendar_id, event).await?;
        Ok(ToolOutput::text(format_created(&created, tz)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{
        CalendarProvider, FixedClock, InMemoryCalendar, ListQuery, TimeZoneConfig, PRIMARY_CALENDAR,
    };

    fn ctx(cal: Arc<InMemoryCalendar>) -> Arc<ToolContext> {
        Arc::new(ToolContext::new(
            cal,
            Arc::new(FixedClock::parse("2025-01-01T00:00:00+05:30").unwrap()),
            TimeZoneConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let cal = Arc::new(InMemoryCalendar::new());
        let tool = CreateEventTool::new(ctx(cal.clone()));
        let out = tool
            .execute(serde_json::json!({
                "summary": "Dentist",
                "start": "2025-01-03T17:00",
                "end": "2025-01-03T18:00",
                "attendees": ["dr@clinic.com"]
            }))
            .await
            .unwrap();
        assert!(out.content.contains("Dentist"));
        assert!(out.content.contains("2025-01-03 17:00:00 +05:30"));

        let events = cal
            .list_events(&ListQuery::new(PRIMARY_CALENDAR, 10))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attendees[0].email, "dr@clinic.com");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let tool = CreateEventTool::new(ctx(Arc::new(InMemoryCalendar::new())));
        let err = tool
            .execute(serde_json::json!({"summary": "x", "start": "2025-01-03T18:00", "end": "2025-01-03T17:00"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = tool.execute(serde_json::json!({"summary": "x"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = tool
            .execute(serde_json::json!({
                "summary": "x",
                "start": "2025-01-03T17:00",
                "end": "2025-01-03T18:00",
                "calendar_id": "unknown"
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UpstreamFailure(_)));
    }

    #[tokio::test]
    async fn test_calendar_list() {
        let out = FetchCalendarListTool::new(ctx(Arc::new(InMemoryCalendar::new())))
            .execute(Value::Null)
            .await
            .unwrap();
        assert!(out.content.contains("\"id\":\"primary\""));
    }
}

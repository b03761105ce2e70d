pub mod calendars;
pub mod context;
pub mod datetime;
pub mod end_chat;
pub mod events;
pub mod executor;
pub mod registry;
pub mod schema;

use std::sync::Arc;

pub use calendars::{CreateEventTool, FetchCalendarListTool};
pub use context::ToolContext;
pub use datetime::{CurrentDateTimeTool, ShiftDateTimeTool};
pub use end_chat::{EndChatTool, GOODBYE};
pub use events::{events_after_target, FetchEventsAfterTool, FetchEventsTool, FetchUpcomingEventsTool};
pub use executor::ToolExecutor;
pub use registry::{parse_args, schema_of, Tool, ToolEffect, ToolError, ToolOutput, ToolRegistry};
pub use schema::{tool_call_format_instructions, tool_call_schema_json};

/// DateTime worker 绑定的工具
pub const DATETIME_TOOLS: &[&str] = &["current_datetime", "shift_datetime"];

/// Calendar worker 绑定的工具
pub const CALENDAR_TOOLS: &[&str] = &[
    "fetch_upcoming_events",
    "fetch_events",
    "fetch_events_after",
    "fetch_calendar_list",
    "create_event",
    "end_chat",
];

/// 进程级工具注册表：全部时间与日历工具
pub fn default_registry(ctx: Arc<ToolContext>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CurrentDateTimeTool::new(ctx.clone()));
    registry.register(ShiftDateTimeTool::new(ctx.clone()));
    registry.register(FetchUpcomingEventsTool::new(ctx.clone()));
    registry.register(FetchEventsTool::new(ctx.clone()));
    registry.register(FetchEventsAfterTool::new(ctx.clone()));
    registry.register(FetchCalendarListTool::new(ctx.clone()));
    registry.register(CreateEventTool::new(ctx));
    registry.register(EndChatTool);
    registry
}

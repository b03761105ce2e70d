//! 日历：供应商抽象、Google REST 客户端、内存实现、时间换算与文本渲染

pub mod format;
pub mod google;
pub mod memory;
pub mod provider;
pub mod time;
pub mod types;

pub use format::{format_calendars, format_created, format_events, NO_EVENTS};
pub use google::{GoogleCalendarClient, GOOGLE_CALENDAR_BASE_URL};
pub use memory::InMemoryCalendar;
pub use provider::{CalendarError, CalendarProvider};
pub use time::{shift, Clock, FixedClock, SystemClock, TimeError, TimeZoneConfig, DEFAULT_UTC_OFFSET};
pub use types::{Attendee, Calendar, Event, ListQuery, NewEvent, EVENT_LIMIT, PRIMARY_CALENDAR};

//! Google Calendar REST 客户端（v3）
//!
//! 访问令牌来自环境变量 GOOGLE_CALENDAR_TOKEN 或 token 文件中的 `token` / `access_token` 字段，
//! 每次请求时读取，外部刷新 token 文件后无需重启。OAuth 授权与刷新不在本模块范围内。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::provider::{CalendarError, CalendarProvider};
use super::time::TimeZoneConfig;
use super::types::{Attendee, Calendar, Event, ListQuery, NewEvent};

pub const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const TOKEN_ENV: &str = "GOOGLE_CALENDAR_TOKEN";

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    /// 全天事件只有 date
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireAttendee {
    email: String,
    #[serde(rename = "self", default, skip_serializing)]
    is_self: bool,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    attendees: Vec<WireAttendee>,
    #[serde(default)]
    start: WireTime,
    #[serde(default)]
    end: WireTime,
    #[serde(rename = "eventType", default)]
    event_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireNewEvent {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: WireTime,
    end: WireTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<WireAttendee>,
    #[serde(rename = "eventType")]
    event_type: String,
}

#[derive(Debug, Deserialize)]
struct WireCalendar {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

pub struct GoogleCalendarClient {
    client: Client,
    base_url: String,
    token_file: PathBuf,
    tz: TimeZoneConfig,
}

impl GoogleCalendarClient {
    pub fn new(
        base_url: impl Into<String>,
        token_file: impl Into<PathBuf>,
        timeout_secs: u64,
        tz: TimeZoneConfig,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            token_file: token_file.into(),
            tz,
        }
    }

    async fn access_token(&self) -> Result<String, CalendarError> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }
        let raw = tokio::fs::read_to_string(&self.token_file).await.map_err(|e| {
            CalendarError::Auth(format!(
                "no {} set and cannot read {}: {}",
                TOKEN_ENV,
                self.token_file.display(),
                e
            ))
        })?;
        let json: Value = serde_json::from_str(&raw)
            .map_err(|e| CalendarError::Auth(format!("malformed token file: {}", e)))?;
        json.get("token")
            .or_else(|| json.get("access_token"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| CalendarError::Auth("token file has no access token".into()))
    }

    fn url(&self, segments: &[&str]) -> Result<Url, CalendarError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| CalendarError::Upstream(format!("bad base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Upstream(format!("bad base url {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, CalendarError> {
        let token = self.access_token().await?;
        let resp = request.bearer_auth(token).send().await.map_err(map_transport)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Auth(format!("HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CalendarError::Upstream(format!("HTTP {}: {}", status, body)));
        }
        resp.json::<T>()
            .await
            .map_err(|e| CalendarError::Upstream(format!("unexpected response body: {}", e)))
    }

    fn parse_time(&self, t: &WireTime) -> Result<chrono::DateTime<chrono::FixedOffset>, CalendarError> {
        let raw = t
            .date_time
            .as_deref()
            .or(t.date.as_deref())
            .ok_or_else(|| CalendarError::Upstream("event without start/end".into()))?;
        self.tz
            .normalize(raw)
            .map_err(|e| CalendarError::Upstream(e.to_string()))
    }

    fn to_event(&self, wire: WireEvent) -> Result<Event, CalendarError> {
        Ok(Event {
            start: self.parse_time(&wire.start)?,
            end: self.parse_time(&wire.end)?,
            id: wire.id,
            summary: wire.summary.unwrap_or_default(),
            description: wire.description,
            attendees: wire
                .attendees
                .into_iter()
                .map(|a| Attendee {
                    email: a.email,
                    is_self: a.is_self,
                })
                .collect(),
            event_type: wire.event_type.unwrap_or_else(|| "default".to_string()),
        })
    }
}

fn map_transport(e: reqwest::Error) -> CalendarError {
    if e.is_timeout() || e.is_connect() {
        CalendarError::Unavailable(e.to_string())
    } else {
        CalendarError::Upstream(e.to_string())
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    async fn list_events(&self, query: &ListQuery) -> Result<Vec<Event>, CalendarError> {
        let url = self.url(&["calendars", &query.calendar_id, "events"])?;
        let mut params: Vec<(&str, String)> = vec![
            ("maxResults", query.capped_max().to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(start) = &query.window_start {
            params.push(("timeMin", self.tz.to_provider(start)));
        }
        if let Some(end) = &query.window_end {
            params.push(("timeMax", self.tz.to_provider(end)));
        }

        let list: ListResponse<WireEvent> = self.send(self.client.get(url).query(&params)).await?;
        tracing::debug!(calendar = %query.calendar_id, count = list.items.len(), "events listed");
        list.items.into_iter().map(|e| self.to_event(e)).collect()
    }

    async fn list_calendars(&self) -> Result<Vec<Calendar>, CalendarError> {
        let url = self.url(&["users", "me", "calendarList"])?;
        let list: ListResponse<WireCalendar> = self.send(self.client.get(url)).await?;
        Ok(list
            .items
            .into_iter()
            .map(|c| Calendar {
                id: c.id,
                summary: c.summary,
                description: c.description,
                kind: c.kind,
            })
            .collect())
    }

    async fn create_event(&self, calendar_id: &str, event: NewEvent) -> Result<Event, CalendarError> {
        if event.end < event.start {
            return Err(CalendarError::InvalidTime("end is before start".into()));
        }
        let url = self.url(&["calendars", calendar_id, "events"])?;
        let body = WireNewEvent {
            summary: event.summary,
            description: event.description,
            start: WireTime {
                date_time: Some(self.tz.to_provider(&event.start)),
                date: None,
            },
            end: WireTime {
                date_time: Some(self.tz.to_provider(&event.end)),
                date: None,
            },
            attendees: event
                .attendees
                .into_iter()
                .map(|a| WireAttendee {
                    email: a.email,
                    is_self: false,
                })
                .collect(),
            event_type: event.event_type,
        };
        let created: WireEvent = self.send(self.client.post(url).json(&body)).await?;
        tracing::info!(calendar = %calendar_id, id = %created.id, "event created");
        self.to_event(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GoogleCalendarClient {
        GoogleCalendarClient::new(base, "does-not-exist.json", 5, TimeZoneConfig::default())
    }

    #[test]
    fn test_url_encodes_calendar_id() {
        let c = client(GOOGLE_CALENDAR_BASE_URL);
        let url = c
            .url(&["calendars", "en.indian#holiday@group.v.calendar.google.com", "events"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/en.indian%23holiday@group.v.calendar.google.com/events"
        );

        let trailing = client("https://www.googleapis.com/calendar/v3/");
        assert_eq!(
            trailing.url(&["users", "me", "calendarList"]).unwrap().as_str(),
            "https://www.googleapis.com/calendar/v3/users/me/calendarList"
        );
    }

    #[test]
    fn test_wire_event_conversion_filters_nothing_and_parses_times() {
        let raw = r#"{
            "id": "abc",
            "summary": "Sync",
            "attendees": [{"email": "me@x.com", "self": true}, {"email": "bob@x.com"}],
            "start": {"dateTime": "2025-01-01T10:00:00+05:30"},
            "end": {"date": "2025-01-02"}
        }"#;
        let wire: WireEvent = serde_json::from_str(raw).unwrap();
        let event = client(GOOGLE_CALENDAR_BASE_URL).to_event(wire).unwrap();
        assert_eq!(event.summary, "Sync");
        assert!(event.attendees[0].is_self);
        assert!(!event.attendees[1].is_self);
        assert_eq!(event.end.to_rfc3339(), "2025-01-02T00:00:00+05:30");
        assert_eq!(event.event_type, "default");
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        if std::env::var(TOKEN_ENV).is_ok() {
            return;
        }
        let err = client(GOOGLE_CALENDAR_BASE_URL).access_token().await.unwrap_err();
        assert!(matches!(err, CalendarError::Auth(_)));
    }
}

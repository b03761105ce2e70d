//! 时间工具：current_datetime / shift_datetime
//!
//! 均为注入时钟与配置时区的纯函数，不读取宿主机本地时区。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::calendar::shift;
use crate::tools::{parse_args, schema_of, Tool, ToolContext, ToolError, ToolOutput};

pub struct CurrentDateTimeTool {
    ctx: Arc<ToolContext>,
}

impl CurrentDateTimeTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for CurrentDateTimeTool {
    fn name(&self) -> &str {
        "current_datetime"
    }

    fn description(&self) -> &str {
        "Returns the current date, time and weekday in the user's timezone. Takes no arguments."
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        let now = self.ctx.tz.now(self.ctx.clock.as_ref());
        Ok(ToolOutput::text(format!(
            "Current date and time: {} ({}). ISO-8601: {}",
            self.ctx.tz.display(&now),
            now.format("%A"),
            self.ctx.tz.to_provider(&now)
        )))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ShiftArgs {
    /// ISO-8601 date/time to start from; defaults to now. Times without an offset are read in the user's timezone.
    #[serde(default)]
    pub base: Option<String>,
    /// Days to add (negative to subtract)
    #[serde(default)]
    pub days: i64,
    /// Hours to add; fractions allowed
    #[serde(default)]
    pub hours: f64,
    /// Minutes to add
    #[serde(default)]
    pub minutes: i64,
}

pub struct ShiftDateTimeTool {
    ctx: Arc<ToolContext>,
}

impl ShiftDateTimeTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ShiftDateTimeTool {
    fn name(&self) -> &str {
        "shift_datetime"
    }

    fn description(&self) -> &str {
        "Adds or subtracts days/hours/minutes from a date/time (default: now) and returns the resulting ISO-8601 timestamp. \
         Use it to resolve phrases like 'tomorrow at 5pm' or 'in 3 hours'."
    }

    fn parameters_schema(&self) -> Value {
        schema_of::<ShiftArgs>()
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let args: ShiftArgs = parse_args(self.name(), args)?;
        let tz = &self.ctx.tz;
        let base = match args.base.as_deref() {
            Some(raw) => tz.normalize(raw).map_err(|e| ToolError::InvalidArguments {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?,
            None => tz.now(self.ctx.clock.as_ref()),
        };
        let target = shift(base, args.days, args.hours, args.minutes).map_err(|e| ToolError::InvalidArguments {
            tool: self.name().to_string(),
            reason: e.to_string(),
        })?;
        Ok(ToolOutput::text(format!(
            "{} ({}, {})",
            tz.to_provider(&target),
            tz.display(&target),
            target.format("%A")
        )))
    }
}

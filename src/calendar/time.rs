//! 时间与时区：注入式时钟 + 显式时区配置
//!
//! 所有时间计算都基于注入的 Clock 与配置的固定 UTC 偏移，绝不读取宿主机本地时区。
//! `TimeZoneConfig::normalize` 是唯一的输入转换入口：带偏移的 RFC 3339 保留原偏移，
//! 不带偏移的本地时间按配置时区解释。

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc,
};
use thiserror::Error;

/// 默认时区偏移（Asia/Kolkata，无夏令时）
pub const DEFAULT_UTC_OFFSET: &str = "+05:30";

/// 接受的无偏移时间格式
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    #[error("invalid UTC offset '{0}', expected something like +05:30")]
    InvalidOffset(String),

    #[error("invalid date/time '{0}', expected ISO-8601 such as 2025-01-01T10:00:00+05:30")]
    InvalidDateTime(String),

    #[error("time shift out of range: {0}")]
    OutOfRange(String),
}

/// 当前时间来源
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟（测试与可复现运行）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn parse(rfc3339: &str) -> Result<Self, TimeError> {
        DateTime::parse_from_rfc3339(rfc3339)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|_| TimeError::InvalidDateTime(rfc3339.to_string()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 显式时区配置（固定偏移）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneConfig {
    offset: FixedOffset,
}

impl TimeZoneConfig {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// 解析 "+05:30" / "-0800" / "Z" / "UTC"
    pub fn from_offset_str(s: &str) -> Result<Self, TimeError> {
        let raw = s.trim();
        let invalid = || TimeError::InvalidOffset(s.to_string());
        if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
            return FixedOffset::east_opt(0).map(Self::new).ok_or_else(invalid);
        }
        let (sign, rest) = match raw.chars().next() {
            Some('+') => (1, &raw[1..]),
            Some('-') => (-1, &raw[1..]),
            _ => return Err(invalid()),
        };
        let digits: String = rest.chars().filter(|c| *c != ':').collect();
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
        let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
        if minutes >= 60 {
            return Err(invalid());
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::new)
            .ok_or_else(invalid)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// 注入时钟下的「现在」，换算到配置时区
    pub fn now(&self, clock: &dyn Clock) -> DateTime<FixedOffset> {
        self.localize(clock.now())
    }

    pub fn localize(&self, dt: DateTime<Utc>) -> DateTime<FixedOffset> {
        dt.with_timezone(&self.offset)
    }

    /// 唯一的输入时间转换步骤
    pub fn normalize(&self, input: &str) -> Result<DateTime<FixedOffset>, TimeError> {
        let s = input.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt);
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.from_naive(naive, input);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return self.from_naive(midnight, input);
            }
        }
        Err(TimeError::InvalidDateTime(input.to_string()))
    }

    fn from_naive(
        &self,
        naive: NaiveDateTime,
        original: &str,
    ) -> Result<DateTime<FixedOffset>, TimeError> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| TimeError::InvalidDateTime(original.to_string()))
    }

    /// 供应商格式（RFC 3339，秒级精度，保留偏移）
    pub fn to_provider(&self, dt: &DateTime<FixedOffset>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// 展示给模型/用户的格式
    pub fn display(&self, dt: &DateTime<FixedOffset>) -> String {
        dt.format("%Y-%m-%d %H:%M:%S %:z").to_string()
    }
}

impl Default for TimeZoneConfig {
    fn default() -> Self {
        // +05:30 恒为合法偏移
        Self::new(FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap_or_else(|| Utc.fix()))
    }
}

/// shift 接受的小时数绝对值上限
const MAX_SHIFT_HOURS: f64 = 1.0e9;

/// 纯函数：在 base 上加减天/小时/分钟；小时允许小数，精确到分钟
///
/// 任何一步溢出或结果超出可表示范围都返回 OutOfRange。
pub fn shift(
    base: DateTime<FixedOffset>,
    days: i64,
    hours: f64,
    minutes: i64,
) -> Result<DateTime<FixedOffset>, TimeError> {
    let out_of_range = || TimeError::OutOfRange(format!("days={} hours={} minutes={}", days, hours, minutes));
    if !hours.is_finite() || hours.abs() > MAX_SHIFT_HOURS {
        return Err(out_of_range());
    }
    let hour_minutes = (hours * 60.0).round() as i64;
    let total_minutes = hour_minutes.checked_add(minutes).ok_or_else(out_of_range)?;
    let delta = Duration::try_days(days)
        .zip(Duration::try_minutes(total_minutes))
        .and_then(|(d, m)| d.checked_add(&m))
        .ok_or_else(out_of_range)?;
    base.checked_add_signed(delta).ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist() -> TimeZoneConfig {
        TimeZoneConfig::from_offset_str("+05:30").unwrap()
    }

    #[test]
    fn test_offset_parsing() {
        assert_eq!(ist(), TimeZoneConfig::default());
        assert_eq!(
            TimeZoneConfig::from_offset_str("-0800").unwrap().offset().local_minus_utc(),
            -8 * 3600
        );
        assert_eq!(TimeZoneConfig::from_offset_str("UTC").unwrap().offset().local_minus_utc(), 0);
        assert!(TimeZoneConfig::from_offset_str("Asia/Kolkata").is_err());
        assert!(TimeZoneConfig::from_offset_str("+05:75").is_err());
    }

    #[test]
    fn test_normalize_naive_uses_configured_zone() {
        let dt = ist().normalize("2025-01-02T10:00").unwrap();
        assert_eq!(ist().to_provider(&dt), "2025-01-02T10:00:00+05:30");

        let spaced = ist().normalize("2025-01-02 10:00:00").unwrap();
        assert_eq!(dt, spaced);
    }

    #[test]
    fn test_normalize_keeps_explicit_offset() {
        let dt = ist().normalize("2025-01-02T10:00:00Z").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(ist().to_provider(&dt), "2025-01-02T10:00:00+00:00");
    }

    #[test]
    fn test_normalize_bare_date_is_local_midnight() {
        let dt = ist().normalize("2025-03-01").unwrap();
        assert_eq!(ist().display(&dt), "2025-03-01 00:00:00 +05:30");
        assert!(ist().normalize("next tuesday").is_err());
    }

    #[test]
    fn test_now_ignores_host_timezone() {
        let clock = FixedClock::parse("2024-12-31T18:30:00Z").unwrap();
        let now = ist().now(&clock);
        assert_eq!(ist().to_provider(&now), "2025-01-01T00:00:00+05:30");
    }

    #[test]
    fn test_shift_is_pure() {
        let base = ist().normalize("2025-01-01T00:00:00+05:30").unwrap();
        let first = shift(base, 0, 2.0, 0).unwrap();
        let second = shift(base, 0, 2.0, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(ist().to_provider(&first), "2025-01-01T02:00:00+05:30");
        assert_eq!(ist().to_provider(&shift(base, 1, 1.5, -30).unwrap()), "2025-01-02T01:00:00+05:30");
    }

    #[test]
    fn test_shift_overflow_is_error() {
        let base = ist().normalize("2025-01-01T00:00:00+05:30").unwrap();
        for (days, hours, minutes) in [
            (100_000_000, 0.0, 0),
            (i64::MAX, 0.0, 0),
            (0, 1e300, 0),
            (0, f64::NAN, 0),
            (0, 0.0, i64::MAX),
            (0, 1e9, i64::MAX),
            (0, -2e9, 0),
        ] {
            assert!(
                matches!(shift(base, days, hours, minutes), Err(TimeError::OutOfRange(_))),
                "days={days} hours={hours} minutes={minutes}"
            );
        }
    }
}

//! 日期工具模块
//!
//! 远端表以 `YYYY-MM-DD` 字符串存储日期，以 RFC 3339 存储时间戳。

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 当前 UTC 日期
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// 以 `end` 结尾（含）的连续 `count` 天，按时间升序
pub fn trailing_days(end: NaiveDate, count: u64) -> Vec<NaiveDate> {
    (0..count)
        .rev()
        .filter_map(|back| end.checked_sub_days(Days::new(back)))
        .collect()
}

pub fn weekday_short(date: &str) -> Option<String> {
    let label = match parse_date(date)?.weekday() {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    };
    Some(label.to_string())
}

/// 解析 RFC 3339 时间戳，失败时返回 `None`
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

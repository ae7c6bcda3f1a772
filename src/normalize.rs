use chrono::{Datelike, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::models::{Channel, ReportingWeek, Service, SheetPeriod};

static WEEK_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)월\s*(\d+)주차").expect("week label pattern"));

static SHEET_PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\(?\s*(\d{2})년\s*\)?\s*)?(\d{1,2})월\s*(\d)주차").expect("sheet period pattern")
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Record identity: first 16 hex chars of SHA-256 over the `_`-joined parts.
pub fn make_id(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parts.join("_").as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

pub fn nfc(value: &str) -> String {
    value.nfc().collect()
}

pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").into_owned()
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

pub fn parse_float(value: &str) -> Option<f64> {
    let cleaned = value.replace('%', "");
    let cleaned = cleaned.trim();
    if matches!(cleaned, "" | "-" | "N/A" | "n/a") {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| parse_datetime(value).map(|dt| dt.date()))
}

pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('Z');
    if value.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Tenure cells read like "14개월" or "14.0".
pub fn parse_tenure(value: &str) -> Option<i64> {
    let stripped = value.replace("개월", "");
    let number = stripped.trim().parse::<f64>().ok()?;
    number.is_finite().then(|| number.trunc() as i64)
}

pub fn week_label(month: u32, week: u32) -> String {
    format!("{month}월 {week}주차")
}

pub fn iso_week_id(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

/// First "M월 W주차" mention in free text.
pub fn find_week_label(text: &str) -> Option<String> {
    let caps = WEEK_LABEL.captures(text)?;
    let month = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let week = caps.get(2)?.as_str().parse::<u32>().ok()?;
    Some(week_label(month, week))
}

/// Parse "(25년) 10월 2주차"-style sheet names.
pub fn parse_sheet_period(name: &str) -> Option<SheetPeriod> {
    let caps = SHEET_PERIOD.captures(name)?;
    let explicit_year = caps
        .get(1)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .map(|yy| 2000 + yy);
    let month = caps.get(2)?.as_str().parse::<u32>().ok()?;
    let week = caps.get(3)?.as_str().parse::<u32>().ok()?;
    Some(SheetPeriod {
        explicit_year,
        month,
        week,
    })
}

/// Season runs July..June: months 7-12 fall in the start year.
pub fn season_year(month: u32, season_start_year: i32) -> i32 {
    if month >= 7 {
        season_start_year
    } else {
        season_start_year + 1
    }
}

impl SheetPeriod {
    pub fn year(&self, season_start_year: i32) -> i32 {
        self.explicit_year
            .unwrap_or_else(|| season_year(self.month, season_start_year))
    }

    pub fn reporting_week(&self, season_start_year: i32) -> ReportingWeek {
        reporting_week(self.year(season_start_year), self.month, self.week)
    }
}

/// Week `w` of a month is approximated by day `min(w * 7, 28)`.
pub fn reporting_week(year: i32, month: u32, week: u32) -> ReportingWeek {
    let report_date = NaiveDate::from_ymd_opt(year, month, (week * 7).min(28));
    ReportingWeek {
        label: week_label(month, week),
        iso_week: report_date.map(iso_week_id),
        report_date,
    }
}

const SERVICE_RULES: &[(&[&str], Service)] = &[
    (&["주차", "카오너"], Service::Parking),
    (&["바이크"], Service::Bike),
    (&["maas", "택시", "심야"], Service::Taxi),
    (&["퀵"], Service::Quick),
    (&["대리"], Service::Driver),
    (&["화물"], Service::Freight),
];

const CHANNEL_RULES: &[(&str, Channel)] = &[("유선", Channel::Phone), ("채팅", Channel::Chat)];

/// Map a free-text vertical such as "택시 유선" to service and channel.
pub fn map_vertical(vertical: &str) -> (Service, Channel) {
    let compact: String = vertical
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let service = SERVICE_RULES
        .iter()
        .find(|(keys, _)| keys.iter().any(|key| compact.contains(key)))
        .map_or(Service::Other, |(_, service)| *service);
    let channel = CHANNEL_RULES
        .iter()
        .find(|(key, _)| compact.contains(key))
        .map_or(Channel::Other, |(_, channel)| *channel);

    (service, channel)
}

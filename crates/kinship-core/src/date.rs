//! Date-like blocks
//!
//! Journal entries and date values show up as blocks whose text is a raw
//! date string, or whose `_repr` property carries a structured date. This
//! module detects both and renders a friendlier label.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::block::{Block, PROP_REPR};

static ISO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?)?$").unwrap()
});
static YMD_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})/(\d{1,2})/(\d{1,2})$").unwrap());
static MDY_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());
static YMD_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})\.(\d{1,2})\.(\d{1,2})$").unwrap());
static DMY_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$").unwrap());
static CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})年(\d{1,2})月(\d{1,2})日$").unwrap());
static LONG_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$").unwrap()
});
static TEMPLATE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"YYYY|MM|DD|HH|mm|ss").unwrap());

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// A date found on a block, with the time of day when one was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedDate {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl DetectedDate {
    fn day(date: NaiveDate) -> Self {
        Self { date, time: None }
    }

    /// Date and time, midnight when no time was given
    pub fn datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }
}

/// Detect a date on `block`, from its `_repr` property first, then its text
pub fn detect_date(block: &Block) -> Option<DetectedDate> {
    block
        .property(PROP_REPR)
        .and_then(|p| date_from_repr(&p.value))
        .or_else(|| block.text().and_then(parse_date_text))
}

/// Read a date out of a `_repr` value.
///
/// Accepts `{"date": ...}` and `{"type": "date"|"journal", "value": ...}`,
/// where the date is a date string or epoch milliseconds.
pub fn date_from_repr(repr: &Value) -> Option<DetectedDate> {
    let repr = match repr {
        // Some hosts store the representation serialized
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(_) => return parse_date_text(raw),
        },
        other => other.clone(),
    };
    let object = repr.as_object()?;

    let raw = match object.get("date") {
        Some(date) => date,
        None => {
            let kind = object.get("type").and_then(Value::as_str)?;
            if !matches!(kind, "date" | "journal") {
                return None;
            }
            object.get("value")?
        }
    };

    match raw {
        Value::String(s) => parse_date_text(s),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            let datetime = DateTime::from_timestamp_millis(millis)?.naive_utc();
            Some(DetectedDate {
                date: datetime.date(),
                time: Some(datetime.time()),
            })
        }
        _ => None,
    }
}

/// Parse a date string in one of the recognized shapes
pub fn parse_date_text(text: &str) -> Option<DetectedDate> {
    let text = text.trim();

    if let Some(caps) = ISO.captures(text) {
        let date = ymd(&caps, 1, 2, 3)?;
        let time = match (caps.get(4), caps.get(5)) {
            (Some(h), Some(m)) => Some(NaiveTime::from_hms_opt(
                h.as_str().parse().ok()?,
                m.as_str().parse().ok()?,
                caps.get(6).map_or(Some(0), |s| s.as_str().parse().ok())?,
            )?),
            _ => None,
        };
        return Some(DetectedDate { date, time });
    }
    if let Some(caps) = YMD_SLASH.captures(text) {
        return ymd(&caps, 1, 2, 3).map(DetectedDate::day);
    }
    if let Some(caps) = MDY_SLASH.captures(text) {
        return ymd(&caps, 3, 1, 2).map(DetectedDate::day);
    }
    if let Some(caps) = YMD_DOT.captures(text) {
        return ymd(&caps, 1, 2, 3).map(DetectedDate::day);
    }
    if let Some(caps) = DMY_DOT.captures(text) {
        return ymd(&caps, 3, 2, 1).map(DetectedDate::day);
    }
    if let Some(caps) = CJK.captures(text) {
        return ymd(&caps, 1, 2, 3).map(DetectedDate::day);
    }
    if let Some(caps) = LONG_FORM.captures(text) {
        let name = caps[1].to_lowercase();
        let month = MONTHS
            .iter()
            .position(|m| *m == name || (name.len() >= 3 && m.starts_with(name.as_str())))?;
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month as u32 + 1, day).map(DetectedDate::day);
    }
    None
}

fn ymd(caps: &Captures<'_>, y: usize, m: usize, d: usize) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        caps[y].parse().ok()?,
        caps[m].parse().ok()?,
        caps[d].parse().ok()?,
    )
}

/// Label `date` relative to `now`.
///
/// - same day: `Today`, or `Today HH:MM` when a time is known
/// - previous day: `Yesterday`, likewise
/// - two to six days ago: the weekday name
/// - anything else, including future dates: `January 1, 2024`
pub fn format_relative(date: &DetectedDate, now: NaiveDateTime) -> String {
    let days_ago = (now.date() - date.date).num_days();
    let with_time = |label: &str| match date.time {
        Some(time) => format!("{} {}", label, time.format("%H:%M")),
        None => label.to_string(),
    };

    match days_ago {
        0 => with_time("Today"),
        1 => with_time("Yesterday"),
        2..=6 => date.date.format("%A").to_string(),
        _ => date.date.format("%B %-d, %Y").to_string(),
    }
}

/// Render `datetime` through a token template.
///
/// Recognized tokens: `YYYY`, `MM`, `DD`, `HH`, `mm`, `ss`. Everything else is
/// copied through.
pub fn format_with_template(datetime: NaiveDateTime, template: &str) -> String {
    TEMPLATE_TOKEN
        .replace_all(template, |caps: &Captures<'_>| match &caps[0] {
            "YYYY" => format!("{:04}", datetime.year()),
            "MM" => format!("{:02}", datetime.month()),
            "DD" => format!("{:02}", datetime.day()),
            "HH" => datetime.format("%H").to_string(),
            "mm" => datetime.format("%M").to_string(),
            "ss" => datetime.format("%S").to_string(),
            other => other.to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        day(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_parse_shapes() {
        let expected = day(2024, 3, 9);
        for text in [
            "2024-03-09",
            "2024/3/9",
            "3/9/2024",
            "2024.03.09",
            "09.03.2024",
            "2024年3月9日",
            "March 9, 2024",
            "Mar 9th 2024",
        ] {
            assert_eq!(parse_date_text(text).map(|d| d.date), Some(expected), "{text}");
        }
        assert!(parse_date_text("not a date").is_none());
        assert!(parse_date_text("2024-02-30").is_none());
    }

    #[test]
    fn test_iso_with_time() {
        let parsed = parse_date_text("2024-03-09T14:05").unwrap();
        assert_eq!(parsed.time, NaiveTime::from_hms_opt(14, 5, 0));
    }

    #[test]
    fn test_repr_shapes() {
        let parsed = date_from_repr(&json!({"date": "2024-01-01"})).unwrap();
        assert_eq!(parsed.date, day(2024, 1, 1));

        let parsed = date_from_repr(&json!({"type": "journal", "value": "2024-01-02"})).unwrap();
        assert_eq!(parsed.date, day(2024, 1, 2));

        let parsed = date_from_repr(&json!(r#"{"date":"2024-01-03"}"#)).unwrap();
        assert_eq!(parsed.date, day(2024, 1, 3));

        let parsed = date_from_repr(&json!({"date": 1_704_067_200_000_i64})).unwrap();
        assert_eq!(parsed.date, day(2024, 1, 1));

        assert!(date_from_repr(&json!({"type": "text", "value": "2024-01-01"})).is_none());
    }

    #[test]
    fn test_repr_wins_over_text() {
        let block = Block::new(1)
            .with_text("2020-05-05")
            .with_property(PROP_REPR, json!({"date": "2024-01-01"}));
        assert_eq!(detect_date(&block).unwrap().date, day(2024, 1, 1));
    }

    #[test]
    fn test_relative_labels() {
        let now = at(2024, 6, 12, 18, 0);

        let today = DetectedDate {
            date: day(2024, 6, 12),
            time: NaiveTime::from_hms_opt(9, 30, 0),
        };
        assert_eq!(format_relative(&today, now), "Today 09:30");

        let yesterday = DetectedDate::day(day(2024, 6, 11));
        assert_eq!(format_relative(&yesterday, now), "Yesterday");

        // 2024-06-08 was a Saturday
        let this_week = DetectedDate::day(day(2024, 6, 8));
        assert_eq!(format_relative(&this_week, now), "Saturday");

        let older = DetectedDate::day(day(2024, 1, 1));
        assert_eq!(format_relative(&older, now), "January 1, 2024");

        let future = DetectedDate::day(day(2024, 6, 20));
        assert_eq!(format_relative(&future, now), "June 20, 2024");
    }

    #[test]
    fn test_template_tokens() {
        let dt = at(2024, 1, 5, 7, 3);
        assert_eq!(format_with_template(dt, "YYYY-MM-DD HH:mm:ss"), "2024-01-05 07:03:00");
        assert_eq!(format_with_template(dt, "DD/MM (YYYY)"), "05/01 (2024)");
    }
}

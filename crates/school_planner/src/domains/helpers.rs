//! Logic behind the view template helpers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_TRUNCATE_LENGTH: usize = 140;

/// Shorten `text` to at most `length` chars on a word boundary, marked with `...`.
pub fn truncate(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_string();
    }
    let head: String = text.chars().take(length.saturating_sub(1)).collect();
    let cut = head.rfind(' ').unwrap_or(0);
    format!("{}...", &head[..cut])
}

/// Loose equality of two template values, the way `==` behaves in the views.
pub fn if_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_))
        | (Value::Bool(_), Value::Number(_) | Value::String(_))
        | (Value::Number(_) | Value::String(_), Value::Bool(_)) => {
            match (to_number(a), to_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => a == b,
    }
}

fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                s.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
        }
        _ => None,
    }
}

/// Strict equality between the helper argument and its `value=` hash option.
pub fn if_value(conditional: &Value, value: &Value) -> bool {
    conditional == value
}

pub fn if_array(item: &Value) -> bool {
    item.is_array()
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    De,
    En,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocale(pub String);

impl fmt::Display for UnknownLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported locale {:?}", self.0)
    }
}

impl std::error::Error for UnknownLocale {}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let language = lowered.split(['-', '_']).next().unwrap_or_default();
        match language {
            "de" => Ok(Locale::De),
            "en" => Ok(Locale::En),
            _ => Err(UnknownLocale(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Seconds,
    Minute,
    Minutes(i64),
    Hour,
    Hours(i64),
    Day,
    Days(i64),
    Month,
    Months(i64),
    Year,
    Years(i64),
}

/// "vor 3 Tagen" / "3 days ago" style formatting for a fixed locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelativeTimeFormatter {
    locale: Locale,
}

impl RelativeTimeFormatter {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn from_now(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let diff_ms = (date - now).num_milliseconds();
        let phrase = self.phrase(bucket(diff_ms.unsigned_abs() as f64));
        let future = diff_ms > 0;
        match (self.locale, future) {
            (Locale::De, true) => format!("in {phrase}"),
            (Locale::De, false) => format!("vor {phrase}"),
            (Locale::En, true) => format!("in {phrase}"),
            (Locale::En, false) => format!("{phrase} ago"),
        }
    }

    fn phrase(&self, unit: Unit) -> String {
        match self.locale {
            // With a suffix German needs the dative forms.
            Locale::De => match unit {
                Unit::Seconds => "ein paar Sekunden".into(),
                Unit::Minute => "einer Minute".into(),
                Unit::Minutes(n) => format!("{n} Minuten"),
                Unit::Hour => "einer Stunde".into(),
                Unit::Hours(n) => format!("{n} Stunden"),
                Unit::Day => "einem Tag".into(),
                Unit::Days(n) => format!("{n} Tagen"),
                Unit::Month => "einem Monat".into(),
                Unit::Months(n) => format!("{n} Monaten"),
                Unit::Year => "einem Jahr".into(),
                Unit::Years(n) => format!("{n} Jahren"),
            },
            Locale::En => match unit {
                Unit::Seconds => "a few seconds".into(),
                Unit::Minute => "a minute".into(),
                Unit::Minutes(n) => format!("{n} minutes"),
                Unit::Hour => "an hour".into(),
                Unit::Hours(n) => format!("{n} hours"),
                Unit::Day => "a day".into(),
                Unit::Days(n) => format!("{n} days"),
                Unit::Month => "a month".into(),
                Unit::Months(n) => format!("{n} months"),
                Unit::Year => "a year".into(),
                Unit::Years(n) => format!("{n} years"),
            },
        }
    }
}

/// Threshold buckets: 45 s, 45 min, 22 h, 26 d, 11 months.
fn bucket(abs_ms: f64) -> Unit {
    let seconds = (abs_ms / 1_000.0).round();
    let minutes = (abs_ms / 60_000.0).round();
    let hours = (abs_ms / 3_600_000.0).round();
    let days_exact = abs_ms / 86_400_000.0;
    let days = days_exact.round();
    let months_exact = days_exact * 4_800.0 / 146_097.0;
    let months = months_exact.round();
    let years = (months_exact / 12.0).round();

    if seconds < 45.0 {
        Unit::Seconds
    } else if minutes <= 1.0 {
        Unit::Minute
    } else if minutes < 45.0 {
        Unit::Minutes(minutes as i64)
    } else if hours <= 1.0 {
        Unit::Hour
    } else if hours < 22.0 {
        Unit::Hours(hours as i64)
    } else if days <= 1.0 {
        Unit::Day
    } else if days < 26.0 {
        Unit::Days(days as i64)
    } else if months <= 1.0 {
        Unit::Month
    } else if months < 11.0 {
        Unit::Months(months as i64)
    } else if years <= 1.0 {
        Unit::Year
    } else {
        Unit::Years(years as i64)
    }
}

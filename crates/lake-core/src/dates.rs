//! Resolution of user-supplied publish times
//!
//! Release scheduling accepts either a strict timestamp or a short natural
//! language phrase such as `tomorrow at noon`. All times are UTC.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use regex::Regex;

use crate::{Error, Result};

static RELATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^in\s+(\d+)\s+(minute|min|hour|day|week)s?$")
        .expect("Invalid relative date regex")
});

static DAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(today|tomorrow|(?:next\s+)?(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday)|\d{4}-\d{2}-\d{2})(?:\s+(?:at\s+)?(.+))?$",
    )
    .expect("Invalid day regex")
});

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm)?$").expect("Invalid time regex"));

/// Turns free-form date input into a concrete instant
pub trait DateResolver: Send + Sync {
    /// Reference instant relative phrases are resolved against
    fn now(&self) -> DateTime<Utc>;

    /// `None` when the input is ambiguous or not understood
    fn parse_date(&self, input: &str) -> Option<DateTime<Utc>>;
}

/// Resolve `input`, failing with [`Error::DateParse`] when it is not understood
pub fn resolve_date(resolver: &dyn DateResolver, input: &str) -> Result<DateTime<Utc>> {
    resolver.parse_date(input).ok_or_else(|| Error::DateParse {
        input: input.to_string(),
    })
}

/// Resolve `input` and require the result to lie in the future
pub fn resolve_future_date(resolver: &dyn DateResolver, input: &str) -> Result<DateTime<Utc>> {
    let at = resolve_date(resolver, input)?;
    if at <= resolver.now() {
        return Err(Error::Validation(format!(
            "publish time {} is not in the future",
            at.to_rfc3339()
        )));
    }
    Ok(at)
}

/// ISO-8601 and simple English date phrases.
///
/// Understood forms:
/// - RFC 3339 timestamps, `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD HH:MM`
/// - `now`, `in N minutes|hours|days|weeks`
/// - `today`, `tomorrow`, `<weekday>`, `next <weekday>`, `YYYY-MM-DD`, each
///   optionally followed by `[at] noon|midnight|HH[:MM][am|pm]`
///
/// A day without a time resolves to midnight at the start of that day.
#[derive(Debug, Clone, Default)]
pub struct NaturalDateParser {
    reference: Option<DateTime<Utc>>,
}

impl NaturalDateParser {
    /// Parser resolving relative phrases against the system clock
    pub fn new() -> Self {
        Self { reference: None }
    }

    /// Parser with a fixed reference instant
    pub fn at(reference: DateTime<Utc>) -> Self {
        Self {
            reference: Some(reference),
        }
    }

    fn parse_strict(input: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    fn parse_relative(&self, input: &str) -> Option<DateTime<Utc>> {
        let caps = RELATIVE_PATTERN.captures(input)?;
        let amount: i64 = caps[1].parse().ok()?;
        let delta = match &caps[2] {
            "minute" | "min" => Duration::try_minutes(amount)?,
            "hour" => Duration::try_hours(amount)?,
            "day" => Duration::try_days(amount)?,
            "week" => Duration::try_weeks(amount)?,
            _ => return None,
        };
        self.now().checked_add_signed(delta)
    }

    fn parse_day_phrase(&self, input: &str) -> Option<DateTime<Utc>> {
        let caps = DAY_PATTERN.captures(input)?;
        let day = self.resolve_day(&caps[1])?;
        let time = match caps.get(2) {
            Some(m) => parse_time(m.as_str().trim())?,
            None => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        Some(day.and_time(time).and_utc())
    }

    fn resolve_day(&self, phrase: &str) -> Option<NaiveDate> {
        let today = self.now().date_naive();
        match phrase {
            "today" => Some(today),
            "tomorrow" => today.succ_opt(),
            _ if phrase.len() == 10 && phrase.as_bytes()[4] == b'-' => {
                NaiveDate::parse_from_str(phrase, "%Y-%m-%d").ok()
            }
            _ => {
                let name = phrase.strip_prefix("next").unwrap_or(phrase).trim();
                let target: Weekday = name.parse().ok()?;
                let current = today.weekday().num_days_from_monday() as i64;
                let wanted = target.num_days_from_monday() as i64;
                let mut ahead = (wanted - current).rem_euclid(7);
                if ahead == 0 {
                    ahead = 7;
                }
                today.checked_add_signed(Duration::try_days(ahead)?)
            }
        }
    }
}

impl DateResolver for NaturalDateParser {
    fn now(&self) -> DateTime<Utc> {
        self.reference.unwrap_or_else(Utc::now)
    }

    fn parse_date(&self, input: &str) -> Option<DateTime<Utc>> {
        let trimmed = input.trim();
        if let Some(dt) = Self::parse_strict(trimmed) {
            return Some(dt);
        }

        let normalized = trimmed.to_lowercase();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized == "now" {
            return Some(self.now());
        }
        self.parse_relative(&normalized)
            .or_else(|| self.parse_day_phrase(&normalized))
    }
}

fn parse_time(input: &str) -> Option<NaiveTime> {
    match input {
        "noon" | "midday" => return NaiveTime::from_hms_opt(12, 0, 0),
        "midnight" => return NaiveTime::from_hms_opt(0, 0, 0),
        _ => {}
    }

    let caps = TIME_PATTERN.captures(input)?;
    let mut hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    match caps.get(3).map(|m| m.as_str()) {
        Some("am") if hour == 12 => hour = 0,
        Some("pm") if hour < 12 => hour += 12,
        Some(_) if hour > 12 => return None,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

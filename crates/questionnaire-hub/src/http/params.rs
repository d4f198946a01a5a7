use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::domain::ValidationError;
use crate::repository::PageRequest;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::normalized(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ActiveQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// Which end of a period a date-only value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Accepts RFC 3339 instants or `YYYY-MM-DD` dates. A bare date expands to the first second
/// of the day for `Start` and the last second for `End`.
pub fn parse_instant(raw: &str, bound: Bound) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }

    let field = match bound {
        Bound::Start => "period_start",
        Bound::End => "period_end",
    };
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidValue {
            field,
            value: raw.to_string(),
        }
    })?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

pub fn deserialize_period_start<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw, Bound::Start).map_err(serde::de::Error::custom)
}

pub fn deserialize_period_end<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw, Bound::End).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_period_start<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_instant(&value, Bound::Start).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_optional_period_end<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_instant(&value, Bound::End).map_err(serde::de::Error::custom))
        .transpose()
}

//! Input checks shared by the feature modules.
//!
//! Request bodies arrive loosely typed (strings for ids, dates and enum
//! values) so that bad input is reported as `AppError::Validation` with the
//! offending field named, instead of a generic JSON rejection.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Trimmed, non-empty text or a `Validation` error naming `field`.
pub fn required_text(field: &str, value: Option<&str>) -> AppResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

/// Like [`required_text`], but refuses line breaks and other control
/// characters. Used for values that end up in mail headers.
pub fn single_line_text(field: &str, value: Option<&str>) -> AppResult<String> {
    let text = required_text(field, value)?;
    if text.chars().any(char::is_control) {
        return Err(AppError::Validation(format!("{field} must be a single line")));
    }
    Ok(text)
}

pub fn parse_id(field: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("{field} is not a valid id")))
}

/// Keeps the well-formed ids, in order, without duplicates.
pub fn well_formed_ids<S: AsRef<str>>(raw: &[S]) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(raw.len());
    for id in raw.iter().filter_map(|s| Uuid::parse_str(s.as_ref().trim()).ok()) {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Parses a closed enum through its serde names, e.g. `"in-progress"`.
pub fn parse_enum<T: DeserializeOwned>(field: &str, raw: &str) -> AppResult<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase()))
        .map_err(|_| AppError::Validation(format!("{field} has an unsupported value '{raw}'")))
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its calendar date is kept).
pub fn parse_date(field: &str, raw: &str) -> AppResult<Date> {
    let raw = raw.trim();
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339).map(|ts| ts.date()))
        .map_err(|_| AppError::Validation(format!("{field} is not a valid date")))
}

pub fn parse_timestamp(field: &str, raw: &str) -> AppResult<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|_| AppError::Validation(format!("{field} is not a valid RFC 3339 timestamp")))
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `YYYY-MM-DD` serialization for calendar dates.
pub mod iso_date {
    use serde::{ser::Error as _, Serializer};
    use time::{macros::format_description, Date};

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub mod option {
        use serde::Serializer;
        use time::Date;

        pub fn serialize<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}

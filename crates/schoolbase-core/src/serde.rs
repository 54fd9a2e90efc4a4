//! Deserialization helpers for query strings.
//!
//! Browsers submit untouched filter inputs as `?term=&class_name=`. These
//! helpers treat blank values as absent instead of failing the request.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Deserializes `""` (or whitespace) as `None` and anything else through `FromStr`.
///
/// Accepts both string and native JSON values so the same DTO works for
/// query strings and JSON bodies.
pub fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    let text = match raw {
        None => return Ok(None),
        Some(Raw::Str(s)) => s,
        Some(Raw::Int(i)) => i.to_string(),
        Some(Raw::Float(f)) => f.to_string(),
        Some(Raw::Bool(b)) => b.to_string(),
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Filter {
        #[serde(default, deserialize_with = "empty_string_as_none")]
        term: Option<String>,
        #[serde(default, deserialize_with = "empty_string_as_none")]
        days: Option<i64>,
    }

    #[test]
    fn test_blank_is_none() {
        let f: Filter = serde_json::from_str(r#"{"term":"  ","days":""}"#).unwrap();
        assert!(f.term.is_none());
        assert!(f.days.is_none());
    }

    #[test]
    fn test_values_parse() {
        let f: Filter = serde_json::from_str(r#"{"term":"T1","days":"14"}"#).unwrap();
        assert_eq!(f.term.as_deref(), Some("T1"));
        assert_eq!(f.days, Some(14));
    }

    #[test]
    fn test_native_numbers_accepted() {
        let f: Filter = serde_json::from_str(r#"{"days":7}"#).unwrap();
        assert_eq!(f.days, Some(7));
    }

    #[test]
    fn test_missing_fields() {
        let f: Filter = serde_json::from_str("{}").unwrap();
        assert!(f.term.is_none());
        assert!(f.days.is_none());
    }

    #[test]
    fn test_bad_number_errors() {
        let parsed: Result<Filter, _> = serde_json::from_str(r#"{"days":"soon"}"#);
        assert!(parsed.is_err());
    }
}

//! Forgiving field deserializers for rule conditions.
//!
//! Rule conditions are hand-edited configuration. A value of the wrong shape
//! (`repeat_count: ten`, `value: [1]`) must not reject the document: it turns
//! into "absent", and the evaluator treats the rule as not satisfied.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// Any scalar the rule formats (YAML, JSON) can produce for a condition field.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Scalars become their textual form; numbers written without quotes are accepted.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => Some(b.to_string()),
        Scalar::Int(i) => Some(i.to_string()),
        Scalar::Float(f) => Some(f.to_string()),
        Scalar::Text(s) => Some(s),
        Scalar::Other(_) => None,
    })
}

/// Like [`text`], but a missing or malformed value collapses to an empty string.
pub(crate) fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer).map(Option::unwrap_or_default)
}

/// Non-negative integer, given either as a number or as a numeric string.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Int(i) => u32::try_from(i).ok(),
        Scalar::Float(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => Some(f as u32),
        Scalar::Text(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Boolean, given either as a bool or as `"true"` / `"false"`. Anything else is `false`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => b,
        Scalar::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

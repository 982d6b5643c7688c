//! The rule model: rule type, predicate conditions and targeted achievement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use kindle_core::AchievementId;

use super::lenient;

pub type RuleId = i64;

/// Evaluation family of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    /// Threshold check against the current event's attributes only.
    Simple,
    /// Sum / count / average over the event history plus the current event.
    Repetitive,
    /// Calendar-interval grouping with optional consecutive-run detection.
    IntervalRepetitive,
}

impl RuleType {
    /// Whether evaluating this type needs the profile's event history.
    pub fn needs_history(&self) -> bool {
        !matches!(self, RuleType::Simple)
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleType::Simple => write!(f, "SIMPLE"),
            RuleType::Repetitive => write!(f, "REPETITIVE"),
            RuleType::IntervalRepetitive => write!(f, "INTERVAL_REPETITIVE"),
        }
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(RuleType::Simple),
            "REPETITIVE" => Ok(RuleType::Repetitive),
            "INTERVAL_REPETITIVE" => Ok(RuleType::IntervalRepetitive),
            other => Err(format!("unknown rule type: '{}'", other)),
        }
    }
}

/// Predicate body of a rule.
///
/// One struct for all rule types; which fields matter depends on the type:
/// - every type: `behavior_type`
/// - SIMPLE: `attribute`, `operator` (`>=`, `<=`, `>`, `<`, `==`, `!=`), `value`
/// - REPETITIVE: `attribute` (not for `count_`), `operator` with an aggregation
///   prefix (`sum_>=`, `count_==`, `avg_<`, ...), `value`
/// - INTERVAL_REPETITIVE: `interval` (`daily` | `weekly`), `repeat_count`, `consecutive`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleConditions {
    #[serde(default, alias = "behaviorType", deserialize_with = "lenient::text_or_empty")]
    pub behavior_type: String,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(
        default,
        alias = "repeatCount",
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeat_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub consecutive: bool,
}

impl RuleConditions {
    /// Conditions for a single-event threshold check.
    pub fn threshold(
        behavior_type: impl Into<String>,
        attribute: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            behavior_type: behavior_type.into(),
            attribute: Some(attribute.into()),
            operator: Some(operator.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Conditions for an interval rule.
    pub fn every(
        behavior_type: impl Into<String>,
        interval: impl Into<String>,
        repeat_count: u32,
        consecutive: bool,
    ) -> Self {
        Self {
            behavior_type: behavior_type.into(),
            interval: Some(interval.into()),
            repeat_count: Some(repeat_count),
            consecutive,
            ..Self::default()
        }
    }
}

/// A stored predicate plus the achievement it controls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub conditions: RuleConditions,
    #[serde(alias = "achievementId")]
    pub achievement_id: AchievementId,
}

impl Rule {
    pub fn new(
        id: RuleId,
        rule_type: RuleType,
        conditions: RuleConditions,
        achievement_id: AchievementId,
    ) -> Self {
        Self {
            id,
            rule_type,
            conditions,
            achievement_id,
        }
    }
}

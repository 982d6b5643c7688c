use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier assigned to a behavior by the event store. `0` until persisted.
pub type BehaviorId = i64;

/// Identifier of the user profile that owns events, achievements and XP.
pub type ProfileId = i64;

/// Free-form attribute bag attached to a behavior.
///
/// Values are always strings, numbers and booleans included ("12", "true").
/// Comparisons parse them lazily, so the map is never strengthened to typed values.
pub type Attributes = HashMap<String, String>;

/// A single timestamped user-activity event.
///
/// Created once per interaction by the calling application and never mutated
/// afterwards. The event log is replayed by the history-based evaluators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behavior {
    #[serde(default)]
    pub id: BehaviorId,
    /// Event type tag, e.g. `session_complete`, `app_open`, `daily_activity`.
    #[serde(rename = "type")]
    pub behavior_type: String,
    /// Occurrence time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub attributes: Attributes,
    pub profile_id: ProfileId,
}

impl Behavior {
    /// New, not yet persisted behavior without attributes.
    pub fn new(behavior_type: impl Into<String>, timestamp: i64, profile_id: ProfileId) -> Self {
        Self {
            id: 0,
            behavior_type: behavior_type.into(),
            timestamp,
            attributes: Attributes::new(),
            profile_id,
        }
    }

    /// Builder-style attribute setter. Numeric values go in as their decimal text.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(key.into(), value.to_string());
        self
    }

    /// Copy of this behavior carrying the id the event store assigned.
    pub fn with_id(mut self, id: BehaviorId) -> Self {
        self.id = id;
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Occurrence time as a UTC datetime, `None` if the timestamp is out of range.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_stored_as_text() {
        let b = Behavior::new("session_complete", 1_700_000_000_000, 1)
            .with_attribute("correct_count", 12)
            .with_attribute("won", true);

        assert_eq!(b.attribute("correct_count"), Some("12"));
        assert_eq!(b.attribute("won"), Some("true"));
        assert_eq!(b.attribute("missing"), None);
        assert_eq!(b.id, 0);
    }

    #[test]
    fn json_uses_type_key() {
        let json = r#"{"type":"app_open","timestamp":0,"profile_id":3}"#;
        let b: Behavior = serde_json::from_str(json).unwrap();
        assert_eq!(b.behavior_type, "app_open");
        assert_eq!(b.profile_id, 3);
        assert!(b.attributes.is_empty());
        assert_eq!(b.occurred_at().unwrap().timestamp(), 0);
    }
}

//! On-disk rule document: header plus the flattened rule.

use serde::{Deserialize, Serialize};

use super::{Rule, RuleMetadata};

/// Only document kind the loader accepts.
pub const RULE_KIND: &str = "Rule";

/// Supported document schema version.
pub const API_VERSION: &str = "v1";

/// A rule as stored in one YAML file.
///
/// ```yaml
/// apiVersion: v1
/// kind: Rule
/// metadata:
///   name: ten-correct
/// id: 3
/// type: SIMPLE
/// achievement_id: 3
/// conditions:
///   behavior_type: session_complete
///   attribute: correct_count
///   operator: ">="
///   value: "10"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleDocument {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: RuleMetadata,
    #[serde(flatten)]
    pub rule: Rule,
}

impl RuleDocument {
    /// Wrap a rule in a `v1` document header.
    pub fn new(rule: Rule, metadata: RuleMetadata) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: RULE_KIND.to_string(),
            metadata,
            rule,
        }
    }

    pub fn id(&self) -> super::RuleId {
        self.rule.id
    }

    pub fn is_enabled(&self) -> bool {
        self.metadata.enabled
    }

    /// Check the header fields the loader relies on.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.kind != RULE_KIND {
            return Err(format!("unsupported kind '{}', expected '{}'", self.kind, RULE_KIND));
        }
        if self.api_version != API_VERSION {
            return Err(format!(
                "unsupported apiVersion '{}', expected '{}'",
                self.api_version, API_VERSION
            ));
        }
        if self.rule.id <= 0 {
            return Err(format!("rule id must be positive, got {}", self.rule.id));
        }
        Ok(())
    }

    /// Serialize this document to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

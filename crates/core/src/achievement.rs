use serde::{Deserialize, Serialize};

use crate::behavior::ProfileId;

pub type AchievementId = i64;

/// Category tag given to achievements created on the fly, when no catalog
/// entry existed for the id a satisfied rule targets.
pub const DYNAMIC_ACHIEVEMENT_TYPE: &str = "dynamic";

/// Mutable reward state for one profile.
///
/// `achievement_type` is the category used for the XP lookup
/// (`streak`, `accuracy`, `word_count`, `speed`, `rare`, or `dynamic`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    #[serde(default)]
    pub id: AchievementId,
    #[serde(rename = "type")]
    pub achievement_type: String,
    /// Progressive counter, bumped each time an already unlocked achievement is earned again.
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub profile_id: ProfileId,
}

impl Achievement {
    /// A locked catalog entry.
    pub fn locked(
        id: AchievementId,
        achievement_type: impl Into<String>,
        description: impl Into<String>,
        profile_id: ProfileId,
    ) -> Self {
        Self {
            id,
            achievement_type: achievement_type.into(),
            value: None,
            unlocked: false,
            description: Some(description.into()),
            profile_id,
        }
    }
}

/// A user profile: XP total and streak bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: ProfileId,
    pub name: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub streak_days: u32,
    /// Timestamp (ms) of the last event that changed the streak.
    #[serde(default)]
    pub last_active_date: i64,
}

impl Profile {
    pub fn new(id: ProfileId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            xp: 0,
            streak_days: 0,
            last_active_date: 0,
        }
    }
}

//! Reward resolution and the XP-by-category table.
//!
//! A satisfied rule moves its achievement through a small state machine:
//!
//! | stored state | transition                          | outcome         |
//! |--------------|-------------------------------------|-----------------|
//! | absent       | create, `dynamic`, value 1, unlocked | `NewlyUnlocked` |
//! | locked       | unlock, other fields untouched       | `NewlyUnlocked` |
//! | unlocked     | `value += 1` (absent counts as 0)    | `Updated`       |
//!
//! Only the first unlock pays XP.

use kindle_core::{Achievement, AchievementId, ProfileId, DYNAMIC_ACHIEVEMENT_TYPE};
use serde::Serialize;
use tracing::{debug, info};

use crate::store::{AchievementStore, StoreResult};

pub const STREAK_XP: u32 = 50;
pub const ACCURACY_XP: u32 = 30;
pub const WORD_COUNT_XP: u32 = 40;
pub const SPEED_XP: u32 = 25;
pub const RARE_XP: u32 = 100;
pub const DEFAULT_XP: u32 = 20;

/// Description given to achievements created on first satisfaction.
pub const DYNAMIC_ACHIEVEMENT_DESCRIPTION: &str = "Achievement unlocked!";

/// XP granted for unlocking an achievement of `category`.
pub fn xp_for_category(category: &str) -> u32 {
    match category {
        "streak" => STREAK_XP,
        "accuracy" => ACCURACY_XP,
        "word_count" => WORD_COUNT_XP,
        "speed" => SPEED_XP,
        "rare" => RARE_XP,
        _ => DEFAULT_XP,
    }
}

/// What happened to an achievement when its rule was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "achievement", rename_all = "snake_case")]
pub enum RewardOutcome {
    NewlyUnlocked(Achievement),
    Updated(Achievement),
}

impl RewardOutcome {
    pub fn achievement(&self) -> &Achievement {
        match self {
            RewardOutcome::NewlyUnlocked(a) | RewardOutcome::Updated(a) => a,
        }
    }

    /// XP this outcome is worth: the category rate on first unlock, else 0.
    pub fn xp(&self) -> u32 {
        match self {
            RewardOutcome::NewlyUnlocked(a) => xp_for_category(&a.achievement_type),
            RewardOutcome::Updated(_) => 0,
        }
    }
}

/// Apply the reward state machine for one satisfied rule.
pub async fn resolve_reward(
    store: &dyn AchievementStore,
    achievement_id: AchievementId,
    profile_id: ProfileId,
) -> StoreResult<RewardOutcome> {
    match store.get_by_id(achievement_id).await? {
        None => {
            let mut created = Achievement {
                id: achievement_id,
                achievement_type: DYNAMIC_ACHIEVEMENT_TYPE.to_string(),
                value: Some(1),
                unlocked: true,
                description: Some(DYNAMIC_ACHIEVEMENT_DESCRIPTION.to_string()),
                profile_id,
            };
            created.id = store.create(&created).await?;
            info!(achievement_id = created.id, profile_id, "Achievement created and unlocked");
            Ok(RewardOutcome::NewlyUnlocked(created))
        }
        Some(mut existing) if !existing.unlocked => {
            existing.unlocked = true;
            store.update(&existing).await?;
            info!(
                achievement_id,
                profile_id,
                category = %existing.achievement_type,
                "Achievement unlocked"
            );
            Ok(RewardOutcome::NewlyUnlocked(existing))
        }
        Some(mut existing) => {
            existing.value = Some(existing.value.unwrap_or(0) + 1);
            store.update(&existing).await?;
            debug!(achievement_id, value = ?existing.value, "Achievement progress incremented");
            Ok(RewardOutcome::Updated(existing))
        }
    }
}

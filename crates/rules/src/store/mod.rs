//! Collaborator interfaces the engine reads from and writes to.
//!
//! Concrete persistence lives outside this crate; [`memory`] holds the
//! in-process implementations used by the replay tool and tests.

pub mod memory;

use kindle_core::{
    Achievement, AchievementId, Behavior, BehaviorId, Profile, ProfileId, StoreError,
};

use crate::schema::Rule;

pub use memory::{MemoryAchievementStore, MemoryEventStore, MemoryProfileStore, MemoryRuleStore};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Append-only behavior log.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a behavior and return the id assigned to it.
    async fn save(&self, behavior: &Behavior) -> StoreResult<BehaviorId>;

    async fn list_by_profile(&self, profile_id: ProfileId) -> StoreResult<Vec<Behavior>>;

    async fn list_by_profile_and_type(
        &self,
        profile_id: ProfileId,
        behavior_type: &str,
    ) -> StoreResult<Vec<Behavior>>;
}

/// Source of the active rule set.
#[async_trait::async_trait]
pub trait RuleStore: Send + Sync {
    async fn list_all(&self) -> StoreResult<Vec<Rule>>;
}

#[async_trait::async_trait]
pub trait AchievementStore: Send + Sync {
    async fn get_by_id(&self, id: AchievementId) -> StoreResult<Option<Achievement>>;

    async fn update(&self, achievement: &Achievement) -> StoreResult<()>;

    /// Insert a new achievement and return its id.
    async fn create(&self, achievement: &Achievement) -> StoreResult<AchievementId>;

    async fn list_by_profile(&self, profile_id: ProfileId) -> StoreResult<Vec<Achievement>>;

    async fn list_unlocked(&self, profile_id: ProfileId) -> StoreResult<Vec<Achievement>> {
        let all = self.list_by_profile(profile_id).await?;
        Ok(all.into_iter().filter(|a| a.unlocked).collect())
    }

    async fn list_locked(&self, profile_id: ProfileId) -> StoreResult<Vec<Achievement>> {
        let all = self.list_by_profile(profile_id).await?;
        Ok(all.into_iter().filter(|a| !a.unlocked).collect())
    }
}

#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_by_id(&self, id: ProfileId) -> StoreResult<Option<Profile>>;

    /// Additive XP update. Atomicity is the store's concern.
    async fn add_xp(&self, profile_id: ProfileId, amount: u32) -> StoreResult<()>;

    async fn update_streak(
        &self,
        profile_id: ProfileId,
        streak_days: u32,
        last_active_date: i64,
    ) -> StoreResult<()>;
}

//! In-memory stores backed by `tokio::sync::RwLock`.

use std::collections::{BTreeMap, HashMap};

use kindle_core::{
    Achievement, AchievementId, Behavior, BehaviorId, Profile, ProfileId, StoreError,
};
use tokio::sync::RwLock;

use super::{AchievementStore, EventStore, ProfileStore, RuleStore, StoreResult};
use crate::schema::Rule;

// ── Events ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct EventLog {
    next_id: BehaviorId,
    events: Vec<Behavior>,
}

/// Behavior log with sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<EventLog>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sorted_by_time(mut events: Vec<Behavior>) -> Vec<Behavior> {
    events.sort_by_key(|b| (b.timestamp, b.id));
    events
}

#[async_trait::async_trait]
impl EventStore for MemoryEventStore {
    async fn save(&self, behavior: &Behavior) -> StoreResult<BehaviorId> {
        let mut log = self.inner.write().await;
        log.next_id += 1;
        let id = log.next_id;
        log.events.push(behavior.clone().with_id(id));
        Ok(id)
    }

    async fn list_by_profile(&self, profile_id: ProfileId) -> StoreResult<Vec<Behavior>> {
        let log = self.inner.read().await;
        let events = log
            .events
            .iter()
            .filter(|b| b.profile_id == profile_id)
            .cloned()
            .collect();
        Ok(sorted_by_time(events))
    }

    async fn list_by_profile_and_type(
        &self,
        profile_id: ProfileId,
        behavior_type: &str,
    ) -> StoreResult<Vec<Behavior>> {
        let log = self.inner.read().await;
        let events = log
            .events
            .iter()
            .filter(|b| b.profile_id == profile_id && b.behavior_type == behavior_type)
            .cloned()
            .collect();
        Ok(sorted_by_time(events))
    }
}

// ── Rules ───────────────────────────────────────────────────────────

/// Fixed rule list, replaceable as a whole.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<Vec<Rule>>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    pub async fn replace(&self, rules: Vec<Rule>) {
        *self.rules.write().await = rules;
    }
}

#[async_trait::async_trait]
impl RuleStore for MemoryRuleStore {
    async fn list_all(&self) -> StoreResult<Vec<Rule>> {
        Ok(self.rules.read().await.clone())
    }
}

// ── Achievements ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryAchievementStore {
    rows: RwLock<BTreeMap<AchievementId, Achievement>>,
}

impl MemoryAchievementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a catalog. Later duplicates of an id replace earlier ones.
    pub fn with_achievements(achievements: impl IntoIterator<Item = Achievement>) -> Self {
        let rows = achievements.into_iter().map(|a| (a.id, a)).collect();
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait::async_trait]
impl AchievementStore for MemoryAchievementStore {
    async fn get_by_id(&self, id: AchievementId) -> StoreResult<Option<Achievement>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn update(&self, achievement: &Achievement) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&achievement.id) {
            Some(row) => {
                *row = achievement.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound {
                entity: "achievement",
                id: achievement.id,
            }),
        }
    }

    async fn create(&self, achievement: &Achievement) -> StoreResult<AchievementId> {
        let mut rows = self.rows.write().await;
        let id = if achievement.id == 0 {
            rows.keys().next_back().map_or(1, |last| last + 1)
        } else {
            achievement.id
        };
        if rows.contains_key(&id) {
            return Err(StoreError::Conflict(format!("achievement {} already exists", id)));
        }
        let mut row = achievement.clone();
        row.id = id;
        rows.insert(id, row);
        Ok(id)
    }

    async fn list_by_profile(&self, profile_id: ProfileId) -> StoreResult<Vec<Achievement>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|a| a.profile_id == profile_id)
            .cloned()
            .collect())
    }
}

// ── Profiles ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<HashMap<ProfileId, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let profiles = profiles.into_iter().map(|p| (p.id, p)).collect();
        Self {
            profiles: RwLock::new(profiles),
        }
    }

    /// Insert or replace a profile.
    pub async fn insert(&self, profile: Profile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_by_id(&self, id: ProfileId) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn add_xp(&self, profile_id: ProfileId, amount: u32) -> StoreResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&profile_id).ok_or(StoreError::NotFound {
            entity: "profile",
            id: profile_id,
        })?;
        profile.xp = profile.xp.saturating_add(u64::from(amount));
        Ok(())
    }

    async fn update_streak(
        &self,
        profile_id: ProfileId,
        streak_days: u32,
        last_active_date: i64,
    ) -> StoreResult<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&profile_id).ok_or(StoreError::NotFound {
            entity: "profile",
            id: profile_id,
        })?;
        profile.streak_days = streak_days;
        profile.last_active_date = last_active_date;
        Ok(())
    }
}

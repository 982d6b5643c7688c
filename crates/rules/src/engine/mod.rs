//! The orchestrator: persist a behavior, evaluate every rule, pay rewards,
//! keep the profile streak current.

mod error;
mod locks;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use kindle_core::config::EngineConfig;
use kindle_core::{Achievement, Behavior, ProfileId, StoreError};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::audit_log::{AuditLog, ExecutionPhase, LogEntry, LogLevel};
use crate::evaluator::{matches_behavior_type, IntervalRepetitiveRuleEvaluator, RuleEvaluator};
use crate::reward::{resolve_reward, RewardOutcome};
use crate::schema::{Rule, RuleId};
use crate::store::{AchievementStore, EventStore, ProfileStore, RuleStore};

pub use error::{EngineError, Result};
use locks::ProfileLocks;

/// Everything one `process` call granted or changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineResult {
    /// XP added to the profile. Only first unlocks pay.
    pub xp_granted: u32,
    pub new_achievements: Vec<Achievement>,
    /// Already unlocked achievements whose progress counter moved.
    pub updated_achievements: Vec<Achievement>,
    pub streak_updated: bool,
    /// The new streak when `streak_updated`, otherwise the stored one
    /// (0 for behaviors that do not count toward the streak).
    pub new_streak_days: u32,
}

impl EngineResult {
    pub fn has_rewards(&self) -> bool {
        !self.new_achievements.is_empty() || !self.updated_achievements.is_empty()
    }
}

/// Which achievements [`RuleEngine::achievements`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AchievementFilter {
    #[default]
    All,
    Unlocked,
    Locked,
}

/// Behavior history per behavior type, loaded at most once per call.
type HistorySnapshot = HashMap<String, Vec<Behavior>>;

pub struct RuleEngine {
    events: Arc<dyn EventStore>,
    rules: Arc<dyn RuleStore>,
    achievements: Arc<dyn AchievementStore>,
    profiles: Arc<dyn ProfileStore>,
    evaluator: RuleEvaluator,
    config: EngineConfig,
    audit: Option<Arc<AuditLog>>,
    locks: ProfileLocks,
}

impl RuleEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        rules: Arc<dyn RuleStore>,
        achievements: Arc<dyn AchievementStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            events,
            rules,
            achievements,
            profiles,
            evaluator: RuleEvaluator::default(),
            config: EngineConfig::default(),
            audit: None,
            locks: ProfileLocks::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.evaluator = RuleEvaluator::new(IntervalRepetitiveRuleEvaluator::with_utc_offset_minutes(
            config.utc_offset_minutes,
        ));
        self.config = config;
        self
    }

    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one behavior through the whole pipeline.
    ///
    /// Store failures propagate as they happen; writes already made (the
    /// persisted event, earlier rewards) are not rolled back.
    #[instrument(skip_all, fields(profile_id = behavior.profile_id, behavior_type = %behavior.behavior_type))]
    pub async fn process(&self, behavior: &Behavior) -> Result<EngineResult> {
        let _guard = if self.config.serialize_per_profile {
            Some(self.locks.acquire(behavior.profile_id).await)
        } else {
            None
        };

        let id = self.events.save(behavior).await?;
        let behavior = behavior.clone().with_id(id);
        let profile_id = behavior.profile_id;

        let rules = self.rules.list_all().await?;
        let outcomes = self.evaluate_rules(&rules, profile_id, &behavior).await?;

        for (rule, satisfied) in rules.iter().zip(&outcomes) {
            self.audit_evaluation(rule, &behavior, *satisfied);
        }

        let mut result = EngineResult::default();
        for (rule, _) in rules.iter().zip(&outcomes).filter(|(_, satisfied)| **satisfied) {
            let resolved = resolve_reward(self.achievements.as_ref(), rule.achievement_id, profile_id).await;
            let outcome = match resolved {
                Ok(outcome) => outcome,
                Err(e) => {
                    self.audit_reward_failure(rule, &behavior, &e);
                    return Err(e.into());
                }
            };
            self.audit_reward(rule, &behavior, &outcome);
            result.xp_granted += outcome.xp();
            match outcome {
                RewardOutcome::NewlyUnlocked(a) => result.new_achievements.push(a),
                RewardOutcome::Updated(a) => result.updated_achievements.push(a),
            }
        }

        if result.xp_granted > 0 {
            self.profiles.add_xp(profile_id, result.xp_granted).await?;
            info!(profile_id, xp = result.xp_granted, "XP granted");
        }

        let (streak_updated, new_streak_days) = self.update_streak_if_needed(&behavior).await?;
        result.streak_updated = streak_updated;
        result.new_streak_days = new_streak_days;

        Ok(result)
    }

    /// Dry run: which rules `behavior` would satisfy for `profile_id`. No writes.
    pub async fn evaluate_all_rules(
        &self,
        profile_id: ProfileId,
        behavior: &Behavior,
    ) -> Result<BTreeMap<RuleId, bool>> {
        let rules = self.rules.list_all().await?;
        let outcomes = self.evaluate_rules(&rules, profile_id, behavior).await?;
        Ok(rules.iter().map(|r| r.id).zip(outcomes).collect())
    }

    /// Current streak of the profile, measured up to now.
    ///
    /// Counts the type of the profile's oldest streak-type event.
    pub async fn get_current_streak(&self, profile_id: ProfileId) -> Result<u32> {
        self.get_current_streak_at(profile_id, Utc::now().timestamp_millis()).await
    }

    /// Streak ending at the interval that contains `reference_ms`.
    pub async fn get_current_streak_at(&self, profile_id: ProfileId, reference_ms: i64) -> Result<u32> {
        let behaviors = self.events.list_by_profile(profile_id).await?;
        let Some(first) = behaviors
            .iter()
            .find(|b| self.config.is_streak_behavior(&b.behavior_type))
        else {
            return Ok(0);
        };
        Ok(self.streak_from(&behaviors, &first.behavior_type, reference_ms))
    }

    pub async fn achievements(
        &self,
        profile_id: ProfileId,
        filter: AchievementFilter,
    ) -> Result<Vec<Achievement>> {
        let list = match filter {
            AchievementFilter::All => self.achievements.list_by_profile(profile_id).await?,
            AchievementFilter::Unlocked => self.achievements.list_unlocked(profile_id).await?,
            AchievementFilter::Locked => self.achievements.list_locked(profile_id).await?,
        };
        Ok(list)
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Evaluate every rule against one history snapshot.
    ///
    /// History is fetched per behavior type on first need, before any reward
    /// write, so no rule sees a sibling's side effects. Rules whose type gate
    /// fails never trigger a fetch.
    async fn evaluate_rules(
        &self,
        rules: &[Rule],
        profile_id: ProfileId,
        behavior: &Behavior,
    ) -> Result<Vec<bool>> {
        let mut snapshot = HistorySnapshot::new();
        let mut outcomes = Vec::with_capacity(rules.len());

        for rule in rules {
            let satisfied = if !matches_behavior_type(&rule.conditions, behavior) {
                false
            } else if rule.rule_type.needs_history() {
                let behavior_type = &rule.conditions.behavior_type;
                if !snapshot.contains_key(behavior_type) {
                    let history = self.events.list_by_profile_and_type(profile_id, behavior_type).await?;
                    snapshot.insert(behavior_type.clone(), history);
                }
                let history = snapshot.get(behavior_type).map(Vec::as_slice).unwrap_or_default();
                self.evaluator.evaluate(rule, behavior, history)
            } else {
                self.evaluator.evaluate(rule, behavior, &[])
            };

            debug!(rule_id = rule.id, rule_type = %rule.rule_type, satisfied, "Rule evaluated");
            outcomes.push(satisfied);
        }
        Ok(outcomes)
    }

    /// Recompute the streak for streak-relevant behaviors and persist it when it moved.
    /// Only events of the triggering behavior's type count.
    ///
    /// Returns `(changed, streak)`; `streak` is the stored value when unchanged.
    async fn update_streak_if_needed(&self, behavior: &Behavior) -> Result<(bool, u32)> {
        if !self.config.is_streak_behavior(&behavior.behavior_type) {
            return Ok((false, 0));
        }
        let Some(profile) = self.profiles.get_by_id(behavior.profile_id).await? else {
            warn!(profile_id = behavior.profile_id, "Profile not found, streak not updated");
            return Ok((false, 0));
        };

        let behaviors = self.events.list_by_profile(behavior.profile_id).await?;
        let streak = self.streak_from(&behaviors, &behavior.behavior_type, behavior.timestamp);
        if streak == profile.streak_days {
            return Ok((false, profile.streak_days));
        }

        self.profiles
            .update_streak(behavior.profile_id, streak, behavior.timestamp)
            .await?;
        info!(
            profile_id = behavior.profile_id,
            from = profile.streak_days,
            to = streak,
            "Streak updated"
        );
        Ok((true, streak))
    }

    fn streak_from(&self, behaviors: &[Behavior], behavior_type: &str, reference_ms: i64) -> u32 {
        self.evaluator.interval().current_streak_matching(
            behaviors,
            |b| b.behavior_type == behavior_type && self.config.is_streak_behavior(&b.behavior_type),
            &self.config.streak_interval,
            reference_ms,
        )
    }

    fn audit_evaluation(&self, rule: &Rule, behavior: &Behavior, satisfied: bool) {
        let Some(audit) = &self.audit else { return };
        let (level, message) = if satisfied {
            (LogLevel::Info, "Rule satisfied")
        } else {
            (LogLevel::Debug, "Rule not satisfied")
        };
        audit.record(
            LogEntry::new(rule.id, behavior.profile_id, behavior.id, ExecutionPhase::Evaluation, message)
                .level(level)
                .details(serde_json::json!({
                    "rule_type": rule.rule_type.to_string(),
                    "behavior_type": behavior.behavior_type,
                })),
        );
    }

    fn audit_reward(&self, rule: &Rule, behavior: &Behavior, outcome: &RewardOutcome) {
        let Some(audit) = &self.audit else { return };
        let message = match outcome {
            RewardOutcome::NewlyUnlocked(_) => "Achievement unlocked",
            RewardOutcome::Updated(_) => "Achievement progress updated",
        };
        let achievement = outcome.achievement();
        audit.record(
            LogEntry::new(rule.id, behavior.profile_id, behavior.id, ExecutionPhase::Reward, message)
                .achievement(achievement.id)
                .details(serde_json::json!({
                    "xp": outcome.xp(),
                    "value": achievement.value,
                    "category": achievement.achievement_type,
                })),
        );
    }

    fn audit_reward_failure(&self, rule: &Rule, behavior: &Behavior, error: &StoreError) {
        let Some(audit) = &self.audit else { return };
        audit.record(
            LogEntry::new(
                rule.id,
                behavior.profile_id,
                behavior.id,
                ExecutionPhase::Reward,
                "Reward resolution failed",
            )
            .level(LogLevel::Error)
            .achievement(rule.achievement_id)
            .details(serde_json::json!({ "error": error.to_string() })),
        );
    }
}

//! In-memory audit trail of rule outcomes.
//!
//! One FIFO-capped deque per rule id. Uses `std::sync::RwLock`; entries are
//! appended outside any await point so the lock is never held across one.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use kindle_core::{AchievementId, BehaviorId, ProfileId};
use serde::{Deserialize, Serialize};

use crate::schema::RuleId;

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    /// A store failure during reward resolution.
    Error,
}

/// Step of a `process` call that produced the entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    /// The rule's evaluator ran against the current behavior.
    Evaluation,
    /// The rule's achievement went through reward resolution.
    Reward,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub rule_id: RuleId,
    pub profile_id: ProfileId,
    pub behavior_id: BehaviorId,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_id: Option<AchievementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(
        rule_id: RuleId,
        profile_id: ProfileId,
        behavior_id: BehaviorId,
        phase: ExecutionPhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            rule_id,
            profile_id,
            behavior_id,
            level: LogLevel::Info,
            phase,
            message: message.into(),
            achievement_id: None,
            details: None,
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn achievement(mut self, id: AchievementId) -> Self {
        self.achievement_id = Some(id);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Filter for [`AuditLog::query`]. All fields optional.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    /// Minimum level, inclusive.
    pub level: Option<LogLevel>,
    pub phase: Option<ExecutionPhase>,
    pub profile_id: Option<ProfileId>,
    /// Defaults to 100.
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
}

pub struct AuditLog {
    entries: RwLock<HashMap<RuleId, VecDeque<LogEntry>>>,
    max_entries_per_rule: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(500)
    }

    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries_per_rule: max,
        }
    }

    pub fn record(&self, entry: LogEntry) {
        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        let deque = guard.entry(entry.rule_id).or_default();
        deque.push_back(entry);
        while deque.len() > self.max_entries_per_rule {
            deque.pop_front();
        }
    }

    /// Entries for one rule, newest first.
    pub fn query(&self, rule_id: RuleId, params: &LogQuery) -> Vec<LogEntry> {
        let guard = self.entries.read().expect("audit_log lock poisoned");
        let Some(deque) = guard.get(&rule_id) else {
            return Vec::new();
        };

        let min_level = params.level.unwrap_or(LogLevel::Debug);
        deque
            .iter()
            .rev()
            .filter(|e| e.level >= min_level)
            .filter(|e| params.phase.map_or(true, |p| e.phase == p))
            .filter(|e| params.profile_id.map_or(true, |p| e.profile_id == p))
            .filter(|e| params.since.map_or(true, |s| e.timestamp >= s))
            .take(params.limit.unwrap_or(100))
            .cloned()
            .collect()
    }

    /// Rule ids that have at least one entry, ascending.
    pub fn rule_ids(&self) -> Vec<RuleId> {
        let guard = self.entries.read().expect("audit_log lock poisoned");
        let mut ids: Vec<RuleId> = guard.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&self, rule_id: RuleId) {
        let mut guard = self.entries.write().expect("audit_log lock poisoned");
        guard.remove(&rule_id);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

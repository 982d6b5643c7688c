//! Rule engine for behavior-driven achievements.
//!
//! This crate provides:
//! - Rule model and YAML rule documents with lenient condition parsing
//! - Evaluators for SIMPLE, REPETITIVE and INTERVAL_REPETITIVE rules
//! - Reward resolution (create / unlock / increment) and the XP table
//! - The [`RuleEngine`] orchestrator over async store traits
//! - Filesystem rule loader with hot-reload via `notify` watcher
//! - In-memory per-rule audit log

pub mod audit_log;
pub mod catalog;
pub mod compare;
pub mod engine;
pub mod evaluator;
pub mod loader;
pub mod reward;
pub mod schema;
pub mod store;

pub use engine::{AchievementFilter, EngineError, EngineResult, RuleEngine};
pub use loader::RuleLoader;
pub use reward::{xp_for_category, RewardOutcome};
pub use schema::{Rule, RuleConditions, RuleDocument, RuleId, RuleType};

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_i32(profile: &str, key: &str, default: i32) -> i32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key).as_deref() {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

/// Split a comma separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub rules: RulesConfig,
    pub audit: AuditConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `KINDLE_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("KINDLE_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p),
            rules: RulesConfig::from_env_profiled(p),
            audit: AuditConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:  streak_types={}, interval={}, utc_offset_minutes={}, serialize_per_profile={}",
            self.engine.streak_behavior_types.join(","),
            self.engine.streak_interval,
            self.engine.utc_offset_minutes,
            self.engine.serialize_per_profile
        );
        tracing::info!("  rules:   dir={}, watch={}", self.rules.rules_dir.display(), self.rules.watch);
        tracing::info!("  audit:   max_entries_per_rule={}", self.audit.max_entries_per_rule);
    }
}

// ── Engine ────────────────────────────────────────────────────

/// Behavior types that trigger a `Profile.streak_days` recompute.
pub const DEFAULT_STREAK_BEHAVIOR_TYPES: &[&str] = &["session_complete", "app_open", "daily_activity"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub streak_behavior_types: Vec<String>,
    /// `daily` or `weekly`.
    pub streak_interval: String,
    /// Offset of the calendar used to cut timestamps into days and weeks.
    pub utc_offset_minutes: i32,
    /// Hold a per-profile lock for the whole `process` call.
    pub serialize_per_profile: bool,
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        let defaults = Self::default();
        let streak_behavior_types = profiled_env_opt(p, "KINDLE_STREAK_TYPES")
            .map(|raw| parse_list(&raw))
            .filter(|types| !types.is_empty())
            .unwrap_or(defaults.streak_behavior_types);
        Self {
            streak_behavior_types,
            streak_interval: profiled_env_or(p, "KINDLE_STREAK_INTERVAL", &defaults.streak_interval),
            utc_offset_minutes: profiled_env_i32(p, "KINDLE_UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
            serialize_per_profile: profiled_env_bool(
                p,
                "KINDLE_SERIALIZE_PER_PROFILE",
                defaults.serialize_per_profile,
            ),
        }
    }

    pub fn is_streak_behavior(&self, behavior_type: &str) -> bool {
        self.streak_behavior_types.iter().any(|t| t == behavior_type)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streak_behavior_types: DEFAULT_STREAK_BEHAVIOR_TYPES.iter().map(|s| s.to_string()).collect(),
            streak_interval: "daily".to_string(),
            utc_offset_minutes: 0,
            serialize_per_profile: true,
        }
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub rules_dir: PathBuf,
    pub watch: bool,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "KINDLE_RULES_DIR", "data/rules")),
            watch: profiled_env_bool(p, "KINDLE_RULES_WATCH", false),
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from("data/rules"),
            watch: false,
        }
    }
}

// ── Audit log ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub max_entries_per_rule: usize,
}

impl AuditConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_entries_per_rule: profiled_env_usize(p, "KINDLE_AUDIT_MAX_ENTRIES", 500),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { max_entries_per_rule: 500 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_drops_blanks() {
        assert_eq!(parse_list("a, b,,c ,"), vec!["a", "b", "c"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn default_engine_config_matches_streak_types() {
        let cfg = EngineConfig::default();
        assert!(cfg.is_streak_behavior("app_open"));
        assert!(cfg.is_streak_behavior("daily_activity"));
        assert!(cfg.is_streak_behavior("session_complete"));
        assert!(!cfg.is_streak_behavior("wheel_rare_win"));
        assert_eq!(cfg.streak_interval, "daily");
    }

    #[test]
    fn profiled_keys_win_over_plain_keys() {
        // Unique prefix so parallel tests never observe these vars.
        env::set_var("KINDLECFGTEST_KINDLE_STREAK_TYPES", "app_open");
        env::set_var("KINDLECFGTEST_KINDLE_UTC_OFFSET_MINUTES", "120");
        env::set_var("KINDLECFGTEST_KINDLE_SERIALIZE_PER_PROFILE", "false");

        let cfg = Config::for_profile("kindlecfgtest");
        assert_eq!(cfg.profile_label(), "KINDLECFGTEST");
        assert_eq!(cfg.engine.streak_behavior_types, vec!["app_open"]);
        assert_eq!(cfg.engine.utc_offset_minutes, 120);
        assert!(!cfg.engine.serialize_per_profile);
    }
}

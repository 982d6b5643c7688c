//! kindle-replay: feed a JSON-lines behavior log through the rule engine.
//!
//! Loads the rule directory and achievement catalog into in-memory stores,
//! processes every behavior in file order, prints one `EngineResult` per line
//! and finally a profile summary.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use kindle_core::{Achievement, Behavior, Profile, ProfileId};
use kindle_rules::audit_log::AuditLog;
use kindle_rules::catalog::AchievementCatalog;
use kindle_rules::loader::LoadStatus;
use kindle_rules::store::{MemoryAchievementStore, MemoryEventStore, MemoryProfileStore, ProfileStore};
use kindle_rules::{AchievementFilter, RuleEngine, RuleLoader};

// ── CLI ─────────────────────────────────────────────────────────────

/// Replay a behavior log against a rule set and print the rewards.
#[derive(Parser, Debug)]
#[command(name = "kindle-replay", version, about)]
struct Cli {
    /// Rules directory (defaults to KINDLE_RULES_DIR from the environment config).
    #[arg(long)]
    rules_dir: Option<PathBuf>,

    /// Achievement catalog YAML.
    #[arg(long, env = "KINDLE_ACHIEVEMENTS", default_value = "data/achievements.yml")]
    achievements: PathBuf,

    /// JSON-lines file of behaviors; `-` reads stdin.
    #[arg(long)]
    events: PathBuf,

    #[arg(long, default_value_t = 1)]
    profile_id: ProfileId,

    #[arg(long, default_value = "learner")]
    profile_name: String,

    /// Reload rule files while replaying; useful with `--events -`.
    /// Also enabled by KINDLE_RULES_WATCH.
    #[arg(long)]
    watch: bool,
}

/// One input line. `profile_id` defaults to the CLI profile; attribute values
/// may be any JSON scalar and are kept as their text.
#[derive(Debug, Deserialize)]
struct EventLine {
    #[serde(rename = "type")]
    behavior_type: String,
    timestamp: i64,
    #[serde(default)]
    attributes: HashMap<String, serde_json::Value>,
    #[serde(default)]
    profile_id: Option<ProfileId>,
}

impl EventLine {
    fn into_behavior(self, default_profile: ProfileId) -> Behavior {
        let mut behavior = Behavior::new(
            self.behavior_type,
            self.timestamp,
            self.profile_id.unwrap_or(default_profile),
        );
        for (key, value) in self.attributes {
            let text = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            behavior = behavior.with_attribute(key, text);
        }
        behavior
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    profile: Profile,
    current_streak: u32,
    unlocked: Vec<Achievement>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    kindle_core::config::load_dotenv();
    let config = kindle_core::Config::from_env();
    config.log_summary();

    let cli = Cli::parse();
    let rules_dir = cli.rules_dir.unwrap_or_else(|| config.rules.rules_dir.clone());

    let mut loader = RuleLoader::new(rules_dir.clone());
    let results = loader
        .load_all()
        .with_context(|| format!("scanning rules directory {}", rules_dir.display()))?;
    for failed in results.iter().filter(|r| matches!(r.status, LoadStatus::Failed { .. })) {
        warn!(path = %failed.path.display(), status = ?failed.status, "rule file not loaded");
    }
    if cli.watch || config.rules.watch {
        loader
            .watch()
            .with_context(|| format!("watching rules directory {}", rules_dir.display()))?;
    }

    let catalog = AchievementCatalog::load(&cli.achievements)
        .with_context(|| format!("loading achievement catalog {}", cli.achievements.display()))?;

    let events = Arc::new(MemoryEventStore::new());
    let profiles = Arc::new(MemoryProfileStore::with_profiles(vec![Profile::new(
        cli.profile_id,
        cli.profile_name.clone(),
    )]));
    let engine = RuleEngine::new(
        events,
        Arc::new(loader),
        Arc::new(MemoryAchievementStore::with_achievements(catalog.seed(cli.profile_id))),
        profiles.clone(),
    )
    .with_config(config.engine.clone())
    .with_audit_log(Arc::new(AuditLog::with_max_entries(config.audit.max_entries_per_rule)));

    let reader: Box<dyn BufRead> = if cli.events.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&cli.events)
            .with_context(|| format!("opening events file {}", cli.events.display()))?;
        Box::new(BufReader::new(file))
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut processed = 0usize;
    let mut last_timestamp = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: EventLine = serde_json::from_str(&line)
            .with_context(|| format!("line {}: invalid behavior JSON", index + 1))?;
        let behavior = event.into_behavior(cli.profile_id);
        last_timestamp = Some(behavior.timestamp);

        let result = engine
            .process(&behavior)
            .await
            .with_context(|| format!("line {}: processing failed", index + 1))?;
        writeln!(out, "{}", serde_json::to_string(&result)?)?;
        processed += 1;
    }

    let profile = profiles
        .get_by_id(cli.profile_id)
        .await?
        .with_context(|| format!("profile {} vanished", cli.profile_id))?;
    let current_streak = match last_timestamp {
        Some(ts) => engine.get_current_streak_at(cli.profile_id, ts).await?,
        None => 0,
    };
    let unlocked = engine.achievements(cli.profile_id, AchievementFilter::Unlocked).await?;

    info!(processed, xp = profile.xp, unlocked = unlocked.len(), "replay finished");
    let summary = Summary {
        profile,
        current_streak,
        unlocked,
    };
    writeln!(out, "{}", serde_json::to_string(&summary)?)?;
    Ok(())
}

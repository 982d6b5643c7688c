//! End-to-end runs of the shipped rule set in `data/rules/` against the
//! catalog in `data/achievements.yml`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use kindle_core::{Behavior, Profile};
use kindle_rules::catalog::AchievementCatalog;
use kindle_rules::loader::LoadStatus;
use kindle_rules::store::{MemoryAchievementStore, MemoryEventStore, MemoryProfileStore, ProfileStore};
use kindle_rules::{RuleEngine, RuleLoader, RuleType};

const PROFILE: i64 = 1;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn noon() -> i64 {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap().timestamp_millis()
}

fn load_rules() -> RuleLoader {
    let loader = RuleLoader::new(data_dir().join("rules"));
    let results = loader.load_all().expect("scan data/rules");
    for r in &results {
        assert!(
            matches!(r.status, LoadStatus::Loaded { enabled: true, .. }),
            "{} did not load: {:?}",
            r.path.display(),
            r.status
        );
    }
    loader
}

struct Setup {
    engine: RuleEngine,
    profiles: Arc<MemoryProfileStore>,
}

fn setup() -> Setup {
    let catalog = AchievementCatalog::load(&data_dir().join("achievements.yml")).expect("catalog");
    let profiles = Arc::new(MemoryProfileStore::with_profiles(vec![Profile::new(PROFILE, "learner")]));
    let engine = RuleEngine::new(
        Arc::new(MemoryEventStore::new()),
        Arc::new(load_rules()),
        Arc::new(MemoryAchievementStore::with_achievements(catalog.seed(PROFILE))),
        profiles.clone(),
    );
    Setup { engine, profiles }
}

fn session(timestamp: i64, correct: u32, accuracy: u32, time: u32) -> Behavior {
    Behavior::new("session_complete", timestamp, PROFILE)
        .with_attribute("correct_count", correct)
        .with_attribute("accuracy", accuracy)
        .with_attribute("session_time", time)
}

fn new_ids(result: &kindle_rules::EngineResult) -> Vec<i64> {
    result.new_achievements.iter().map(|a| a.id).collect()
}

#[test]
fn shipped_rules_cover_all_sixteen_achievements() {
    let loader = load_rules();
    let rules = loader.active_rules();
    let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=16).collect::<Vec<_>>());
    assert!(rules.iter().all(|r| r.id == r.achievement_id));

    let count = |t: RuleType| rules.iter().filter(|r| r.rule_type == t).count();
    assert_eq!(count(RuleType::Simple), 4);
    assert_eq!(count(RuleType::Repetitive), 6);
    assert_eq!(count(RuleType::IntervalRepetitive), 6);

    let catalog = AchievementCatalog::load(&data_dir().join("achievements.yml")).unwrap();
    let catalog_ids: Vec<i64> = catalog.achievements.iter().map(|a| a.id).collect();
    assert_eq!(catalog_ids, ids);
}

#[tokio::test]
async fn first_session_pays_speed_and_word_count() {
    let s = setup();
    let result = s.engine.process(&session(noon(), 12, 86, 95)).await.unwrap();

    assert_eq!(new_ids(&result), vec![2, 3]);
    assert_eq!(result.xp_granted, 25 + 40);
    assert!(result.streak_updated);
    assert_eq!(result.new_streak_days, 1);
    assert_eq!(s.profiles.get_by_id(PROFILE).await.unwrap().unwrap().xp, 65);
}

#[tokio::test]
async fn rare_wheel_win() {
    let s = setup();
    let win = Behavior::new("wheel_rare_win", noon(), PROFILE).with_attribute("won", "true");
    let result = s.engine.process(&win).await.unwrap();
    assert_eq!(new_ids(&result), vec![16]);
    assert_eq!(result.xp_granted, 100);

    let lost = Behavior::new("wheel_rare_win", noon(), PROFILE).with_attribute("won", "false");
    let result = s.engine.process(&lost).await.unwrap();
    assert!(!result.has_rewards());
}

#[tokio::test]
async fn cumulative_correct_answers_unlock_beginner() {
    let s = setup();

    let first = s.engine.process(&session(noon(), 10, 50, 300)).await.unwrap();
    assert_eq!(new_ids(&first), vec![3]);

    for i in 1..4 {
        let r = s.engine.process(&session(noon() + i, 10, 50, 300)).await.unwrap();
        assert!(r.new_achievements.is_empty());
        assert_eq!(r.updated_achievements.len(), 1);
    }

    let fifth = s.engine.process(&session(noon() + 4, 10, 50, 300)).await.unwrap();
    assert_eq!(new_ids(&fifth), vec![4]);
    assert_eq!(fifth.updated_achievements[0].value, Some(4));
    assert_eq!(fifth.xp_granted, 40);
}

#[tokio::test]
async fn three_day_streak_unlocks_first_flame() {
    let s = setup();
    let mut last = None;
    for days_ago in (0..3).rev() {
        let activity = Behavior::new("daily_activity", noon() - days_ago * DAY_MS, PROFILE);
        last = Some(s.engine.process(&activity).await.unwrap());
    }
    let last = last.unwrap();
    assert_eq!(new_ids(&last), vec![10]);
    assert_eq!(last.xp_granted, 50);
    assert_eq!(last.new_streak_days, 3);
    assert_eq!(s.engine.get_current_streak_at(PROFILE, noon()).await.unwrap(), 3);
}

#[tokio::test]
async fn early_bird_needs_five_mornings_and_leaves_streak_alone() {
    let s = setup();
    for days_ago in (1..5).rev() {
        let morning = Behavior::new("morning_study", noon() - days_ago * DAY_MS, PROFILE);
        let r = s.engine.process(&morning).await.unwrap();
        assert!(!r.has_rewards());
        assert!(!r.streak_updated);
    }
    let fifth = s
        .engine
        .process(&Behavior::new("morning_study", noon(), PROFILE))
        .await
        .unwrap();
    assert_eq!(new_ids(&fifth), vec![15]);
    assert_eq!(fifth.xp_granted, 50);
    assert_eq!(s.profiles.get_by_id(PROFILE).await.unwrap().unwrap().streak_days, 0);
}

#[tokio::test]
async fn preview_matches_processing() {
    let s = setup();
    let behavior = session(noon(), 12, 100, 200);
    let preview = s.engine.evaluate_all_rules(PROFILE, &behavior).await.unwrap();
    let satisfied: Vec<i64> = preview.iter().filter(|(_, ok)| **ok).map(|(id, _)| *id).collect();
    assert_eq!(satisfied, vec![1, 3]);

    let result = s.engine.process(&behavior).await.unwrap();
    assert_eq!(new_ids(&result), satisfied);
}

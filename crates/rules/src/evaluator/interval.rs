//! INTERVAL_REPETITIVE rules: activity counted per calendar interval.
//!
//! Every relevant event is mapped to an [`IntervalKey`] (a day or an ISO week
//! in the evaluator's calendar). Events in the same interval collapse to one
//! key, so five app opens on one day advance a daily streak by one.
//!
//! Adjacency uses a coarse ordinal: `year * 366 + day_of_year` for days and
//! `year * 53 + iso_week` for weeks, and only a difference of exactly 1 counts
//! as consecutive. Across a year boundary that holds only after a 366-day year
//! or a 53-week ISO year. An unrecognized interval has no adjacency at all, so
//! consecutive runs over it are 0.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};
use kindle_core::Behavior;
use tracing::warn;

use crate::schema::Rule;

use super::{matches_behavior_type, relevant_events};

/// Grouping granularity named by a rule's `interval` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Daily,
    Weekly,
    /// Any other string: no grouping, every timestamp is its own key.
    Ungrouped,
}

impl Interval {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "daily" => Interval::Daily,
            "weekly" => Interval::Weekly,
            _ => Interval::Ungrouped,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Daily => write!(f, "daily"),
            Interval::Weekly => write!(f, "weekly"),
            Interval::Ungrouped => write!(f, "ungrouped"),
        }
    }
}

/// The calendar interval a timestamp falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntervalKey {
    Day { year: i32, ordinal: u32 },
    Week { year: i32, week: u32 },
    /// Raw millisecond timestamp, used when the interval is not recognized.
    Instant(i64),
}

impl IntervalKey {
    /// Coarse numeric encoding used for ordering and adjacency.
    pub fn ordinal_value(&self) -> i64 {
        match *self {
            IntervalKey::Day { year, ordinal } => i64::from(year) * 366 + i64::from(ordinal),
            IntervalKey::Week { year, week } => i64::from(year) * 53 + i64::from(week),
            IntervalKey::Instant(ts) => ts,
        }
    }
}

/// Evaluator for interval rules and the streak query built on the same logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalRepetitiveRuleEvaluator {
    offset: FixedOffset,
}

impl Default for IntervalRepetitiveRuleEvaluator {
    fn default() -> Self {
        Self { offset: Utc.fix() }
    }
}

impl IntervalRepetitiveRuleEvaluator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Calendar shifted by `minutes` east of UTC. Out-of-range offsets fall back to UTC.
    pub fn with_utc_offset_minutes(minutes: i32) -> Self {
        match minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            Some(offset) => Self { offset },
            None => {
                warn!(minutes, "invalid UTC offset, using UTC");
                Self::default()
            }
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Map a millisecond timestamp to its interval key.
    pub fn interval_key(&self, timestamp: i64, interval: Interval) -> IntervalKey {
        let local = match DateTime::<Utc>::from_timestamp_millis(timestamp) {
            Some(dt) => dt.with_timezone(&self.offset),
            None => return IntervalKey::Instant(timestamp),
        };
        match interval {
            Interval::Daily => IntervalKey::Day {
                year: local.year(),
                ordinal: local.ordinal(),
            },
            Interval::Weekly => {
                let iso = local.iso_week();
                IntervalKey::Week {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
            Interval::Ungrouped => IntervalKey::Instant(timestamp),
        }
    }

    /// Whether `current` plus `history` satisfies an interval rule.
    ///
    /// With `consecutive`, the run of adjacent intervals ending at the current
    /// event's interval must reach `repeat_count`; without it, the number of
    /// distinct intervals must.
    pub fn evaluate(&self, rule: &Rule, current: &Behavior, history: &[Behavior]) -> bool {
        let conditions = &rule.conditions;
        if !matches_behavior_type(conditions, current) {
            return false;
        }
        let (Some(raw_interval), Some(required)) =
            (conditions.interval.as_deref(), conditions.repeat_count)
        else {
            return false;
        };
        let interval = Interval::parse(raw_interval);

        let keys = self.distinct_ordinals(
            relevant_events(&conditions.behavior_type, current, history)
                .into_iter()
                .map(|b| b.timestamp),
            interval,
        );
        if keys.is_empty() {
            return false;
        }

        let achieved = if conditions.consecutive {
            self.run_length(&keys, current.timestamp, interval)
        } else {
            keys.len() as u32
        };
        achieved >= required
    }

    /// Length of the run of consecutive intervals ending at `reference_ms`,
    /// counting events of `behavior_type` only.
    ///
    /// Returns 0 when no event of that type exists or the interval is not
    /// recognized. Otherwise the reference interval itself always counts, so
    /// the result is at least 1.
    pub fn current_streak(
        &self,
        behaviors: &[Behavior],
        behavior_type: &str,
        interval: &str,
        reference_ms: i64,
    ) -> u32 {
        self.current_streak_matching(
            behaviors,
            |b| b.behavior_type == behavior_type,
            interval,
            reference_ms,
        )
    }

    /// [`current_streak`](Self::current_streak) with an arbitrary event filter.
    pub fn current_streak_matching<F>(
        &self,
        behaviors: &[Behavior],
        qualifies: F,
        interval: &str,
        reference_ms: i64,
    ) -> u32
    where
        F: Fn(&Behavior) -> bool,
    {
        let interval = Interval::parse(interval);
        let keys = self.distinct_ordinals(
            behaviors.iter().filter(|b| qualifies(b)).map(|b| b.timestamp),
            interval,
        );
        if keys.is_empty() {
            return 0;
        }
        self.run_length(&keys, reference_ms, interval)
    }

    fn run_length(&self, ordinals: &BTreeSet<i64>, reference_ms: i64, interval: Interval) -> u32 {
        if interval == Interval::Ungrouped {
            return 0;
        }
        let target = self.interval_key(reference_ms, interval).ordinal_value();
        run_length_ending_at(ordinals, target)
    }

    fn distinct_ordinals<I>(&self, timestamps: I, interval: Interval) -> BTreeSet<i64>
    where
        I: IntoIterator<Item = i64>,
    {
        timestamps
            .into_iter()
            .map(|ts| self.interval_key(ts, interval).ordinal_value())
            .collect()
    }
}

/// Count adjacent ordinals walking backward from `target`.
///
/// `target` is counted even when absent from `ordinals`; the walk stops at the
/// first gap.
fn run_length_ending_at(ordinals: &BTreeSet<i64>, target: i64) -> u32 {
    let mut run = 1;
    let mut expected = target - 1;
    for &value in ordinals.range(..target).rev() {
        if value != expected {
            break;
        }
        run += 1;
        expected -= 1;
    }
    run
}

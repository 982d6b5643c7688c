//! Rule evaluators, one per rule family.
//!
//! - [`SimpleRuleEvaluator`]: threshold check on the current event.
//! - [`RepetitiveRuleEvaluator`]: sum / count / average over history + current event.
//! - [`IntervalRepetitiveRuleEvaluator`]: calendar-interval grouping and streak runs.
//!
//! All three share the same type gate: an event whose type differs from the
//! rule's `behavior_type` never satisfies the rule. Malformed conditions make
//! a rule unsatisfiable rather than an error.

mod interval;
mod repetitive;
mod simple;

use std::collections::HashSet;

use kindle_core::Behavior;

use crate::schema::{Rule, RuleConditions, RuleType};

pub use interval::{Interval, IntervalKey, IntervalRepetitiveRuleEvaluator};
pub use repetitive::{Aggregation, RepetitiveRuleEvaluator};
pub use simple::SimpleRuleEvaluator;

// ── Dispatcher ──────────────────────────────────────────────────────

/// Routes a rule to the evaluator matching its [`RuleType`].
///
/// Holds the interval evaluator because that one carries the calendar
/// (UTC offset) used to cut timestamps into days and weeks.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    interval: IntervalRepetitiveRuleEvaluator,
}

impl RuleEvaluator {
    pub fn new(interval: IntervalRepetitiveRuleEvaluator) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> &IntervalRepetitiveRuleEvaluator {
        &self.interval
    }

    /// Evaluate one rule. `history` is ignored by SIMPLE rules.
    pub fn evaluate(&self, rule: &Rule, behavior: &Behavior, history: &[Behavior]) -> bool {
        match rule.rule_type {
            RuleType::Simple => SimpleRuleEvaluator::evaluate(rule, behavior),
            RuleType::Repetitive => RepetitiveRuleEvaluator::evaluate(rule, behavior, history),
            RuleType::IntervalRepetitive => self.interval.evaluate(rule, behavior, history),
        }
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// The hard type gate every evaluator applies first.
pub(crate) fn matches_behavior_type(conditions: &RuleConditions, behavior: &Behavior) -> bool {
    behavior.behavior_type == conditions.behavior_type
}

/// History events of `behavior_type` followed by `current`, deduplicated by id.
///
/// The first record seen for an id wins, so a history slice that already
/// contains the persisted current event does not count it twice.
pub(crate) fn relevant_events<'a>(
    behavior_type: &str,
    current: &'a Behavior,
    history: &'a [Behavior],
) -> Vec<&'a Behavior> {
    let mut seen = HashSet::new();
    history
        .iter()
        .filter(|b| b.behavior_type == behavior_type)
        .chain(std::iter::once(current))
        .filter(|b| seen.insert(b.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RuleConditions;

    fn event(id: i64, behavior_type: &str) -> Behavior {
        Behavior::new(behavior_type, 1_700_000_000_000, 1).with_id(id)
    }

    #[test]
    fn relevant_events_filters_type_and_dedups_by_id() {
        let current = event(3, "session_complete");
        let history = vec![
            event(1, "session_complete"),
            event(2, "app_open"),
            event(3, "session_complete"),
        ];

        let relevant = relevant_events("session_complete", &current, &history);
        let ids: Vec<i64> = relevant.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn dispatch_routes_by_rule_type() {
        let evaluator = RuleEvaluator::default();
        let behavior = event(1, "session_complete").with_attribute("correct_count", 12);

        let simple = Rule::new(
            1,
            RuleType::Simple,
            RuleConditions::threshold("session_complete", "correct_count", ">=", "10"),
            1,
        );
        assert!(evaluator.evaluate(&simple, &behavior, &[]));

        let repetitive = Rule::new(
            2,
            RuleType::Repetitive,
            RuleConditions::threshold("session_complete", "correct_count", "sum_>=", "20"),
            2,
        );
        let history = vec![event(7, "session_complete").with_attribute("correct_count", 8)];
        assert!(evaluator.evaluate(&repetitive, &behavior, &history));
        assert!(!evaluator.evaluate(&repetitive, &behavior, &[]));

        let interval = Rule::new(
            3,
            RuleType::IntervalRepetitive,
            RuleConditions::every("session_complete", "daily", 1, true),
            3,
        );
        assert!(evaluator.evaluate(&interval, &behavior, &[]));
    }
}

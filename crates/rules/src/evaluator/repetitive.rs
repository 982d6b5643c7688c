//! REPETITIVE rules: aggregate an attribute across the event history.

use kindle_core::Behavior;

use crate::compare::{parse_number, CompareOp};
use crate::schema::Rule;

use super::{matches_behavior_type, relevant_events};

/// Aggregation selected by the operator prefix (`sum_`, `count_`, `avg_`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Count,
    Avg,
}

impl Aggregation {
    /// Split `sum_>=` into `(Sum, Gte)`. Unknown prefix or comparison yields `None`.
    pub fn split_operator(operator: &str) -> Option<(Aggregation, CompareOp)> {
        let (aggregation, rest) = if let Some(rest) = operator.strip_prefix("sum_") {
            (Aggregation::Sum, rest)
        } else if let Some(rest) = operator.strip_prefix("count_") {
            (Aggregation::Count, rest)
        } else if let Some(rest) = operator.strip_prefix("avg_") {
            (Aggregation::Avg, rest)
        } else {
            return None;
        };
        CompareOp::parse(rest).map(|op| (aggregation, op))
    }
}

/// Cumulative evaluator over `history ∪ {current}`.
///
/// The relevant set is the history filtered to the rule's behavior type plus
/// the current event, deduplicated by event id. Sum, count and average do not
/// depend on ordering, so neither does the result.
pub struct RepetitiveRuleEvaluator;

impl RepetitiveRuleEvaluator {
    pub fn evaluate(rule: &Rule, current: &Behavior, history: &[Behavior]) -> bool {
        let conditions = &rule.conditions;
        if !matches_behavior_type(conditions, current) {
            return false;
        }

        let Some((aggregation, op)) = conditions.operator.as_deref().and_then(Aggregation::split_operator)
        else {
            return false;
        };
        let Some(threshold) = conditions.value.as_deref().and_then(parse_number) else {
            return false;
        };

        let events = relevant_events(&conditions.behavior_type, current, history);

        let aggregate = match aggregation {
            Aggregation::Count => events.len() as f64,
            Aggregation::Sum => {
                let Some(attribute) = conditions.attribute.as_deref() else {
                    return false;
                };
                // Unparseable values count as zero.
                events
                    .iter()
                    .map(|b| b.attribute(attribute).and_then(parse_number).unwrap_or(0.0))
                    .sum()
            }
            Aggregation::Avg => {
                let Some(attribute) = conditions.attribute.as_deref() else {
                    return false;
                };
                let values: Vec<f64> = events
                    .iter()
                    .filter_map(|b| b.attribute(attribute).and_then(parse_number))
                    .collect();
                if values.is_empty() {
                    return false;
                }
                values.iter().sum::<f64>() / values.len() as f64
            }
        };

        op.apply(aggregate, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RuleConditions, RuleType};

    fn rule(attribute: &str, operator: &str, value: &str) -> Rule {
        Rule::new(
            4,
            RuleType::Repetitive,
            RuleConditions::threshold("session_complete", attribute, operator, value),
            4,
        )
    }

    fn count_rule(operator: &str, value: &str) -> Rule {
        let mut r = rule("unused", operator, value);
        r.conditions.attribute = None;
        r
    }

    fn session(id: i64, correct: &str) -> Behavior {
        Behavior::new("session_complete", 1_700_000_000_000 + id, 1)
            .with_id(id)
            .with_attribute("correct_count", correct)
    }

    #[test]
    fn sum_reaches_threshold_with_history() {
        let r = rule("correct_count", "sum_>=", "50");
        let history = vec![session(1, "20"), session(2, "15")];
        assert!(RepetitiveRuleEvaluator::evaluate(&r, &session(3, "15"), &history));
    }

    #[test]
    fn sum_below_threshold_fails() {
        let r = rule("correct_count", "sum_>=", "50");
        let history = vec![session(1, "10"), session(2, "10")];
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &session(3, "10"), &history));
    }

    #[test]
    fn count_of_sessions() {
        let r = count_rule("count_>=", "10");
        let history: Vec<Behavior> = (1..=9).map(|i| session(i, "1")).collect();
        assert!(RepetitiveRuleEvaluator::evaluate(&r, &session(10, "1"), &history));
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &session(10, "1"), &history[..8]));
    }

    #[test]
    fn sum_is_invariant_under_reordering() {
        let r = rule("correct_count", "sum_>=", "30");
        let history = vec![session(1, "10"), session(2, "5"), session(3, "7")];
        let mut reversed = history.clone();
        reversed.reverse();
        let current = session(4, "8");

        assert!(RepetitiveRuleEvaluator::evaluate(&r, &current, &history));
        assert_eq!(
            RepetitiveRuleEvaluator::evaluate(&r, &current, &history),
            RepetitiveRuleEvaluator::evaluate(&r, &current, &reversed)
        );
    }

    #[test]
    fn current_event_inside_history_is_not_double_counted() {
        let r = rule("correct_count", "sum_>=", "40");
        let current = session(3, "20");
        let separate = vec![session(1, "10")];
        let included = vec![session(1, "10"), current.clone()];

        // 10 + 20 = 30 in both cases
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &current, &separate));
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &current, &included));

        let exact = rule("correct_count", "sum_==", "30");
        assert!(RepetitiveRuleEvaluator::evaluate(&exact, &current, &separate));
        assert!(RepetitiveRuleEvaluator::evaluate(&exact, &current, &included));
    }

    #[test]
    fn other_behavior_types_in_history_are_ignored() {
        let r = count_rule("count_==", "2");
        let history = vec![
            session(1, "1"),
            Behavior::new("app_open", 0, 1).with_id(2),
        ];
        assert!(RepetitiveRuleEvaluator::evaluate(&r, &session(3, "1"), &history));
    }

    #[test]
    fn unparseable_values_count_as_zero_in_sum() {
        let r = rule("correct_count", "sum_==", "15");
        let history = vec![session(1, "abc"), session(2, "5")];
        assert!(RepetitiveRuleEvaluator::evaluate(&r, &session(3, "10"), &history));
    }

    #[test]
    fn average_of_parseable_values() {
        let r = rule("correct_count", "avg_>=", "8");
        let history = vec![session(1, "6"), session(2, "n/a")];
        // (6 + 10) / 2 = 8
        assert!(RepetitiveRuleEvaluator::evaluate(&r, &session(3, "10"), &history));
        let strict = rule("correct_count", "avg_>", "8");
        assert!(!RepetitiveRuleEvaluator::evaluate(&strict, &session(3, "10"), &history));
    }

    #[test]
    fn average_without_parseable_values_is_false() {
        let r = rule("correct_count", "avg_<=", "1000");
        let history = vec![session(1, "x")];
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &session(2, "y"), &history));
    }

    #[test]
    fn unknown_prefix_or_comparison_is_false() {
        let history = vec![session(1, "100")];
        for op in ["max_>=", ">=", "sum_=>", "sum_", "count"] {
            let r = rule("correct_count", op, "1");
            assert!(
                !RepetitiveRuleEvaluator::evaluate(&r, &session(2, "100"), &history),
                "operator {op} should not match"
            );
        }
    }

    #[test]
    fn non_numeric_threshold_is_false() {
        let r = rule("correct_count", "sum_>=", "lots");
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &session(1, "100"), &[]));
    }

    #[test]
    fn wrong_behavior_type_is_false() {
        let r = count_rule("count_>=", "0");
        let b = Behavior::new("app_open", 0, 1).with_id(1);
        assert!(!RepetitiveRuleEvaluator::evaluate(&r, &b, &[]));
    }

    #[test]
    fn split_operator_parses_prefix_and_comparison() {
        assert_eq!(
            Aggregation::split_operator("sum_>="),
            Some((Aggregation::Sum, CompareOp::Gte))
        );
        assert_eq!(
            Aggregation::split_operator("count_=="),
            Some((Aggregation::Count, CompareOp::Eq))
        );
        assert_eq!(
            Aggregation::split_operator("avg_<"),
            Some((Aggregation::Avg, CompareOp::Lt))
        );
        assert_eq!(Aggregation::split_operator("median_<"), None);
    }
}

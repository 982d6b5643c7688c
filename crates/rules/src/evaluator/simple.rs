//! SIMPLE rules: one threshold check against the current event.

use kindle_core::Behavior;

use crate::compare::compare;
use crate::schema::Rule;

use super::matches_behavior_type;

/// Stateless single-event evaluator.
///
/// Satisfied when the event has the rule's type, carries the rule's attribute,
/// and `attribute <operator> value` holds. An absent attribute never satisfies
/// the rule, not even with `!=`.
pub struct SimpleRuleEvaluator;

impl SimpleRuleEvaluator {
    pub fn evaluate(rule: &Rule, behavior: &Behavior) -> bool {
        let conditions = &rule.conditions;
        if !matches_behavior_type(conditions, behavior) {
            return false;
        }

        let (Some(attribute), Some(operator), Some(expected)) = (
            conditions.attribute.as_deref(),
            conditions.operator.as_deref(),
            conditions.value.as_deref(),
        ) else {
            return false;
        };

        match behavior.attribute(attribute) {
            Some(actual) => compare(actual, expected, operator),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RuleConditions, RuleType};

    fn rule(attribute: &str, operator: &str, value: &str) -> Rule {
        Rule::new(
            1,
            RuleType::Simple,
            RuleConditions::threshold("session_complete", attribute, operator, value),
            1,
        )
    }

    fn session(attrs: &[(&str, &str)]) -> Behavior {
        attrs.iter().fold(
            Behavior::new("session_complete", 1_700_000_000_000, 1),
            |b, (k, v)| b.with_attribute(*k, v),
        )
    }

    #[test]
    fn correct_count_at_threshold_passes() {
        let r = rule("correct_count", ">=", "10");
        assert!(SimpleRuleEvaluator::evaluate(&r, &session(&[("correct_count", "12")])));
        assert!(SimpleRuleEvaluator::evaluate(&r, &session(&[("correct_count", "10")])));
    }

    #[test]
    fn correct_count_below_threshold_fails() {
        let r = rule("correct_count", ">=", "10");
        assert!(!SimpleRuleEvaluator::evaluate(&r, &session(&[("correct_count", "5")])));
    }

    #[test]
    fn wrong_behavior_type_fails_regardless_of_attributes() {
        let r = rule("correct_count", ">=", "10");
        let b = Behavior::new("app_open", 0, 1).with_attribute("correct_count", 50);
        assert!(!SimpleRuleEvaluator::evaluate(&r, &b));
    }

    #[test]
    fn perfect_accuracy_and_fast_session() {
        assert!(SimpleRuleEvaluator::evaluate(
            &rule("accuracy", "==", "100"),
            &session(&[("accuracy", "100")])
        ));
        assert!(!SimpleRuleEvaluator::evaluate(
            &rule("accuracy", "==", "100"),
            &session(&[("accuracy", "86")])
        ));
        assert!(SimpleRuleEvaluator::evaluate(
            &rule("session_time", "<=", "120"),
            &session(&[("session_time", "95")])
        ));
    }

    #[test]
    fn missing_attribute_never_satisfies_even_not_equal() {
        let r = rule("accuracy", "!=", "100");
        assert!(!SimpleRuleEvaluator::evaluate(&r, &session(&[("correct_count", "3")])));
    }

    #[test]
    fn boolean_attribute_matches_via_string_equality() {
        let r = Rule::new(
            16,
            RuleType::Simple,
            RuleConditions::threshold("wheel_rare_win", "won", "==", "true"),
            16,
        );
        let b = Behavior::new("wheel_rare_win", 0, 1).with_attribute("won", "true");
        assert!(SimpleRuleEvaluator::evaluate(&r, &b));

        let lost = Behavior::new("wheel_rare_win", 0, 1).with_attribute("won", "false");
        assert!(!SimpleRuleEvaluator::evaluate(&r, &lost));
    }

    #[test]
    fn incomplete_conditions_never_match() {
        let mut r = rule("correct_count", ">=", "10");
        r.conditions.operator = None;
        assert!(!SimpleRuleEvaluator::evaluate(&r, &session(&[("correct_count", "12")])));
    }

    #[test]
    fn evaluation_is_pure() {
        let r = rule("correct_count", ">=", "10");
        let b = session(&[("correct_count", "11")]);
        let first = SimpleRuleEvaluator::evaluate(&r, &b);
        for _ in 0..5 {
            assert_eq!(SimpleRuleEvaluator::evaluate(&r, &b), first);
        }
    }
}

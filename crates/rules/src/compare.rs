//! Value comparison shared by every evaluator.
//!
//! Operands arrive as strings. When both parse as numbers the comparison is
//! numeric; otherwise only `==` and `!=` are defined, as plain string
//! (in)equality. That fallback is what lets a boolean attribute such as
//! `won: "true"` match a rule value of `"true"`.

use std::fmt;

/// Comparison operator of a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
    Ne,
}

impl CompareOp {
    /// Parse an operator symbol. Unknown symbols yield `None`.
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol {
            ">=" => Some(CompareOp::Gte),
            "<=" => Some(CompareOp::Lte),
            ">" => Some(CompareOp::Gt),
            "<" => Some(CompareOp::Lt),
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
        }
    }

    /// Numeric comparison `lhs <op> rhs`.
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Gte => lhs >= rhs,
            CompareOp::Lte => lhs <= rhs,
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
        }
    }

    /// String comparison, only defined for equality operators.
    fn apply_text(&self, lhs: &str, rhs: &str) -> bool {
        match self {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            _ => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parse an attribute or threshold string as a finite number.
///
/// `nan`, `inf` and friends stay text.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Compare `actual <operator> expected`.
///
/// Numeric when both sides parse, string (in)equality otherwise. An unknown
/// operator never matches.
pub fn compare(actual: &str, expected: &str, operator: &str) -> bool {
    let Some(op) = CompareOp::parse(operator) else {
        return false;
    };

    match (parse_number(actual), parse_number(expected)) {
        (Some(a), Some(b)) => op.apply(a, b),
        _ => op.apply_text(actual, expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_operators() {
        assert!(compare("12", "10", ">="));
        assert!(compare("10", "10", ">="));
        assert!(!compare("9", "10", ">="));
        assert!(compare("95", "120", "<="));
        assert!(compare("11", "10", ">"));
        assert!(!compare("10", "10", ">"));
        assert!(compare("9.5", "10", "<"));
        assert!(compare("100", "100.0", "=="));
        assert!(compare("86", "100", "!="));
    }

    #[test]
    fn numbers_compare_by_value_not_text() {
        // "9" > "10" as text, but not as numbers
        assert!(!compare("9", "10", ">"));
        assert!(compare("1e2", "100", "=="));
    }

    #[test]
    fn string_fallback_supports_only_equality() {
        assert!(compare("true", "true", "=="));
        assert!(!compare("true", "false", "=="));
        assert!(compare("true", "false", "!="));
        assert!(!compare("abc", "abd", "<"));
        assert!(!compare("b", "a", ">="));
    }

    #[test]
    fn mixed_numeric_and_text_falls_back_to_string() {
        assert!(!compare("10", "ten", "=="));
        assert!(compare("10", "ten", "!="));
        assert!(!compare("10", "ten", ">="));
    }

    #[test]
    fn non_finite_spellings_compare_as_text() {
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("-Infinity"), None);
        assert_eq!(parse_number("inf"), None);
        assert!(compare("nan", "nan", "=="));
        assert!(!compare("inf", "1", ">"));
        assert!(compare("NaN", "nan", "!="));
    }

    #[test]
    fn unknown_operator_never_matches() {
        assert!(!compare("10", "10", "=>"));
        assert!(!compare("a", "a", "equals"));
        assert!(!compare("10", "10", ""));
    }

    #[test]
    fn operator_symbols_roundtrip() {
        for op in [
            CompareOp::Gte,
            CompareOp::Lte,
            CompareOp::Gt,
            CompareOp::Lt,
            CompareOp::Eq,
            CompareOp::Ne,
        ] {
            assert_eq!(CompareOp::parse(op.symbol()), Some(op));
        }
    }
}

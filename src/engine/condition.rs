use regex::Regex;

use crate::types::{Condition, EvaluationContext, FlagValue, Operator};

/// Evaluates a single targeting condition against a context.
///
/// Every operator is total: type mismatches, invalid patterns and unknown
/// operators evaluate to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Create a condition evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Whether `condition` holds for `context`. Never panics, whatever the operands.
    pub fn evaluate(&self, condition: &Condition, context: &EvaluationContext) -> bool {
        let Some(actual) = context.resolve(&condition.attribute) else {
            return false;
        };
        let expected = &condition.value;

        match condition.operator {
            Operator::Equals => actual == *expected,
            Operator::NotEquals => actual != *expected,
            Operator::Contains => strings(&actual, expected).is_some_and(|(a, e)| a.contains(e)),
            Operator::NotContains => {
                strings(&actual, expected).is_some_and(|(a, e)| !a.contains(e))
            }
            Operator::StartsWith => {
                strings(&actual, expected).is_some_and(|(a, e)| a.starts_with(e))
            }
            Operator::EndsWith => strings(&actual, expected).is_some_and(|(a, e)| a.ends_with(e)),
            Operator::In => expected
                .as_array()
                .is_some_and(|items| items.iter().any(|item| actual.eq_json(item))),
            Operator::NotIn => expected
                .as_array()
                .is_some_and(|items| !items.iter().any(|item| actual.eq_json(item))),
            Operator::GreaterThan => numbers(&actual, expected).is_some_and(|(a, e)| a > e),
            Operator::LessThan => numbers(&actual, expected).is_some_and(|(a, e)| a < e),
            Operator::GreaterThanOrEqual => {
                numbers(&actual, expected).is_some_and(|(a, e)| a >= e)
            }
            Operator::LessThanOrEqual => numbers(&actual, expected).is_some_and(|(a, e)| a <= e),
            Operator::Matches => pattern_match(&actual, expected).unwrap_or(false),
            Operator::NotMatches => pattern_match(&actual, expected).is_some_and(|m| !m),
            Operator::Unknown => false,
        }
    }
}

fn strings<'a>(actual: &'a FlagValue, expected: &'a FlagValue) -> Option<(&'a str, &'a str)> {
    Some((actual.as_string()?, expected.as_string()?))
}

fn numbers(actual: &FlagValue, expected: &FlagValue) -> Option<(f64, f64)> {
    Some((actual.as_number()?, expected.as_number()?))
}

/// `None` when either operand is not a string or the pattern does not compile.
fn pattern_match(actual: &FlagValue, expected: &FlagValue) -> Option<bool> {
    let (subject, pattern) = strings(actual, expected)?;
    match Regex::new(pattern) {
        Ok(re) => Some(re.is_match(subject)),
        Err(err) => {
            tracing::debug!(pattern, error = %err, "Invalid regex in targeting condition");
            None
        }
    }
}

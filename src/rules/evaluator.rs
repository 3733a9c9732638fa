//! The compiled boolean/field evaluator tree (C6).
//!
//! Grounded on original `rules/evaluators.go`'s `Evaluator` interface and
//! its `And`/`Or`/`Equals`/`NotEquals`/`Contains`/`Regex` implementations —
//! expressed here as a closed enum rather than a trait-object interface,
//! since the set of node kinds is fixed and known at compile time.

use regex::Regex;

use crate::connection::pair::Pair;
use crate::error::RuleBuildError;

use super::getters::{self, FieldGetter};
use super::Rule;

pub enum Evaluator {
    And(Vec<Evaluator>),
    Or(Vec<Evaluator>),
    Equals(FieldGetter, String),
    NotEquals(FieldGetter, String),
    /// Has a working [`Evaluator::evaluate`] arm but no operator string in
    /// [`Evaluator::build`] dispatches to it — `contains` is reserved, not
    /// wired into rule configuration (matches the original `rules.go`).
    Contains(FieldGetter, String),
    Regex(FieldGetter, Regex),
}

impl Evaluator {
    /// Compiles a [`Rule`] into its evaluator tree. Build is pure: two
    /// threads racing to build the same rule produce equal trees, so
    /// `Rule::evaluator`'s `OnceLock` memoisation is safe under
    /// concurrent first use (§9 design note).
    pub fn build(rule: &Rule) -> Result<Evaluator, RuleBuildError> {
        match rule.operator.as_str() {
            "&&" | "and" => Ok(Evaluator::And(build_children(&rule.rules)?)),
            "||" | "or" => Ok(Evaluator::Or(build_children(&rule.rules)?)),
            "==" => Ok(Evaluator::Equals(
                getters::build_getter(&rule.field)?,
                rule.value.clone(),
            )),
            "!=" => Ok(Evaluator::NotEquals(
                getters::build_getter(&rule.field)?,
                rule.value.clone(),
            )),
            "~=" => {
                let re = Regex::new(&rule.value).map_err(|source| RuleBuildError::InvalidRegex {
                    value: rule.value.clone(),
                    message: source.to_string(),
                })?;
                Ok(Evaluator::Regex(getters::build_getter(&rule.field)?, re))
            }
            other => Err(RuleBuildError::InvalidOperator(other.to_string())),
        }
    }

    /// Evaluates this node against `pair`. Compound nodes evaluate
    /// children left to right and stop at the short-circuit point (§4.6);
    /// a leaf whose getter comes back empty evaluates to `false` rather
    /// than propagating an error (§7).
    pub fn evaluate(&self, pair: &Pair) -> bool {
        match self {
            Evaluator::And(children) => children.iter().all(|child| child.evaluate(pair)),
            Evaluator::Or(children) => children.iter().any(|child| child.evaluate(pair)),
            Evaluator::Equals(getter, value) => {
                getter.get(pair).is_some_and(|actual| &actual == value)
            }
            Evaluator::NotEquals(getter, value) => {
                getter.get(pair).is_some_and(|actual| &actual != value)
            }
            Evaluator::Contains(getter, value) => getter
                .get(pair)
                .is_some_and(|actual| actual.contains(value.as_str())),
            Evaluator::Regex(getter, re) => {
                getter.get(pair).is_some_and(|actual| re.is_match(&actual))
            }
        }
    }
}

fn build_children(rules: &[Rule]) -> Result<Vec<Evaluator>, RuleBuildError> {
    rules.iter().map(Evaluator::build).collect()
}

//! Rule configuration model and the memoised evaluator cache (C6 surface,
//! §3/§4.6).
//!
//! Grounded on original `rules/rules.go`'s `Rule` struct (`Name, Operator,
//! Rules, Field, Value` JSON tags) and its lazily-built, cached evaluator
//! field — reworked here as a `Result`-returning `OnceLock` instead of a
//! bare nilable field populated by a function that panics on a build
//! error; idiomatic Rust propagates `Result` at this boundary instead.

pub mod engine;
pub mod evaluator;
pub mod getters;

use std::sync::OnceLock;

use serde::Deserialize;

use crate::connection::pair::Pair;
use crate::error::RuleBuildError;
use evaluator::Evaluator;

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct Rule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: String,
    #[serde(skip)]
    evaluator: OnceLock<Result<Evaluator, RuleBuildError>>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("operator", &self.operator)
            .field("field", &self.field)
            .field("value", &self.value)
            .field("rules", &self.rules)
            .finish()
    }
}

impl Rule {
    /// Builds (once) and returns this rule's compiled evaluator tree.
    /// Concurrent first-use races are safe: build is pure, so two tasks
    /// racing to build produce equal results and `OnceLock` keeps
    /// whichever wins the race (§9 design note).
    pub fn evaluator(&self) -> Result<&Evaluator, RuleBuildError> {
        self.evaluator
            .get_or_init(|| Evaluator::build(self))
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn matches(&self, pair: &Pair) -> Result<bool, RuleBuildError> {
        Ok(self.evaluator()?.evaluate(pair))
    }
}

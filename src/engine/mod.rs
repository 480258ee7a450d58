//! The flag evaluation engine.
//!
//! Everything here is pure: evaluators read their arguments and nothing else,
//! so a single instance can serve any number of concurrent evaluations.

mod bucket;
mod condition;
mod evaluator;
mod loader;
mod rule;
pub mod variation;

pub use bucket::RolloutBucketer;
pub use condition::ConditionEvaluator;
pub use evaluator::FlagEvaluator;
pub use loader::ConfigLoader;
pub use rule::RuleEvaluator;

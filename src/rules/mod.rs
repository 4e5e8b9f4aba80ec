pub mod evaluator;
pub mod snapshot;
pub mod store;
pub mod types;

pub use evaluator::evaluate;
pub use snapshot::RuleSnapshot;
pub use store::RuleStore;
pub use types::{NewRule, Rule, RuleEvaluationResult};

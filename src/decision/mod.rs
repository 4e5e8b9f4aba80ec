pub mod engine;
pub mod types;

pub use engine::HybridDecisionEngine;
pub use types::{DecisionBranch, RiskAssessment, RiskLevel};

//! Drift Planner Library
//!
//! Root-cause mining over a labeled event log and the counterfactual tuning
//! planner built on top of it.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use config::Config;
pub use models::{
    AttributeValue, Explanation, ExplanationHierarchy, ExplanationState, FrequentItemSet,
    PlanKey, TuningPlan,
};
pub use services::{
    DuplicatePolicy, FrequentItemSetMiner, MemoryRowStore, MiningParams, MySqlRowStore,
    PlannerConfig, Predicate, RowAggregateQuery, TuningPlanner, UndefinedRiskPolicy,
};
pub use utils::{ErrorKind, PlannerError, PlannerResult};

pub mod explanation_dedup;
pub mod hierarchy_builder;
pub mod itemset_miner;
pub mod row_store;
pub mod tuning_planner;

pub use explanation_dedup::{DuplicatePolicy, deduplicate, explanations_for, to_ranked_explanations};
pub use hierarchy_builder::build_hierarchy;
pub use itemset_miner::{FrequentItemSetMiner, MiningParams, UndefinedRiskPolicy};
pub use row_store::{
    CompareOp, GroupCount, MemoryRowStore, MySqlRowStore, Predicate, RowAggregateQuery,
};
pub use tuning_planner::{PlannerConfig, PlanningTrace, RootOutcome, TuningPlanner};

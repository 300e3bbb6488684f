// Row Store Module
// Purpose: Aggregate queries and neutralization mutations over the labeled event log
// Design: The mining and planning services only talk to the `RowAggregateQuery` trait

mod memory_store;
mod mysql_store;
mod predicate;

pub use memory_store::{MemoryRowStore, Row};
pub use mysql_store::MySqlRowStore;
pub use predicate::{CompareOp, Predicate};

use crate::utils::PlannerResult;
use async_trait::async_trait;

/// Outlier count of one distinct value combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCount {
    pub count: u64,
    /// Values in the order of the requested attributes
    pub values: Vec<String>,
}

/// Row store interface consumed by the miner and the planner.
///
/// Every call is a blocking round trip from the caller's point of view: the
/// planner awaits each one before issuing the next, since later queries read the
/// neutralization flag written by earlier mutations.
#[async_trait]
pub trait RowAggregateQuery: Send + Sync {
    // ========================================
    // Aggregate Queries
    // ========================================

    /// Number of rows matching `predicate`
    async fn count_rows(&self, predicate: &Predicate) -> PlannerResult<u64>;

    /// Number of rows matching both `outlier` and `base`
    async fn count_outliers(&self, outlier: &Predicate, base: &Predicate) -> PlannerResult<u64>;

    /// Outlier counts grouped by the given attributes, one entry per distinct value combination
    async fn group_outlier_counts(
        &self,
        attributes: &[String],
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<Vec<GroupCount>>;

    /// Rows inside `base`, matching every `names[i] = values[i]`, that are not outliers
    async fn count_inliers_matching(
        &self,
        names: &[String],
        values: &[String],
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<u64>;

    /// Distinct values of one attribute across the whole log
    async fn distinct_values(&self, attribute: &str) -> PlannerResult<Vec<String>>;

    // ========================================
    // Neutralization Mutations
    // ========================================

    /// Sets the neutralization flag equal to the outlier indicator on every row
    async fn reset_neutralization(&self) -> PlannerResult<()>;

    /// Zeroes the neutralization flag on rows where `attribute = value`
    async fn clear_neutralization(&self, attribute: &str, value: &str) -> PlannerResult<()>;
}

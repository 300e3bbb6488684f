// Common test utilities and helpers

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::Explanation;
use crate::services::MiningParams;
use crate::services::row_store::{GroupCount, MemoryRowStore, Predicate, Row, RowAggregateQuery};
use crate::utils::PlannerResult;

pub const INDICATOR_COLUMN: &str = "signal_1or2";
pub const NEUTRALIZATION_COLUMN: &str = "counter_drift";

/// Outlier predicate as the planner sees it: over the neutralization column
pub fn outlier() -> Predicate {
    Predicate::eq(NEUTRALIZATION_COLUMN, "1")
}

pub fn attrs(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn exp(values: &[&str]) -> Explanation {
    values.iter().copied().collect()
}

/// Thresholds used by most scenario tests
pub fn lenient_params() -> MiningParams {
    MiningParams {
        min_occurrences: 0.0,
        min_support: 0.1,
        min_confidence: 0.5,
        min_risk: 1.0,
        max_length: 3,
        ..Default::default()
    }
}

/// `outliers` + `inliers` identical rows carrying `values`; both flag columns are set.
pub fn row_group(values: &[(&str, &str)], outliers: usize, inliers: usize) -> Vec<Row> {
    let make = |flag: &str| -> Row {
        let mut row: Row = values.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        row.insert(INDICATOR_COLUMN.to_string(), flag.to_string());
        row.insert(NEUTRALIZATION_COLUMN.to_string(), flag.to_string());
        row
    };

    let mut rows = Vec::with_capacity(outliers + inliers);
    rows.extend((0..outliers).map(|_| make("1")));
    rows.extend((0..inliers).map(|_| make("0")));
    rows
}

/// Create an in-memory row store from row groups
pub fn create_test_store(groups: Vec<Vec<Row>>) -> MemoryRowStore {
    MemoryRowStore::new(INDICATOR_COLUMN, NEUTRALIZATION_COLUMN)
        .with_rows(groups.into_iter().flatten().collect())
}

/// Rows whose outlier flag is set, read from the neutralization column
pub fn flagged_rows(store: &MemoryRowStore) -> Vec<Row> {
    store
        .snapshot()
        .unwrap()
        .into_iter()
        .filter(|row| row.get(NEUTRALIZATION_COLUMN).map(String::as_str) == Some("1"))
        .collect()
}

/// Store wrapper recording every call, for asserting on the query sequence
pub struct RecordingStore {
    pub inner: MemoryRowStore,
    pub calls: Mutex<Vec<String>>,
    pub grouped_by: Mutex<Vec<Vec<String>>>,
}

impl RecordingStore {
    pub fn new(inner: MemoryRowStore) -> Self {
        Self { inner, calls: Mutex::new(Vec::new()), grouped_by: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn grouped_by(&self) -> Vec<Vec<String>> {
        self.grouped_by.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl RowAggregateQuery for RecordingStore {
    async fn count_rows(&self, predicate: &Predicate) -> PlannerResult<u64> {
        self.record("count_rows");
        self.inner.count_rows(predicate).await
    }

    async fn count_outliers(&self, outlier: &Predicate, base: &Predicate) -> PlannerResult<u64> {
        self.record("count_outliers");
        self.inner.count_outliers(outlier, base).await
    }

    async fn group_outlier_counts(
        &self,
        attributes: &[String],
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<Vec<GroupCount>> {
        self.record("group_outlier_counts");
        self.grouped_by.lock().unwrap().push(attributes.to_vec());
        self.inner.group_outlier_counts(attributes, outlier, base).await
    }

    async fn count_inliers_matching(
        &self,
        names: &[String],
        values: &[String],
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<u64> {
        self.record("count_inliers_matching");
        self.inner.count_inliers_matching(names, values, outlier, base).await
    }

    async fn distinct_values(&self, attribute: &str) -> PlannerResult<Vec<String>> {
        self.record("distinct_values");
        self.inner.distinct_values(attribute).await
    }

    async fn reset_neutralization(&self) -> PlannerResult<()> {
        self.record("reset_neutralization");
        self.inner.reset_neutralization().await
    }

    async fn clear_neutralization(&self, attribute: &str, value: &str) -> PlannerResult<()> {
        self.record(&format!("clear_neutralization {}={}", attribute, value));
        self.inner.clear_neutralization(attribute, value).await
    }
}

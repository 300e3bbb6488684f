//! Frequent Itemset Miner
//!
//! Level-wise search over attribute combinations. Level k only explores
//! combinations built from two frequent (k-1)-combinations, where "frequent"
//! means at least one value combination cleared the occurrence/support floor.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{AttributeValue, FrequentItemSet};
use crate::services::row_store::{GroupCount, Predicate, RowAggregateQuery};
use crate::utils::{PlannerError, PlannerResult, canonical_key};

// ============================================================================
// Parameters
// ============================================================================

/// What to do with an itemset that covers every outlier (`b_o == 0`),
/// where the out-of-itemset outlier rate is zero and the risk ratio undefined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedRiskPolicy {
    /// Record `risk_ratio = +inf` and accept without the risk check
    #[default]
    Accept,
    /// Abort mining with `PlannerError::UndefinedRisk`
    Fail,
}

/// Thresholds of one mining run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningParams {
    /// Minimum outliers in the itemset as a fraction of all rows
    pub min_occurrences: f64,
    /// Minimum outliers in the itemset as a fraction of all outliers
    pub min_support: f64,
    pub min_confidence: f64,
    pub min_risk: f64,
    /// Largest itemset size explored, capped at the attribute count
    pub max_length: usize,
    pub undefined_risk: UndefinedRiskPolicy,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_occurrences: 0.01,
            min_support: 0.01,
            min_confidence: 0.51,
            min_risk: 1.1,
            max_length: 3,
            undefined_risk: UndefinedRiskPolicy::Accept,
        }
    }
}

impl MiningParams {
    pub fn validate(&self) -> PlannerResult<()> {
        for (name, value) in [
            ("min_occurrences", self.min_occurrences),
            ("min_support", self.min_support),
            ("min_confidence", self.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PlannerError::invalid_parameter(
                    name,
                    format!("must be within [0, 1], got {}", value),
                ));
            }
        }

        if !self.min_risk.is_finite() || self.min_risk < 0.0 {
            return Err(PlannerError::invalid_parameter(
                "min_risk",
                format!("must be a finite non-negative number, got {}", self.min_risk),
            ));
        }

        if self.max_length == 0 {
            return Err(PlannerError::invalid_parameter("max_length", "must be at least 1"));
        }

        Ok(())
    }
}

/// Attribute universe must be non-empty and free of duplicates.
pub fn validate_attributes(attributes: &[String]) -> PlannerResult<()> {
    if attributes.is_empty() {
        return Err(PlannerError::invalid_parameter("attributes", "at least one attribute is required"));
    }

    let mut seen = HashSet::new();
    for attribute in attributes {
        if !seen.insert(attribute.as_str()) {
            return Err(PlannerError::invalid_parameter(
                "attributes",
                format!("attribute `{}` is listed twice", attribute),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Miner
// ============================================================================

/// Dataset-wide totals shared by every candidate of a run
#[derive(Debug, Clone, Copy)]
struct Totals {
    rows: u64,
    outliers: u64,
}

pub struct FrequentItemSetMiner<'a, S: RowAggregateQuery + ?Sized> {
    store: &'a S,
}

impl<'a, S: RowAggregateQuery + ?Sized> FrequentItemSetMiner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Mine every itemset passing all thresholds, sorted by ascending risk ratio.
    pub async fn mine(
        &self,
        attributes: &[String],
        params: &MiningParams,
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<Vec<FrequentItemSet>> {
        params.validate()?;
        validate_attributes(attributes)?;
        let max_length = params.max_length.min(attributes.len());

        let total_rows = self.store.count_rows(base).await?;
        if total_rows < 1 {
            return Err(PlannerError::EmptyDataset);
        }
        let total_outliers = self.store.count_outliers(outlier, base).await?;
        if total_outliers < 1 {
            tracing::info!("No outliers among {} rows, nothing to mine", total_rows);
            return Ok(Vec::new());
        }
        let totals = Totals { rows: total_rows, outliers: total_outliers };

        let min_num_outliers = (total_rows as f64 * params.min_occurrences)
            .max(total_outliers as f64 * params.min_support);
        tracing::debug!(
            "Mining {} attributes: rows={}, outliers={}, min_num_outliers={}",
            attributes.len(),
            total_rows,
            total_outliers,
            min_num_outliers
        );

        let mut accepted: Vec<FrequentItemSet> = Vec::new();
        // combinations are ascending attribute indices, i.e. universe order
        let mut candidates: Vec<Vec<usize>> = (0..attributes.len()).map(|i| vec![i]).collect();

        for level in 1..=max_length {
            if candidates.is_empty() {
                break;
            }

            let mut frequent: Vec<Vec<usize>> = Vec::new();
            for combination in &candidates {
                let names: Vec<String> =
                    combination.iter().map(|&i| attributes[i].clone()).collect();
                let groups = self.store.group_outlier_counts(&names, outlier, base).await?;

                let mut is_frequent = false;
                for group in groups {
                    if (group.count as f64) <= min_num_outliers {
                        continue;
                    }
                    is_frequent = true;

                    if let Some(itemset) = self
                        .evaluate(attributes, &names, group, totals, params, outlier, base)
                        .await?
                    {
                        accepted.push(itemset);
                    }
                }

                if is_frequent {
                    frequent.push(combination.clone());
                }
            }

            tracing::debug!(
                "Level {}: {} candidate combinations, {} frequent",
                level,
                candidates.len(),
                frequent.len()
            );
            candidates = next_level_candidates(attributes, &frequent, level + 1);
        }

        accepted.sort_by(|a, b| a.cmp_by_risk(b));
        tracing::info!("Mined {} frequent itemsets", accepted.len());
        Ok(accepted)
    }

    /// Confidence and risk checks for one value combination past the floor.
    #[allow(clippy::too_many_arguments)]
    async fn evaluate(
        &self,
        attributes: &[String],
        names: &[String],
        group: GroupCount,
        totals: Totals,
        params: &MiningParams,
        outlier: &Predicate,
        base: &Predicate,
    ) -> PlannerResult<Option<FrequentItemSet>> {
        let c = group.count;
        let i = self
            .store
            .count_inliers_matching(names, &group.values, outlier, base)
            .await?;

        let confidence = c as f64 / (c + i) as f64;
        if confidence < params.min_confidence {
            return Ok(None);
        }

        let b_o = totals.outliers.saturating_sub(c);
        let risk_ratio = if b_o == 0 {
            match params.undefined_risk {
                UndefinedRiskPolicy::Accept => f64::INFINITY,
                UndefinedRiskPolicy::Fail => {
                    return Err(PlannerError::UndefinedRisk {
                        values: group.values,
                        outliers: totals.outliers,
                    });
                },
            }
        } else {
            let b_i = totals.rows.saturating_sub(totals.outliers).saturating_sub(i);
            let risk_ratio = confidence / (b_o as f64 / (b_o + b_i) as f64);
            if risk_ratio < params.min_risk {
                return Ok(None);
            }
            risk_ratio
        };

        let itemset_attributes = attributes
            .iter()
            .map(|attribute| {
                let value = match names.iter().position(|name| name == attribute) {
                    Some(pos) => AttributeValue::Fixed(group.values[pos].clone()),
                    None => AttributeValue::Wildcard,
                };
                (attribute.clone(), value)
            })
            .collect();

        Ok(Some(FrequentItemSet {
            attributes: itemset_attributes,
            risk_ratio,
            occurrence_ratio: c as f64 / totals.rows as f64,
            support_ratio: c as f64 / totals.outliers as f64,
            confidence,
        }))
    }
}

/// Unions of frequent pairs that have exactly `size` attributes, each visited once.
fn next_level_candidates(attributes: &[String], frequent: &[Vec<usize>], size: usize) -> Vec<Vec<usize>> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut next = Vec::new();

    for (i, left) in frequent.iter().enumerate() {
        for right in &frequent[i + 1..] {
            let mut union: Vec<usize> = left.iter().chain(right).copied().collect();
            union.sort_unstable();
            union.dedup();
            if union.len() != size {
                continue;
            }

            let names: Vec<&str> = union.iter().map(|&k| attributes[k].as_str()).collect();
            if seen.insert(canonical_key(&names)) {
                next.push(union);
            }
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::row_store::MemoryRowStore;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_params_validation() {
        assert!(MiningParams::default().validate().is_ok());

        let params = MiningParams { min_support: 1.5, ..Default::default() };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, PlannerError::InvalidParameter { name: "min_support", .. }));

        let params = MiningParams { min_occurrences: -0.1, ..Default::default() };
        assert!(params.validate().is_err());

        let params = MiningParams { min_risk: f64::NAN, ..Default::default() };
        assert!(params.validate().is_err());

        let params = MiningParams { max_length: 0, ..Default::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_attribute_validation() {
        assert!(validate_attributes(&names(&["weather", "location"])).is_ok());
        assert!(validate_attributes(&[]).is_err());
        assert!(validate_attributes(&names(&["weather", "weather"])).is_err());
    }

    #[test]
    fn test_next_level_candidates_visits_each_union_once() {
        let attributes = names(&["a", "b", "c"]);
        let frequent = vec![vec![0, 1], vec![0, 2], vec![1, 2]];
        let next = next_level_candidates(&attributes, &frequent, 3);
        assert_eq!(next, vec![vec![0, 1, 2]]);

        let singles = vec![vec![0], vec![2]];
        assert_eq!(next_level_candidates(&attributes, &singles, 2), vec![vec![0, 2]]);
    }

    #[test]
    fn test_params_deserialize_with_defaults() {
        let params: MiningParams = toml::from_str(
            r#"
            min_support = 0.2
            undefined_risk = "fail"
            "#,
        )
        .unwrap();
        assert_eq!(params.min_support, 0.2);
        assert_eq!(params.undefined_risk, UndefinedRiskPolicy::Fail);
        assert_eq!(params.max_length, 3);
    }

    #[tokio::test]
    async fn test_invalid_params_fail_before_querying() {
        // an empty store would raise EmptyDataset if it were queried
        let store = MemoryRowStore::new("signal", "counter_drift");
        let miner = FrequentItemSetMiner::new(&store);
        let params = MiningParams { min_confidence: 2.0, ..Default::default() };

        let err = miner
            .mine(&names(&["weather"]), &params, &Predicate::eq("signal", "1"), &Predicate::True)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::utils::ErrorKind::InvalidParameter);
    }

    #[tokio::test]
    async fn test_empty_dataset() {
        let store = MemoryRowStore::new("signal", "counter_drift");
        let miner = FrequentItemSetMiner::new(&store);

        let err = miner
            .mine(
                &names(&["weather"]),
                &MiningParams::default(),
                &Predicate::eq("signal", "1"),
                &Predicate::True,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::EmptyDataset));
    }
}

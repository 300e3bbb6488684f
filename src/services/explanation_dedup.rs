//! Explanation Deduplicator
//!
//! Itemsets whose four statistics are bitwise identical describe the same
//! outlier population; only one of each such class is kept.

use serde::{Deserialize, Serialize};

use crate::models::{Explanation, FrequentItemSet};
use crate::services::itemset_miner::{FrequentItemSetMiner, MiningParams};
use crate::services::row_store::{Predicate, RowAggregateQuery};
use crate::utils::PlannerResult;

/// Which member of an equal-statistics class survives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the most specific itemset
    #[default]
    KeepMoreAttributes,
    /// Keep the most general itemset
    KeepFewerAttributes,
}

impl DuplicatePolicy {
    /// True when `challenger` should replace `incumbent`. Ties keep the incumbent.
    fn prefers(self, challenger: &FrequentItemSet, incumbent: &FrequentItemSet) -> bool {
        match self {
            DuplicatePolicy::KeepMoreAttributes => challenger.specificity() > incumbent.specificity(),
            DuplicatePolicy::KeepFewerAttributes => challenger.specificity() < incumbent.specificity(),
        }
    }
}

/// One survivor per equal-statistics class, at the position of the class's
/// first member in `ranked`.
pub fn deduplicate(ranked: Vec<FrequentItemSet>, policy: DuplicatePolicy) -> Vec<FrequentItemSet> {
    let before = ranked.len();
    let mut survivors: Vec<FrequentItemSet> = Vec::with_capacity(before);

    for itemset in ranked {
        match survivors.iter().position(|s| s.has_same_statistics(&itemset)) {
            Some(slot) => {
                if policy.prefers(&itemset, &survivors[slot]) {
                    survivors[slot] = itemset;
                }
            },
            None => survivors.push(itemset),
        }
    }

    if survivors.len() < before {
        tracing::debug!("Deduplicated {} itemsets down to {}", before, survivors.len());
    }
    survivors
}

/// Explanations of the ranked itemsets, highest risk first.
pub fn to_ranked_explanations(itemsets: &[FrequentItemSet]) -> Vec<Explanation> {
    itemsets.iter().rev().map(FrequentItemSet::explanation).collect()
}

/// Mine, deduplicate and rank in one call.
pub async fn explanations_for<S: RowAggregateQuery + ?Sized>(
    store: &S,
    attributes: &[String],
    params: &MiningParams,
    policy: DuplicatePolicy,
    outlier: &Predicate,
    base: &Predicate,
) -> PlannerResult<Vec<Explanation>> {
    let itemsets = FrequentItemSetMiner::new(store)
        .mine(attributes, params, outlier, base)
        .await?;
    let survivors = deduplicate(itemsets, policy);
    Ok(to_ranked_explanations(&survivors))
}

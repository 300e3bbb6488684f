//! Explanation Hierarchy Builder
//!
//! Each ranked explanation hangs under its shortest ranked proper subset
//! (earliest rank breaks ties). Explanations with no ranked proper subset are
//! roots. The chosen parent is always a root itself: any ranked subset of it
//! would be a shorter candidate.

use std::collections::HashMap;

use crate::models::{Explanation, ExplanationHierarchy};
use crate::utils::{ordered_subsets, unique_ordered};

pub fn build_hierarchy(ranked: &[Explanation]) -> ExplanationHierarchy {
    let ranked = unique_ordered(ranked.to_vec());
    let rank: HashMap<&Explanation, usize> =
        ranked.iter().enumerate().map(|(i, e)| (e, i)).collect();

    let parents: Vec<Option<Explanation>> = ranked
        .iter()
        .map(|explanation| {
            ordered_subsets(explanation.values())
                .into_iter()
                .map(Explanation::new)
                .filter(|candidate| candidate != explanation)
                .filter_map(|candidate| rank.get(&candidate).map(|&i| (candidate, i)))
                .min_by_key(|(candidate, i)| (candidate.len(), *i))
                .map(|(candidate, _)| candidate)
        })
        .collect();

    // roots first so that their order is the rank order
    let mut hierarchy = ExplanationHierarchy::new();
    for (explanation, parent) in ranked.iter().zip(&parents) {
        if parent.is_none() {
            hierarchy.insert_root(explanation.clone());
        }
    }
    for (explanation, parent) in ranked.iter().zip(&parents) {
        if let Some(parent) = parent {
            hierarchy.push_child(parent, explanation.clone());
        }
    }
    hierarchy.close_leaves();

    tracing::debug!(
        "Built hierarchy with {} roots from {} explanations",
        hierarchy.len(),
        ranked.len()
    );
    hierarchy
}

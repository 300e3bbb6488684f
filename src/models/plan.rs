use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};

use super::Explanation;

// ============================================================================
// Explanation Hierarchy
// ============================================================================

/// Forest of root explanations, each mapped to its finer subgroups.
///
/// Iteration follows insertion order, which is the rank order of the roots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplanationHierarchy {
    entries: Vec<(Explanation, Vec<Explanation>)>,
    index: HashMap<Explanation, usize>,
}

impl ExplanationHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_root(&self, root: &Explanation) -> bool {
        self.index.contains_key(root)
    }

    pub fn get(&self, root: &Explanation) -> Option<&[Explanation]> {
        self.index.get(root).map(|&i| self.entries[i].1.as_slice())
    }

    pub fn roots(&self) -> impl Iterator<Item = &Explanation> {
        self.entries.iter().map(|(root, _)| root)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Explanation, &[Explanation])> {
        self.entries.iter().map(|(root, children)| (root, children.as_slice()))
    }

    /// Every explanation listed as a subgroup of some root.
    pub fn all_subgroups(&self) -> HashSet<Explanation> {
        self.entries
            .iter()
            .flat_map(|(_, children)| children.iter().cloned())
            .collect()
    }

    /// Registers `root` with an empty subgroup list if it is not present yet.
    pub(crate) fn insert_root(&mut self, root: Explanation) {
        if !self.index.contains_key(&root) {
            self.index.insert(root.clone(), self.entries.len());
            self.entries.push((root, Vec::new()));
        }
    }

    /// Appends `child` under `root`, creating the root entry when missing.
    pub(crate) fn push_child(&mut self, root: &Explanation, child: Explanation) {
        self.insert_root(root.clone());
        let slot = self.index[root];
        let children = &mut self.entries[slot].1;
        if !children.contains(&child) && &child != root {
            children.push(child);
        }
    }

    /// Roots without finer subgroups become their own sole subgroup.
    pub(crate) fn close_leaves(&mut self) {
        for (root, children) in &mut self.entries {
            if children.is_empty() {
                children.push(root.clone());
            }
        }
    }
}

// ============================================================================
// Tuning Plan
// ============================================================================

/// Label of the sentinel "no intervention" entry.
pub const ORIGINAL_PLAN_KEY: &str = "original";

/// Key of one tuning plan entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanKey {
    /// Baseline configuration, no intervention
    Original,
    Explanation(Explanation),
}

impl Serialize for PlanKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlanKey::Original => [ORIGINAL_PLAN_KEY].serialize(serializer),
            PlanKey::Explanation(explanation) => explanation.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanEntry {
    pub key: PlanKey,
    pub subgroups: Vec<Explanation>,
}

/// Ordered remediation plan, most impactful entry first after the sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TuningPlan {
    entries: Vec<PlanEntry>,
}

impl TuningPlan {
    /// Plan holding only the sentinel entry.
    pub fn new() -> Self {
        Self { entries: vec![PlanEntry { key: PlanKey::Original, subgroups: Vec::new() }] }
    }

    /// Appends an entry. A key already present keeps its first position and subgroups.
    pub fn push(&mut self, explanation: Explanation, subgroups: Vec<Explanation>) {
        let key = PlanKey::Explanation(explanation);
        if self.entries.iter().any(|entry| entry.key == key) {
            return;
        }
        self.entries.push(PlanEntry { key, subgroups });
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explanation keys in plan order, sentinel excluded.
    pub fn explanations(&self) -> Vec<&Explanation> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.key {
                PlanKey::Explanation(explanation) => Some(explanation),
                PlanKey::Original => None,
            })
            .collect()
    }

    pub fn subgroups(&self, explanation: &Explanation) -> Option<&[Explanation]> {
        self.entries
            .iter()
            .find(|entry| matches!(&entry.key, PlanKey::Explanation(e) if e == explanation))
            .map(|entry| entry.subgroups.as_slice())
    }
}

impl Default for TuningPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the counterfactual test for one root explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationState {
    Untested,
    /// Still explains enough outliers; neutralized and planned
    Survived,
    /// Earlier neutralizations already removed its effect
    NeutralizedWithoutEffect,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(values: &[&str]) -> Explanation {
        values.iter().copied().collect()
    }

    #[test]
    fn test_hierarchy_preserves_insertion_order() {
        let mut hierarchy = ExplanationHierarchy::new();
        hierarchy.insert_root(exp(&["rain"]));
        hierarchy.insert_root(exp(&["NY"]));
        hierarchy.push_child(&exp(&["rain"]), exp(&["rain", "resnet"]));
        hierarchy.push_child(&exp(&["rain"]), exp(&["rain", "resnet"]));
        hierarchy.close_leaves();

        let roots: Vec<_> = hierarchy.roots().cloned().collect();
        assert_eq!(roots, vec![exp(&["rain"]), exp(&["NY"])]);
        assert_eq!(hierarchy.get(&exp(&["rain"])).unwrap(), &[exp(&["rain", "resnet"])]);
        assert_eq!(hierarchy.get(&exp(&["NY"])).unwrap(), &[exp(&["NY"])]);
    }

    #[test]
    fn test_plan_sentinel_first_and_keys_unique() {
        let mut plan = TuningPlan::new();
        plan.push(exp(&["rain"]), vec![exp(&["rain", "NY"])]);
        plan.push(exp(&["rain"]), vec![]);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.entries()[0].key, PlanKey::Original);
        assert_eq!(plan.subgroups(&exp(&["rain"])).unwrap(), &[exp(&["rain", "NY"])]);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json[0]["key"], serde_json::json!(["original"]));
        assert_eq!(json[1]["key"], serde_json::json!(["rain"]));
        assert_eq!(json[1]["subgroups"], serde_json::json!([["rain", "NY"]]));
    }
}

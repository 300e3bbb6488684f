//! Counterfactual Tuning Planner
//!
//! Walks the hierarchy roots in rank order and checks whether each one still
//! explains enough outliers once the previously planned explanations have been
//! neutralized in the row store. Roots that keep their effect are planned as-is;
//! for roots that lost it, the coarsest still-surviving subgroups are planned
//! instead and the explanation pipeline is re-run against the mutated store.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::Instrument;
use uuid::Uuid;

use crate::models::{Explanation, ExplanationHierarchy, ExplanationState, TuningPlan};
use crate::services::explanation_dedup::{DuplicatePolicy, explanations_for};
use crate::services::hierarchy_builder::build_hierarchy;
use crate::services::itemset_miner::{MiningParams, validate_attributes};
use crate::services::row_store::{Predicate, RowAggregateQuery};
use crate::utils::{PlannerError, PlannerResult};

/// Everything a planning run needs besides the attribute universe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub mining: MiningParams,
    pub duplicate_policy: DuplicatePolicy,
    /// Outlier predicate, normally over the neutralization column (e.g. `counter_drift = 1`)
    pub outlier: Predicate,
    /// Restricts the rows under analysis
    pub base: Predicate,
}

/// Plan plus how each root fared in the counterfactual walk
#[derive(Debug, Clone, Serialize)]
pub struct PlanningTrace {
    pub run_id: String,
    pub plan: TuningPlan,
    pub states: Vec<RootOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootOutcome {
    pub root: Explanation,
    pub state: ExplanationState,
}

pub struct TuningPlanner<'a, S: RowAggregateQuery + ?Sized> {
    store: &'a S,
    config: PlannerConfig,
}

impl<'a, S: RowAggregateQuery + ?Sized> TuningPlanner<'a, S> {
    pub fn new(store: &'a S, config: PlannerConfig) -> Self {
        Self { store, config }
    }

    pub async fn plan(&self, attributes: &[String]) -> PlannerResult<TuningPlan> {
        Ok(self.plan_with_trace(attributes).await?.plan)
    }

    pub async fn plan_with_trace(&self, attributes: &[String]) -> PlannerResult<PlanningTrace> {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("tuning_plan", run_id = %run_id);
        self.run(attributes, run_id.clone()).instrument(span).await
    }

    /// Ranked explanations over the untouched log: neutralization left behind by
    /// an earlier planning run is reset before mining.
    pub async fn explain(&self, attributes: &[String]) -> PlannerResult<Vec<Explanation>> {
        self.config.mining.validate()?;
        validate_attributes(attributes)?;

        self.store.reset_neutralization().await?;
        self.explanations(attributes).await
    }

    async fn run(&self, attributes: &[String], run_id: String) -> PlannerResult<PlanningTrace> {
        self.config.mining.validate()?;
        validate_attributes(attributes)?;
        tracing::info!("Planning over attributes {:?}", attributes);

        let owners = self.value_owners(attributes).await?;
        self.store.reset_neutralization().await?;

        let ranked = self.explanations(attributes).await?;
        let hierarchy = build_hierarchy(&ranked);

        let roots: Vec<Explanation> = hierarchy.roots().cloned().collect();
        let root_set: HashSet<Explanation> = roots.iter().cloned().collect();
        let all_subgroups = hierarchy.all_subgroups();

        let mut survived_roots = root_set.clone();
        let mut survived_subgroups = all_subgroups.clone();
        let mut plan_keys: Vec<Explanation> = Vec::new();
        let mut states: Vec<RootOutcome> = roots
            .iter()
            .map(|root| RootOutcome { root: root.clone(), state: ExplanationState::Untested })
            .collect();

        for (slot, root) in roots.iter().enumerate() {
            if self.survives(root, &owners).await? {
                tracing::debug!("{} survived, neutralizing it", root);
                states[slot].state = ExplanationState::Survived;
                if !plan_keys.contains(root) {
                    plan_keys.push(root.clone());
                }
                self.neutralize(root, &owners).await?;
                continue;
            }

            tracing::debug!("{} no longer explains enough outliers", root);
            states[slot].state = ExplanationState::NeutralizedWithoutEffect;
            survived_roots.remove(root);

            let candidates: Vec<&Explanation> = hierarchy
                .get(root)
                .unwrap_or_default()
                .iter()
                .filter(|child| *child != root && survived_subgroups.contains(*child))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let coarse = coarsest(&candidates, &survived_roots);
            for subgroup in coarse {
                if plan_keys.contains(&subgroup) {
                    continue;
                }
                tracing::debug!("Planning surviving subgroup {} of {}", subgroup, root);
                self.neutralize(&subgroup, &owners).await?;
                plan_keys.push(subgroup);
            }

            let fresh: HashSet<Explanation> =
                self.explanations(attributes).await?.into_iter().collect();
            survived_roots = fresh.intersection(&root_set).cloned().collect();
            survived_subgroups = fresh.intersection(&all_subgroups).cloned().collect();
        }

        let plan = assemble_plan(&hierarchy, plan_keys);
        tracing::info!("Tuning plan ready with {} entries", plan.len());
        Ok(PlanningTrace { run_id, plan, states })
    }

    async fn explanations(&self, attributes: &[String]) -> PlannerResult<Vec<Explanation>> {
        explanations_for(
            self.store,
            attributes,
            &self.config.mining,
            self.config.duplicate_policy,
            &self.config.outlier,
            &self.config.base,
        )
        .await
    }

    /// Value -> owning attribute. The first attribute listing a value wins.
    async fn value_owners(&self, attributes: &[String]) -> PlannerResult<HashMap<String, String>> {
        let mut owners = HashMap::new();
        for attribute in attributes {
            for value in self.store.distinct_values(attribute).await? {
                owners.entry(value).or_insert_with(|| attribute.clone());
            }
        }
        Ok(owners)
    }

    /// Share of all current outliers that match `explanation` inside the base
    /// predicate, compared against `min_support`.
    async fn survives(
        &self,
        explanation: &Explanation,
        owners: &HashMap<String, String>,
    ) -> PlannerResult<bool> {
        let pairs = attribute_pairs(explanation, owners)?;
        let scoped = self.config.base.clone().and(Predicate::all_equal(
            pairs.iter().map(|(attribute, value)| (*attribute, *value)),
        ));

        let matching = self.store.count_outliers(&self.config.outlier, &scoped).await?;
        let total = self.store.count_outliers(&self.config.outlier, &Predicate::True).await?;
        if total == 0 {
            return Ok(false);
        }

        let ratio = matching as f64 / total as f64;
        tracing::debug!("{}: {}/{} outliers ({:.4})", explanation, matching, total, ratio);
        Ok(ratio >= self.config.mining.min_support)
    }

    async fn neutralize(
        &self,
        explanation: &Explanation,
        owners: &HashMap<String, String>,
    ) -> PlannerResult<()> {
        for (attribute, value) in attribute_pairs(explanation, owners)? {
            self.store.clear_neutralization(attribute, value).await?;
        }
        Ok(())
    }
}

fn attribute_pairs<'e>(
    explanation: &'e Explanation,
    owners: &'e HashMap<String, String>,
) -> PlannerResult<Vec<(&'e str, &'e str)>> {
    explanation
        .values()
        .iter()
        .map(|value| match owners.get(value) {
            Some(attribute) => Ok((attribute.as_str(), value.as_str())),
            None => Err(PlannerError::UnmappedValue(value.clone())),
        })
        .collect()
}

/// Candidates without a proper subset among the other candidates or the surviving roots.
fn coarsest(candidates: &[&Explanation], survived_roots: &HashSet<Explanation>) -> Vec<Explanation> {
    candidates
        .iter()
        .filter(|candidate| {
            !candidates.iter().any(|other| other.is_proper_subset_of(candidate))
                && !survived_roots.iter().any(|root| root.is_proper_subset_of(candidate))
        })
        .map(|candidate| (*candidate).clone())
        .collect()
}

/// Sentinel first, then the planned keys in reverse planning order.
fn assemble_plan(hierarchy: &ExplanationHierarchy, plan_keys: Vec<Explanation>) -> TuningPlan {
    let mut plan = TuningPlan::new();
    for key in plan_keys.into_iter().rev() {
        let subgroups = match hierarchy.get(&key) {
            Some(children) => children.to_vec(),
            None => vec![key.clone()],
        };
        plan.push(key, subgroups);
    }
    plan
}

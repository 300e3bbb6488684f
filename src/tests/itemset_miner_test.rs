use crate::models::{AttributeValue, FrequentItemSet};
use crate::services::row_store::{Predicate, Row};
use crate::services::{FrequentItemSetMiner, MiningParams, UndefinedRiskPolicy};
use crate::tests::common::{
    RecordingStore, attrs, create_test_store, lenient_params, outlier, row_group,
};
use crate::utils::{ErrorKind, PlannerError};

fn fixed_values(itemset: &FrequentItemSet) -> Vec<&str> {
    itemset.fixed_pairs().map(|(_, value)| value).collect()
}

/// rain is 40% of the rows and every outlier
fn rain_only_rows() -> Vec<Vec<Row>> {
    vec![row_group(&[("weather", "rain")], 4, 0), row_group(&[("weather", "clear")], 0, 6)]
}

#[tokio::test]
async fn test_single_attribute_explanation() {
    let store = create_test_store(rain_only_rows());
    let params = MiningParams {
        min_occurrences: 0.1,
        min_support: 0.1,
        min_confidence: 0.5,
        min_risk: 1.0,
        ..Default::default()
    };

    let itemsets = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather"]), &params, &outlier(), &Predicate::True)
        .await
        .unwrap();

    assert_eq!(itemsets.len(), 1, "Only weather=rain should be returned");
    let rain = &itemsets[0];
    assert_eq!(rain.attributes, vec![("weather".to_string(), AttributeValue::Fixed("rain".into()))]);
    assert_eq!(rain.confidence, 1.0);
    assert_eq!(rain.occurrence_ratio, 0.4);
    assert_eq!(rain.support_ratio, 1.0);
    // rain covers every outlier
    assert!(rain.risk_ratio.is_infinite());
}

#[tokio::test]
async fn test_undefined_risk_fail_policy() {
    let store = create_test_store(rain_only_rows());
    let params = MiningParams { undefined_risk: UndefinedRiskPolicy::Fail, ..lenient_params() };

    let err = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather"]), &params, &outlier(), &Predicate::True)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UndefinedRisk);
    match err {
        PlannerError::UndefinedRisk { values, outliers } => {
            assert_eq!(values, vec!["rain".to_string()]);
            assert_eq!(outliers, 4);
        },
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_undefined_risk_fail_policy_at_second_level() {
    // neither rain nor NY is confident alone; only the pair covers every outlier
    let store = create_test_store(vec![
        row_group(&[("weather", "rain"), ("location", "NY")], 4, 0),
        row_group(&[("weather", "rain"), ("location", "LA")], 0, 10),
        row_group(&[("weather", "clear"), ("location", "NY")], 0, 10),
    ]);
    let params = MiningParams { undefined_risk: UndefinedRiskPolicy::Fail, ..lenient_params() };

    let err = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather", "location"]), &params, &outlier(), &Predicate::True)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UndefinedRisk);
    match err {
        PlannerError::UndefinedRisk { values, outliers } => {
            assert_eq!(values, vec!["rain".to_string(), "NY".to_string()]);
            assert_eq!(outliers, 4);
        },
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_undefined_risk_accepted_at_every_level() {
    let store = create_test_store(vec![
        row_group(&[("weather", "rain"), ("location", "NY")], 4, 1),
        row_group(&[("weather", "clear"), ("location", "LA")], 0, 10),
    ]);

    let itemsets = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather", "location"]), &lenient_params(), &outlier(), &Predicate::True)
        .await
        .unwrap();

    let specificities: Vec<usize> = itemsets.iter().map(FrequentItemSet::specificity).collect();
    assert_eq!(specificities, vec![1, 1, 2]);
    assert!(itemsets.iter().all(|set| set.risk_ratio == f64::INFINITY));
    assert!(itemsets.iter().all(|set| set.confidence == 0.8));
}

#[tokio::test]
async fn test_no_outliers_returns_empty() {
    let store = create_test_store(vec![row_group(&[("weather", "clear")], 0, 100)]);

    let itemsets = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather"]), &lenient_params(), &outlier(), &Predicate::True)
        .await
        .unwrap();

    assert!(itemsets.is_empty(), "No outliers should yield no itemsets and no error");
}

#[tokio::test]
async fn test_invalid_parameters_issue_no_query() {
    let store = RecordingStore::new(create_test_store(rain_only_rows()));
    let miner = FrequentItemSetMiner::new(&store);

    let params = MiningParams { min_support: 1.01, ..lenient_params() };
    let err = miner
        .mine(&attrs(&["weather"]), &params, &outlier(), &Predicate::True)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    let err = miner
        .mine(&attrs(&["weather", "weather"]), &lenient_params(), &outlier(), &Predicate::True)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);

    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn test_thresholds_hold_and_results_sorted_by_risk() {
    let store = create_test_store(vec![
        row_group(&[("weather", "rain"), ("location", "NY"), ("model_type", "resnet")], 6, 1),
        row_group(&[("weather", "rain"), ("location", "LA"), ("model_type", "vit")], 2, 2),
        row_group(&[("weather", "fog"), ("location", "NY"), ("model_type", "vit")], 3, 2),
        row_group(&[("weather", "clear"), ("location", "SF"), ("model_type", "resnet")], 2, 40),
    ]);
    let params = lenient_params();
    let outlier = outlier();

    let itemsets = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather", "location", "model_type"]), &params, &outlier, &Predicate::True)
        .await
        .unwrap();
    assert!(!itemsets.is_empty());

    let total_rows = 58.0;
    let total_outliers = 13.0;
    let min_num_outliers: f64 =
        f64::max(total_rows * params.min_occurrences, total_outliers * params.min_support);
    for itemset in &itemsets {
        assert!(itemset.risk_ratio >= params.min_risk, "{:?}", fixed_values(itemset));
        assert!(itemset.confidence >= params.min_confidence, "{:?}", fixed_values(itemset));
        let count = (itemset.support_ratio * total_outliers).round();
        assert!(count > min_num_outliers, "{:?}", fixed_values(itemset));
        assert_eq!(itemset.attributes.len(), 3, "Every itemset spans the attribute universe");
    }

    for pair in itemsets.windows(2) {
        assert!(pair[0].risk_ratio <= pair[1].risk_ratio);
    }
}

#[tokio::test]
async fn test_infrequent_attribute_pruned_from_later_levels() {
    let mut rows: Vec<Row> = vec![
        row_group(&[("weather", "rain"), ("location", "NY")], 6, 1),
        row_group(&[("weather", "clear"), ("location", "LA")], 4, 30),
    ]
    .into_iter()
    .flatten()
    .collect();
    for (i, row) in rows.iter_mut().enumerate() {
        row.insert("id".to_string(), format!("run-{}", i));
    }
    let store = RecordingStore::new(create_test_store(vec![rows]));

    FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather", "location", "id"]), &lenient_params(), &outlier(), &Predicate::True)
        .await
        .unwrap();

    assert_eq!(
        store.grouped_by(),
        vec![
            attrs(&["weather"]),
            attrs(&["location"]),
            attrs(&["id"]),
            attrs(&["weather", "location"]),
        ]
    );
}

#[tokio::test]
async fn test_max_length_capped_at_attribute_count() {
    let store = RecordingStore::new(create_test_store(vec![
        row_group(&[("weather", "rain"), ("location", "NY")], 6, 1),
        row_group(&[("weather", "clear"), ("location", "LA")], 4, 30),
    ]));
    let params = MiningParams { max_length: 10, ..lenient_params() };

    let itemsets = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather", "location"]), &params, &outlier(), &Predicate::True)
        .await
        .unwrap();

    assert!(itemsets.iter().all(|set| set.specificity() <= 2));
    assert!(store.grouped_by().iter().all(|names| names.len() <= 2));
}

#[tokio::test]
async fn test_base_predicate_restricts_rows() {
    let store = create_test_store(vec![
        row_group(&[("weather", "rain"), ("day", "5")], 4, 0),
        row_group(&[("weather", "clear"), ("day", "5")], 1, 20),
        row_group(&[("weather", "clear"), ("day", "20")], 60, 0),
    ]);
    let base = Predicate::compare("day", crate::services::CompareOp::Le, "10");

    let itemsets = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather"]), &lenient_params(), &outlier(), &base)
        .await
        .unwrap();

    assert_eq!(itemsets.len(), 1);
    assert_eq!(fixed_values(&itemsets[0]), vec!["rain"]);
    assert_eq!(itemsets[0].occurrence_ratio, 4.0 / 25.0);
    assert_eq!(itemsets[0].support_ratio, 4.0 / 5.0);
}

#[tokio::test]
async fn test_empty_dataset_under_base() {
    let store = create_test_store(rain_only_rows());
    let base = Predicate::eq("weather", "snow");

    let err = FrequentItemSetMiner::new(&store)
        .mine(&attrs(&["weather"]), &lenient_params(), &outlier(), &base)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyDataset);
    assert!(err.is_retryable_with_relaxed_thresholds());
}

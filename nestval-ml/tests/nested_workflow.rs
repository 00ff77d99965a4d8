//! End-to-end tests for the prepare → evaluate → report pipeline.

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use nestval_ml::config::NestedCvConfig;
use nestval_ml::data::prepare::standard_normal;
use nestval_ml::data::{CsvSource, DataSource, DatasetPreparer, LabeledDataset, SampleSet};
use nestval_ml::training::{Aggregated, Aggregator, SolverKind};
use nestval_ml::{NestedEvaluator, ResultReporter};

/// 50 positives around +1, 50 negatives around -1, two features.
fn hundred_samples() -> SampleSet {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut features = Vec::with_capacity(100);
    let mut labels = Vec::with_capacity(100);
    for i in 0..100 {
        let label = i < 50;
        let shift = if label { 1.0 } else { -1.0 };
        features.push(vec![
            shift + standard_normal(&mut rng),
            0.5 * shift + standard_normal(&mut rng),
        ]);
        labels.push(label);
    }
    SampleSet::new(features, labels).unwrap()
}

fn fast_config(num_evals: usize) -> NestedCvConfig {
    let mut config = NestedCvConfig::default();
    config.outer.num_folds = 5;
    config.inner.num_folds = 3;
    config.inner.num_iter = 1;
    config.search.num_evals = num_evals;
    config
}

#[test]
fn test_same_seed_same_result() {
    let data = hundred_samples();
    let evaluator = NestedEvaluator::new(fast_config(5)).unwrap();

    let first = evaluator.evaluate(&data).unwrap();
    let second = evaluator.evaluate(&data).unwrap();

    let a = first.mean_score().unwrap();
    let b = second.mean_score().unwrap();
    assert!((a - b).abs() < 1e-12);
    assert_eq!(first.folds, second.folds);
    assert_eq!(first.folds.len(), 5);
    for fold in &first.folds {
        assert!((0.0..=1.0).contains(&fold.score));
        assert_eq!(fold.n_test, 20);
    }
}

#[test]
fn test_budget_of_one_gives_valid_point() {
    let data = hundred_samples();
    let config = fast_config(1);
    let space = config.space.clone();
    let result = NestedEvaluator::new(config).unwrap().evaluate(&data).unwrap();
    for fold in &result.folds {
        assert_eq!(fold.inner_evals, 1);
        assert!(space.contains(&fold.hyperparams));
        assert_eq!(fold.hyperparams.len(), 2);
    }
}

#[test]
fn test_identity_aggregation_matches_folds() {
    let mut config = fast_config(3);
    config.outer.aggregator = Aggregator::Identity;
    config.search.solver = SolverKind::RandomSearch;
    let result = NestedEvaluator::new(config)
        .unwrap()
        .evaluate(&hundred_samples())
        .unwrap();

    let Aggregated::Identity(values) = &result.aggregated else {
        panic!("expected identity aggregation");
    };
    assert_eq!(values.len(), 5);
    assert_eq!(values, &result.folds);

    let columns = ResultReporter::new(&result).unzip();
    assert_eq!(columns.scores.len(), 5);
    assert_eq!(columns.params["C"].len(), 5);
    assert_eq!(columns.params["log_gamma"].len(), 5);
}

#[test]
fn test_csv_prepare_evaluate_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("digits.csv");
    let mut csv = String::from("f0,f1,class\n");
    let mut rng = StdRng::seed_from_u64(8);
    for class in [7u32, 8, 9] {
        for _ in 0..20 {
            let centre = f64::from(class) - 8.0;
            csv.push_str(&format!(
                "{},{},{class}\n",
                centre * 2.0 + standard_normal(&mut rng),
                standard_normal(&mut rng)
            ));
        }
    }
    std::fs::write(&path, csv).unwrap();

    let dataset: LabeledDataset = CsvSource::new(&path).load().unwrap();
    assert_eq!(dataset.distinct_classes(), vec![7, 8, 9]);

    let preparer = DatasetPreparer {
        positive_class: 8,
        negative_class: 9,
        noise_scale: 0.1,
    };
    let samples = preparer
        .prepare(&dataset, &mut StdRng::seed_from_u64(1))
        .unwrap();
    assert_eq!(samples.len(), 40);
    assert_eq!(samples.n_positive(), 20);

    let mut config = fast_config(2);
    config.outer.num_folds = 4;
    let result = NestedEvaluator::new(config).unwrap().evaluate(&samples).unwrap();
    let reporter = ResultReporter::new(&result);
    let summary = reporter.summary().unwrap();
    assert_eq!(summary.count, 4);
    assert!(summary.min <= summary.mean && summary.mean <= summary.max);
    assert!(reporter.render_table().unwrap().contains("over 4 folds"));
    assert!(reporter.to_json().unwrap().contains("\"seed\": 42"));
}

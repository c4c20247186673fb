//! End-to-end tests for c45-tree: train, persist, reload and predict.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use c45_tree::{
    C45Config, FeatureType, FeatureTypes, Instance, Model, Node, UNKNOWN_BRANCH, batch_predict,
    train,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn types(entries: &[(&str, FeatureType)]) -> FeatureTypes {
    entries
        .iter()
        .map(|(name, ty)| (name.to_string(), *ty))
        .collect()
}

fn buyers() -> (Vec<Instance>, Vec<String>, FeatureTypes) {
    let rows = vec![
        Instance::new().with("age", 25).with("income", "low").with("buys", "no"),
        Instance::new().with("age", 45).with("income", "high").with("buys", "yes"),
        Instance::new().with("age", 50).with("income", "high").with("buys", "yes"),
        Instance::new().with("age", 23).with("income", "low").with("buys", "no"),
    ];
    let types = types(&[
        ("age", FeatureType::Numerical),
        ("income", FeatureType::Categorical),
        ("buys", FeatureType::Categorical),
    ]);
    (rows, names(&["age", "income", "buys"]), types)
}

/// 400 rows: `weather` and a noisy `temp` decide `play`; `noise` is random.
fn synthetic(seed: u64) -> (Vec<Instance>, Vec<String>, FeatureTypes) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let weathers = ["sunny", "rainy", "cloudy"];
    let rows = (0..400)
        .map(|i| {
            let weather = weathers[i % 3];
            let temp = rng.r#gen::<f64>() * 40.0;
            let play = match weather {
                "rainy" => "no",
                "cloudy" => "yes",
                _ if temp > 20.0 => "no",
                _ => "yes",
            };
            Instance::new()
                .with("weather", weather)
                .with("temp", temp)
                .with("noise", rng.r#gen::<f64>())
                .with("play", play)
        })
        .collect();
    let types = types(&[
        ("weather", FeatureType::Categorical),
        ("temp", FeatureType::Numerical),
        ("noise", FeatureType::Numerical),
        ("play", FeatureType::Categorical),
    ]);
    (rows, names(&["weather", "temp", "noise", "play"]), types)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn buyers_scenario_predicts_by_age_and_income() {
    let (rows, names, types) = buyers();
    let model = train(&rows, &names, "buys", &types, &[], 2).unwrap();

    let young = Instance::new().with("age", 24).with("income", "low");
    let older = Instance::new().with("age", 48).with("income", "high");
    assert_eq!(model.predict_class(&young), "no");
    assert_eq!(model.predict_class(&older), "yes");
}

#[test]
fn synthetic_training_accuracy() {
    let (rows, names, types) = synthetic(42);
    let model = C45Config::new().fit(&rows, &names, "play", &types).unwrap();

    let predictions = model.batch_predict(&rows);
    let correct = predictions
        .iter()
        .zip(&rows)
        .filter(|(p, row)| Some(p.label.clone()) == row.category("play"))
        .count();
    let accuracy = correct as f64 / rows.len() as f64;
    assert!(accuracy > 0.95, "training accuracy {accuracy} <= 0.95");
    assert_eq!(model.root().feature(), Some("weather"));
}

#[test]
fn excluded_features_never_appear_in_tree() {
    let (rows, names, types) = synthetic(7);
    let model = train(&rows, &names, "play", &types, &names[..1], 20).unwrap();

    fn features(node: &Node, out: &mut Vec<String>) {
        if let Some(f) = node.feature() {
            out.push(f.to_owned());
        }
        for child in node.children() {
            features(child, out);
        }
    }
    let mut used = Vec::new();
    features(model.root(), &mut used);
    assert!(!used.is_empty());
    assert!(used.iter().all(|f| f != "weather" && f != "play"));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn encode_decode_preserves_tree_and_predictions() {
    let (rows, names, types) = synthetic(3);
    let model = C45Config::new().fit(&rows, &names, "play", &types).unwrap();

    let decoded = Model::from_json(&model.to_json().unwrap()).unwrap();
    assert_eq!(decoded, model);
    assert_eq!(decoded.feature_names(), model.feature_names());
    assert_eq!(decoded.target_name(), "play");
    assert_eq!(batch_predict(&decoded, &rows), batch_predict(&model, &rows));
}

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("buyers.json");
    let (rows, names, types) = buyers();
    let model = train(&rows, &names, "buys", &types, &[], 5).unwrap();

    model.save(&path).unwrap();
    let loaded = Model::load(&path).unwrap();
    assert_eq!(loaded.n_nodes(), model.n_nodes());
    assert_eq!(loaded.depth(), model.depth());
    assert_eq!(loaded.root(), model.root());
}

// ---------------------------------------------------------------------------
// Robustness
// ---------------------------------------------------------------------------

#[test]
fn missing_root_feature_never_fails() {
    let (rows, names, types) = synthetic(11);
    let model = C45Config::new().fit(&rows, &names, "play", &types).unwrap();
    let root_feature = model.root().feature().unwrap().to_owned();

    let row = Instance::new().with("temp", 10.0).with("noise", 0.5);
    assert!(row.get(&root_feature).is_none());
    let p = model.predict(&row);
    assert!(!p.label.is_empty());
    assert!((0.0..=1.0).contains(&p.confidence));

    let leaf_classes: Vec<&str> = model
        .root()
        .children()
        .iter()
        .filter(|c| c.is_leaf())
        .filter_map(Node::class)
        .collect();
    if leaf_classes.is_empty() {
        assert_eq!(p.label, "unknown");
    } else {
        assert!(leaf_classes.contains(&p.label.as_str()));
    }
}

#[test]
fn unseen_category_uses_unknown_branch() {
    let mut rows = Vec::new();
    for _ in 0..4 {
        rows.push(Instance::new().with("color", "red").with("y", "warm"));
        rows.push(Instance::new().with("color", "blue").with("y", "cold"));
    }
    rows.push(Instance::new().with("y", "cold"));
    let types = types(&[
        ("color", FeatureType::Categorical),
        ("y", FeatureType::Categorical),
    ]);
    let model = train(&rows, &names(&["color", "y"]), "y", &types, &[], 5).unwrap();
    assert!(
        model
            .root()
            .children()
            .iter()
            .any(|c| c.value() == Some(UNKNOWN_BRANCH))
    );

    let p = model.predict(&Instance::new().with("color", "green"));
    assert_eq!(p.label, "cold");
}

#[test]
fn batch_output_matches_single_predictions_in_order() {
    let (rows, names, types) = synthetic(5);
    let model = C45Config::new().fit(&rows, &names, "play", &types).unwrap();

    let batch = model.batch_predict(&rows);
    assert_eq!(batch.len(), rows.len());
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(batch[i], model.predict(row), "row {i}");
    }
}

#[test]
fn dates_split_as_epoch_seconds() {
    use chrono::NaiveDate;

    let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
    let rows: Vec<Instance> = (1..=10)
        .map(|d| {
            Instance::new()
                .with("when", day(d))
                .with("season", if d <= 5 { "early" } else { "late" })
        })
        .collect();
    let types = types(&[
        ("when", FeatureType::Date),
        ("season", FeatureType::Categorical),
    ]);
    let model = train(&rows, &names(&["when", "season"]), "season", &types, &[], 5).unwrap();
    assert_eq!(model.root().feature(), Some("when"));
    assert_eq!(model.predict_class(&Instance::new().with("when", day(2))), "early");
    assert_eq!(model.predict_class(&Instance::new().with("when", day(9))), "late");
}

#[test]
fn timestamps_split_as_epoch_seconds() {
    use chrono::{DateTime, TimeZone, Utc};

    let at = |hour: u32| -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 17, 43).unwrap()
    };
    let rows: Vec<Instance> = (0..12)
        .map(|h| {
            Instance::new()
                .with("seen", at(h))
                .with("shift", if h < 6 { "night" } else { "day" })
        })
        .collect();
    let types = types(&[
        ("seen", FeatureType::Timestamp),
        ("shift", FeatureType::Categorical),
    ]);
    let model = train(&rows, &names(&["seen", "shift"]), "shift", &types, &[], 5).unwrap();

    let root = model.root();
    assert_eq!(root.feature(), Some("seen"));
    let Node::Decision { threshold, .. } = root else {
        panic!("root is a leaf");
    };
    let boundary = (at(5).timestamp() + at(6).timestamp()) as f64 / 2.0;
    assert_eq!(*threshold, boundary);

    let decoded = Model::from_json(&model.to_json().unwrap()).unwrap();
    assert_eq!(decoded, model);
    for (hour, expected) in [(1, "night"), (5, "night"), (6, "day"), (11, "day")] {
        let row = Instance::new().with("seen", at(hour));
        assert_eq!(decoded.predict_class(&row), expected, "hour {hour}");
    }
}

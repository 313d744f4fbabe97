//! Zone risk regression model.
//!
//! A CART regression tree over `(latitude, longitude)` trained offline on the
//! zone reference table and shipped as a JSON artifact. It answers for
//! coordinates that are not in the survey.
//!
//! Splits minimize the summed squared error of the two children; candidate
//! thresholds are midpoints between consecutive distinct feature values and
//! a sample goes left when `value <= threshold`.
//!
//! Training holds out a seeded fraction of the rows for evaluation and
//! records how much each feature reduced the squared error.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::model::{AlertError, Coordinate};

/// Anything that can turn a coordinate into a continuous zone risk score.
pub trait RiskModel: Send + Sync {
    fn predict(&self, coordinate: &Coordinate) -> f64;

    /// Share of the training error reduction attributed to each feature.
    fn feature_importances(&self) -> &[FeatureImportance] {
        &[]
    }
}

// ---------------------------------------------------------------------------
// Tree structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Latitude,
    Longitude,
}

impl Feature {
    const ALL: [Feature; 2] = [Feature::Latitude, Feature::Longitude];

    fn index(&self) -> usize {
        match self {
            Feature::Latitude => 0,
            Feature::Longitude => 1,
        }
    }

    fn of(&self, coordinate: &Coordinate) -> f64 {
        match self {
            Feature::Latitude => coordinate.latitude,
            Feature::Longitude => coordinate.longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: Feature,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TreeParams {
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(AlertError::Config(format!(
                "model needs min_samples_leaf >= 1 and min_samples_split >= 2, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: Feature,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

impl RegressionTree {
    /// Fits a tree to `(coordinate, score)` samples.
    pub fn fit(samples: &[(Coordinate, f64)], params: &TreeParams) -> Result<Self, AlertError> {
        Self::fit_with_importances(samples, params).map(|(tree, _)| tree)
    }

    /// Fits a tree and reports each feature's share of the total squared
    /// error removed by its splits. Shares sum to 1, or are all zero when
    /// the tree is a single leaf.
    pub fn fit_with_importances(
        samples: &[(Coordinate, f64)],
        params: &TreeParams,
    ) -> Result<(Self, Vec<FeatureImportance>), AlertError> {
        params.validate()?;
        if samples.is_empty() {
            return Err(AlertError::Parse("cannot train on an empty dataset".to_string()));
        }
        if samples.iter().any(|(c, y)| !y.is_finite() || c.validate().is_err()) {
            return Err(AlertError::Parse("training samples must be finite".to_string()));
        }

        let indices: Vec<usize> = (0..samples.len()).collect();
        let mut reduction = [0.0; 2];
        let root = build(samples, indices, 0, params, &mut reduction);

        let total: f64 = reduction.iter().sum();
        let importances = Feature::ALL
            .iter()
            .map(|&feature| FeatureImportance {
                feature,
                importance: if total > 0.0 { reduction[feature.index()] / total } else { 0.0 },
            })
            .collect();
        Ok((Self { root }, importances))
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }

    pub fn leaf_count(&self) -> usize {
        fn leaves(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        leaves(&self.root)
    }
}

impl RiskModel for RegressionTree {
    fn predict(&self, coordinate: &Coordinate) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value, .. } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    node = if feature.of(coordinate) <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn mean(samples: &[(Coordinate, f64)], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| samples[i].1).sum::<f64>() / indices.len() as f64
}

fn sse(samples: &[(Coordinate, f64)], indices: &[usize]) -> f64 {
    let m = mean(samples, indices);
    indices.iter().map(|&i| (samples[i].1 - m).powi(2)).sum()
}

struct BestSplit {
    feature: Feature,
    threshold: f64,
    error: f64,
}

fn build(
    samples: &[(Coordinate, f64)],
    indices: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    reduction: &mut [f64; 2],
) -> Node {
    let leaf = |indices: &[usize]| Node::Leaf {
        value: mean(samples, indices),
        samples: indices.len(),
    };

    let parent_error = sse(samples, &indices);
    if depth >= params.max_depth || indices.len() < params.min_samples_split || parent_error <= 1e-12 {
        return leaf(&indices);
    }

    let Some(best) = best_split(samples, &indices, params) else {
        return leaf(&indices);
    };
    if best.error >= parent_error {
        return leaf(&indices);
    }

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| best.feature.of(&samples[i].0) <= best.threshold);
    if left.is_empty() || right.is_empty() {
        // Midpoint rounded onto one of two adjacent floats.
        let all: Vec<usize> = left.into_iter().chain(right).collect();
        return leaf(&all);
    }

    reduction[best.feature.index()] += parent_error - best.error;
    Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(build(samples, left, depth + 1, params, reduction)),
        right: Box::new(build(samples, right, depth + 1, params, reduction)),
    }
}

fn best_split(samples: &[(Coordinate, f64)], indices: &[usize], params: &TreeParams) -> Option<BestSplit> {
    let n = indices.len();
    let mut best: Option<BestSplit> = None;

    for feature in Feature::ALL {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| feature.of(&samples[a].0).total_cmp(&feature.of(&samples[b].0)));

        let total_sum: f64 = sorted.iter().map(|&i| samples[i].1).sum();
        let total_sq: f64 = sorted.iter().map(|&i| samples[i].1.powi(2)).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for split in 1..n {
            let y = samples[sorted[split - 1]].1;
            left_sum += y;
            left_sq += y * y;

            let lo = feature.of(&samples[sorted[split - 1]].0);
            let hi = feature.of(&samples[sorted[split]].0);
            if lo == hi || split < params.min_samples_leaf || n - split < params.min_samples_leaf {
                continue;
            }

            let left_n = split as f64;
            let right_n = (n - split) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let error = (left_sq - left_sum * left_sum / left_n) + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().is_none_or(|b| error < b.error) {
                best = Some(BestSplit {
                    feature,
                    threshold: (lo + hi) / 2.0,
                    error,
                });
            }
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Seeded train/test partition of the zone table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldoutSplit {
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for HoldoutSplit {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

impl HoldoutSplit {
    pub fn validate(&self) -> Result<(), AlertError> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(AlertError::Config(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }

    /// Number of held-out rows for a table of `rows`: the fraction rounded
    /// up, always leaving at least one row to train on.
    pub fn test_rows(&self, rows: usize) -> usize {
        let wanted = (rows as f64 * self.test_fraction).ceil() as usize;
        wanted.min(rows.saturating_sub(1))
    }
}

/// Shuffles the samples with the split's seed and returns `(train, test)`.
/// The same seed and input always give the same partition.
pub fn train_test_split(
    samples: &[(Coordinate, f64)],
    split: &HoldoutSplit,
) -> (Vec<(Coordinate, f64)>, Vec<(Coordinate, f64)>) {
    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.shuffle(&mut StdRng::seed_from_u64(split.seed));

    let (test, train) = order.split_at(split.test_rows(samples.len()));
    let pick = |idx: &[usize]| idx.iter().map(|&i| samples[i]).collect::<Vec<_>>();
    (pick(train), pick(test))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub samples: usize,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Mean squared error and coefficient of determination of `model` on
/// `samples`. R² is reported as 1.0 when the targets have no variance and
/// the model reproduces them exactly, 0.0 otherwise.
pub fn evaluate(model: &dyn RiskModel, samples: &[(Coordinate, f64)]) -> FitMetrics {
    if samples.is_empty() {
        return FitMetrics { samples: 0, mse: 0.0, rmse: 0.0, r2: 0.0 };
    }
    let n = samples.len() as f64;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
    let ss_res: f64 = samples.iter().map(|(c, y)| (y - model.predict(c)).powi(2)).sum();
    let ss_tot: f64 = samples.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();
    let mse = ss_res / n;
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    FitMetrics {
        samples: samples.len(),
        mse,
        rmse: mse.sqrt(),
        r2,
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// The trained model as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub features: Vec<Feature>,
    pub target: String,
    pub params: TreeParams,
    pub training_rows: usize,
    pub trained_at: DateTime<Utc>,
    #[serde(default)]
    pub split: Option<HoldoutSplit>,
    /// Metrics on the held-out rows, when any were held out.
    #[serde(default)]
    pub holdout: Option<FitMetrics>,
    #[serde(default)]
    pub feature_importances: Vec<FeatureImportance>,
    pub tree: RegressionTree,
}

impl ModelArtifact {
    /// Trains on every sample.
    pub fn train(samples: &[(Coordinate, f64)], params: TreeParams) -> Result<Self, AlertError> {
        let (tree, feature_importances) = RegressionTree::fit_with_importances(samples, &params)?;
        Ok(Self {
            features: Feature::ALL.to_vec(),
            target: "riesgo_zona_score".to_string(),
            params,
            training_rows: samples.len(),
            trained_at: Utc::now(),
            split: None,
            holdout: None,
            feature_importances,
            tree,
        })
    }

    /// Trains on the training side of a seeded split and evaluates on the
    /// held-out side.
    pub fn train_with_holdout(
        samples: &[(Coordinate, f64)],
        params: TreeParams,
        split: HoldoutSplit,
    ) -> Result<Self, AlertError> {
        split.validate()?;
        let (train, test) = train_test_split(samples, &split);
        let mut artifact = Self::train(&train, params)?;
        artifact.split = Some(split);
        artifact.holdout = (!test.is_empty()).then(|| evaluate(&artifact.tree, &test));
        Ok(artifact)
    }

    /// Reads an artifact. Any failure is `ModelUnavailable`.
    pub fn load(path: &Path) -> Result<Self, AlertError> {
        let unavailable = |reason: String| AlertError::ModelUnavailable {
            path: path.display().to_string(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| unavailable(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), AlertError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AlertError::Persistence(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AlertError::Persistence(e.to_string()))?;
        }
        fs::write(path, json).map_err(|e| AlertError::Persistence(format!("{}: {}", path.display(), e)))
    }
}

impl RiskModel for ModelArtifact {
    fn predict(&self, coordinate: &Coordinate) -> f64 {
        self.tree.predict(coordinate)
    }

    fn feature_importances(&self) -> &[FeatureImportance] {
        &self.feature_importances
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_samples() -> Vec<(Coordinate, f64)> {
        // West half of the grid is high risk, east half low risk.
        let mut samples = Vec::new();
        for i in 0..5 {
            for j in 0..6 {
                let lat = 19.40 + i as f64 * 0.05;
                let lon = -99.30 + j as f64 * 0.06;
                let score = if lon < -99.10 { 74.6 } else { 39.2 };
                samples.push((Coordinate::new(lat, lon), score));
            }
        }
        samples
    }

    #[test]
    fn test_constant_target_yields_single_leaf() {
        let samples = vec![
            (Coordinate::new(19.4, -99.1), 50.0),
            (Coordinate::new(19.5, -99.2), 50.0),
        ];
        let tree = RegressionTree::fit(&samples, &TreeParams::default()).unwrap();
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.predict(&Coordinate::new(0.0, 0.0)), 50.0);
    }

    #[test]
    fn test_tree_separates_clean_longitude_split() {
        let samples = grid_samples();
        let tree = RegressionTree::fit(&samples, &TreeParams::default()).unwrap();
        assert_eq!(tree.depth(), 1, "one split should separate the two halves");
        assert!((tree.predict(&Coordinate::new(19.5, -99.25)) - 74.6).abs() < 1e-9);
        assert!((tree.predict(&Coordinate::new(19.5, -99.00)) - 39.2).abs() < 1e-9);
        match tree.root() {
            Node::Split { feature, .. } => assert_eq!(*feature, Feature::Longitude),
            other => panic!("expected a split at the root, got {:?}", other),
        }
    }

    #[test]
    fn test_training_reproduces_training_targets_when_unconstrained() {
        let samples = vec![
            (Coordinate::new(19.40, -99.10), 39.2),
            (Coordinate::new(19.45, -99.12), 61.6),
            (Coordinate::new(19.50, -99.14), 74.6),
            (Coordinate::new(19.55, -99.16), 43.5),
        ];
        let tree = RegressionTree::fit(&samples, &TreeParams::default()).unwrap();
        let metrics = evaluate(&tree, &samples);
        assert!(metrics.mse < 1e-9, "unconstrained tree should interpolate, mse={}", metrics.mse);
        assert!((metrics.r2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let samples: Vec<_> = (0..32)
            .map(|i| (Coordinate::new(19.35 + i as f64 * 0.005, -99.1), i as f64))
            .collect();
        let params = TreeParams { max_depth: 2, ..TreeParams::default() };
        let tree = RegressionTree::fit(&samples, &params).unwrap();
        assert!(tree.depth() <= 2);
        assert!(tree.leaf_count() <= 4);
    }

    #[test]
    fn test_min_samples_leaf_is_respected() {
        fn check(node: &Node, min: usize) {
            match node {
                Node::Leaf { samples, .. } => assert!(*samples >= min, "leaf with {} samples", samples),
                Node::Split { left, right, .. } => {
                    check(left, min);
                    check(right, min);
                }
            }
        }
        let samples: Vec<_> = (0..20)
            .map(|i| (Coordinate::new(19.4, -99.3 + i as f64 * 0.01), (i % 7) as f64 * 10.0))
            .collect();
        let params = TreeParams { min_samples_leaf: 3, ..TreeParams::default() };
        let tree = RegressionTree::fit(&samples, &params).unwrap();
        check(tree.root(), 3);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let tree = RegressionTree::fit(&grid_samples(), &TreeParams::default()).unwrap();
        let probe = Coordinate::new(40.7128, -74.0060);
        let first = tree.predict(&probe);
        for _ in 0..10 {
            assert_eq!(tree.predict(&probe), first);
        }
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        assert!(RegressionTree::fit(&[], &TreeParams::default()).is_err());
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let params = TreeParams { min_samples_leaf: 0, ..TreeParams::default() };
        assert!(RegressionTree::fit(&grid_samples(), &params).is_err());
    }

    #[test]
    fn test_artifact_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("modelo.json");
        let artifact = ModelArtifact::train(&grid_samples(), TreeParams::default()).unwrap();
        artifact.save(&path).expect("save should succeed");

        let loaded = ModelArtifact::load(&path).expect("load should succeed");
        assert_eq!(loaded.training_rows, 30);
        let probe = Coordinate::new(19.47, -99.2);
        assert_eq!(loaded.predict(&probe), artifact.predict(&probe));
    }

    #[test]
    fn test_reloaded_thresholds_are_exact() {
        fn thresholds(node: &Node, out: &mut Vec<f64>) {
            if let Node::Split { threshold, left, right, .. } = node {
                out.push(*threshold);
                thresholds(left, out);
                thresholds(right, out);
            }
        }
        // Coordinates with ten decimals give midpoints that need all 17
        // significant digits to survive a JSON round trip.
        let samples: Vec<_> = (0..12)
            .map(|i| {
                let coordinate = Coordinate::new(19.5041017692 + i as f64 * 0.0013717, -99.0986932319 - i as f64 * 0.0021);
                (coordinate, (i * 37 % 11) as f64 * 9.1)
            })
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelo.json");
        let artifact = ModelArtifact::train(&samples, TreeParams::default()).unwrap();
        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        let mut before = Vec::new();
        let mut after = Vec::new();
        thresholds(artifact.tree.root(), &mut before);
        thresholds(loaded.tree.root(), &mut after);
        assert!(!before.is_empty());
        assert_eq!(before, after, "split thresholds must reload bit for bit");
        for threshold in before {
            let at_split = Coordinate::new(threshold, threshold);
            assert_eq!(loaded.predict(&at_split), artifact.predict(&at_split));
        }
    }

    #[test]
    fn test_importances_follow_the_splitting_feature() {
        let (_, importances) = RegressionTree::fit_with_importances(&grid_samples(), &TreeParams::default()).unwrap();
        assert_eq!(importances.len(), 2);
        assert_eq!(importances[0].feature, Feature::Latitude);
        assert_eq!(importances[0].importance, 0.0, "latitude never splits the grid");
        assert_eq!(importances[1].feature, Feature::Longitude);
        assert!((importances[1].importance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_importances_are_zero_for_a_single_leaf() {
        let samples = vec![(Coordinate::new(19.4, -99.1), 50.0), (Coordinate::new(19.5, -99.2), 50.0)];
        let (_, importances) = RegressionTree::fit_with_importances(&samples, &TreeParams::default()).unwrap();
        assert!(importances.iter().all(|f| f.importance == 0.0));
    }

    #[test]
    fn test_mixed_importances_sum_to_one() {
        let samples: Vec<_> = (0..40)
            .map(|i| {
                let lat = 19.40 + (i % 8) as f64 * 0.03;
                let lon = -99.30 + (i / 8) as f64 * 0.07;
                (Coordinate::new(lat, lon), lat * 100.0 + (lon + 99.3) * 40.0)
            })
            .collect();
        let (_, importances) = RegressionTree::fit_with_importances(&samples, &TreeParams::default()).unwrap();
        let total: f64 = importances.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-9, "importances sum to {}", total);
        assert!(importances.iter().all(|f| f.importance > 0.0));
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let samples = grid_samples();
        let split = HoldoutSplit::default();
        let (train, test) = train_test_split(&samples, &split);
        assert_eq!(test.len(), 6, "20% of 30 rows");
        assert_eq!(train.len(), 24);
        assert!(test.iter().all(|t| !train.contains(t)));

        let (train_again, test_again) = train_test_split(&samples, &split);
        assert_eq!(train, train_again);
        assert_eq!(test, test_again);

        let (_, other) = train_test_split(&samples, &HoldoutSplit { seed: 7, ..split });
        assert_ne!(test, other, "a different seed should pick different rows");
    }

    #[test]
    fn test_split_keeps_a_training_row() {
        let split = HoldoutSplit { test_fraction: 0.9, seed: 1 };
        assert_eq!(split.test_rows(1), 0);
        assert_eq!(split.test_rows(2), 1);
        assert_eq!(HoldoutSplit { test_fraction: 0.0, seed: 1 }.test_rows(50), 0);
        assert_eq!(HoldoutSplit::default().test_rows(60), 12);
    }

    #[test]
    fn test_invalid_test_fraction_is_rejected() {
        for fraction in [-0.1, 1.0, f64::NAN] {
            let split = HoldoutSplit { test_fraction: fraction, seed: 42 };
            assert!(split.validate().is_err(), "{} should be rejected", fraction);
            assert!(ModelArtifact::train_with_holdout(&grid_samples(), TreeParams::default(), split).is_err());
        }
    }

    #[test]
    fn test_train_with_holdout_reports_held_out_metrics() {
        let artifact =
            ModelArtifact::train_with_holdout(&grid_samples(), TreeParams::default(), HoldoutSplit::default()).unwrap();
        assert_eq!(artifact.training_rows, 24);
        assert_eq!(artifact.split, Some(HoldoutSplit::default()));
        let holdout = artifact.holdout.expect("six rows were held out");
        assert_eq!(holdout.samples, 6);
        assert!(holdout.mse < 1e-9, "the grid is separable by one split, mse={}", holdout.mse);
        assert_eq!(RiskModel::feature_importances(&artifact).len(), 2);
    }

    #[test]
    fn test_zero_test_fraction_has_no_holdout() {
        let split = HoldoutSplit { test_fraction: 0.0, seed: 42 };
        let artifact = ModelArtifact::train_with_holdout(&grid_samples(), TreeParams::default(), split).unwrap();
        assert_eq!(artifact.training_rows, 30);
        assert!(artifact.holdout.is_none());
    }

    #[test]
    fn test_artifact_without_evaluation_fields_still_loads() {
        let artifact = ModelArtifact::train(&grid_samples(), TreeParams::default()).unwrap();
        let mut json = serde_json::to_value(&artifact).unwrap();
        let object = json.as_object_mut().unwrap();
        object.remove("split");
        object.remove("holdout");
        object.remove("feature_importances");
        let loaded: ModelArtifact = serde_json::from_value(json).unwrap();
        assert!(loaded.feature_importances.is_empty());
        assert_eq!(loaded.tree, artifact.tree);
    }

    #[test]
    fn test_missing_artifact_is_model_unavailable() {
        match ModelArtifact::load(Path::new("/no/such/modelo.json")) {
            Err(AlertError::ModelUnavailable { .. }) => {}
            other => panic!("expected ModelUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_artifact_is_model_unavailable() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "{ not json").unwrap();
        assert!(matches!(
            ModelArtifact::load(file.path()),
            Err(AlertError::ModelUnavailable { .. })
        ));
    }
}

//! Gradient-boosted tree classifier read from XGBoost's native JSON model
//! format (the output of `Booster.save_model("model.json")`).
//!
//! Only the parts needed for binary probability output are supported:
//! `gbtree`/`dart` boosters, numerical splits and a logistic objective.

use std::{fs, io, path::Path};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ModelLoadError;

use super::Classifier;

const SUPPORTED_OBJECTIVES: [&str; 2] = ["binary:logistic", "reg:logistic"];

#[derive(Debug, Clone)]
pub struct XgboostClassifier {
    feature_names: Vec<String>,
    trees: Vec<Tree>,
    /// Per-tree weight; all 1.0 except for dart boosters.
    weights: Vec<f64>,
    base_margin: f64,
}

impl XgboostClassifier {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ModelLoadError::NotFound(path.to_path_buf()),
            _ => ModelLoadError::Io { path: path.to_path_buf(), source },
        })?;

        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelLoadError> {
        let raw: RawModel = serde_json::from_str(json).map_err(|e| ModelLoadError::Corrupt(e.to_string()))?;
        let learner = raw.learner;

        let objective = learner.objective.name.as_str();
        if !SUPPORTED_OBJECTIVES.contains(&objective) {
            return Err(ModelLoadError::Unsupported(format!(
                "objective '{objective}' (expected one of {SUPPORTED_OBJECTIVES:?})"
            )));
        }

        if let Some(num_class) = learner.learner_model_param.num_class.as_deref() {
            let n: u32 = num_class
                .parse()
                .map_err(|_| ModelLoadError::Corrupt(format!("num_class '{num_class}' is not an integer")))?;
            if n > 1 {
                return Err(ModelLoadError::Unsupported(format!("multi-class model with {n} classes")));
            }
        }

        if learner.feature_names.is_empty() {
            return Err(ModelLoadError::MissingSchema);
        }

        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let (model, weights) = learner.gradient_booster.into_trees()?;

        let num_features = learner.feature_names.len();
        let trees_per_round = model.trees_per_round()?;
        let mut trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| Tree::from_raw(raw, num_features).map_err(|e| tree_error(idx, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut weights = weights.unwrap_or_else(|| vec![1.0; trees.len()]);
        if weights.len() != trees.len() {
            return Err(ModelLoadError::Corrupt(format!(
                "{} tree weights for {} trees",
                weights.len(),
                trees.len()
            )));
        }

        // Early-stopped models keep the trees grown after the best round;
        // prediction only uses rounds up to and including it.
        if let Some(best) = learner.attributes.best_iteration.as_deref() {
            let best: usize = best
                .trim()
                .parse()
                .map_err(|_| ModelLoadError::Corrupt(format!("best_iteration '{best}' is not an integer")))?;
            let keep = (best + 1).saturating_mul(trees_per_round);
            if keep < trees.len() {
                info!(best_iteration = best, kept = keep, dropped = trees.len() - keep, "truncating to best iteration");
                trees.truncate(keep);
                weights.truncate(keep);
            }
        }

        debug!(trees = trees.len(), features = num_features, objective, "xgboost model parsed");

        Ok(Self {
            feature_names: learner.feature_names,
            trees,
            weights,
            base_margin: logit(base_score),
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Untransformed model output for one row.
    pub fn margin(&self, row: &[f64]) -> f64 {
        self.trees
            .iter()
            .zip(&self.weights)
            .map(|(tree, w)| w * tree.leaf_value(row))
            .sum::<f64>()
            + self.base_margin
    }
}

impl Classifier for XgboostClassifier {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.margin(row))
    }
}

fn tree_error(idx: usize, error: ModelLoadError) -> ModelLoadError {
    match error {
        ModelLoadError::Corrupt(msg) => ModelLoadError::Corrupt(format!("tree {idx}: {msg}")),
        ModelLoadError::Unsupported(msg) => ModelLoadError::Unsupported(format!("tree {idx}: {msg}")),
        other => other,
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Accepts both `"5E-1"` and the bracketed vector form `"[5E-1]"`.
fn parse_base_score(raw: &str) -> Result<f64, ModelLoadError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    let score: f64 = trimmed
        .parse()
        .map_err(|_| ModelLoadError::Corrupt(format!("base_score '{raw}' is not a number")))?;

    if score <= 0.0 || score >= 1.0 {
        return Err(ModelLoadError::Corrupt(format!(
            "base_score {score} is outside (0, 1) for a logistic objective"
        )));
    }
    Ok(score)
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split { feature: usize, threshold: f32, left: usize, right: usize, default_left: bool },
    Leaf(f64),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: RawTree, num_features: usize) -> Result<Self, ModelLoadError> {
        let n = raw.left_children.len();
        if n == 0 {
            return Err(ModelLoadError::Corrupt("empty tree".into()));
        }
        if raw.right_children.len() != n || raw.split_indices.len() != n || raw.split_conditions.len() != n {
            return Err(ModelLoadError::Corrupt("node arrays differ in length".into()));
        }
        if raw.split_type.iter().any(|t| *t != 0) {
            return Err(ModelLoadError::Unsupported("categorical splits".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let left = raw.left_children[i];
            let right = raw.right_children[i];

            if left == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }

            // Children are always allocated after their parent, which also
            // rules out cycles.
            let child = |c: i64| -> Result<usize, ModelLoadError> {
                usize::try_from(c)
                    .ok()
                    .filter(|c| *c > i && *c < n)
                    .ok_or_else(|| ModelLoadError::Corrupt(format!("node {i} has invalid child {c}")))
            };

            let feature = usize::try_from(raw.split_indices[i])
                .ok()
                .filter(|f| *f < num_features)
                .ok_or_else(|| {
                    ModelLoadError::Corrupt(format!("node {i} splits on unknown feature {}", raw.split_indices[i]))
                })?;

            nodes.push(Node::Split {
                feature,
                threshold: raw.split_conditions[i] as f32,
                left: child(left)?,
                right: child(right)?,
                default_left: raw.default_left.get(i).copied().unwrap_or(false),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split { feature, threshold, left, right, default_left } => {
                    let value = row.get(feature).copied().unwrap_or(f64::NAN);
                    idx = if value.is_nan() {
                        if default_left { left } else { right }
                    } else if (value as f32) < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawModel {
    learner: RawLearner,
}

#[derive(Debug, Deserialize)]
struct RawLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: RawBooster,
    learner_model_param: RawModelParam,
    objective: RawObjective,
    #[serde(default)]
    attributes: RawAttributes,
}

/// Free-form string attributes; only the early-stopping marker is read.
#[derive(Debug, Default, Deserialize)]
struct RawAttributes {
    #[serde(default)]
    best_iteration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObjective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawBooster {
    name: String,
    #[serde(default)]
    model: Option<RawGbtree>,
    /// Present for dart: the wrapped gbtree booster.
    #[serde(default)]
    gbtree: Option<Box<RawBooster>>,
    #[serde(default)]
    weight_drop: Option<Vec<f64>>,
}

impl RawBooster {
    fn into_trees(self) -> Result<(RawGbtree, Option<Vec<f64>>), ModelLoadError> {
        match self.name.as_str() {
            "gbtree" => self
                .model
                .map(|m| (m, None))
                .ok_or_else(|| ModelLoadError::Corrupt("gbtree booster has no model".into())),
            "dart" => {
                let inner = self
                    .gbtree
                    .and_then(|b| b.model)
                    .ok_or_else(|| ModelLoadError::Corrupt("dart booster has no gbtree model".into()))?;
                Ok((inner, self.weight_drop))
            }
            other => Err(ModelLoadError::Unsupported(format!("booster '{other}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawGbtree {
    trees: Vec<RawTree>,
    #[serde(default)]
    gbtree_model_param: Option<RawGbtreeParam>,
}

#[derive(Debug, Deserialize)]
struct RawGbtreeParam {
    #[serde(default)]
    num_parallel_tree: Option<String>,
}

impl RawGbtree {
    /// Trees grown per boosting round; 1 unless the model is a boosted forest.
    fn trees_per_round(&self) -> Result<usize, ModelLoadError> {
        let Some(raw) = self.gbtree_model_param.as_ref().and_then(|p| p.num_parallel_tree.as_deref()) else {
            return Ok(1);
        };

        raw.trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ModelLoadError::Corrupt(format!("num_parallel_tree '{raw}' is not a positive integer")))
    }
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    #[serde(default, deserialize_with = "de_flags")]
    default_left: Vec<bool>,
    #[serde(default)]
    split_type: Vec<i64>,
}

/// Older releases write `default_left` as 0/1 integers, newer ones as booleans.
fn de_flags<'de, D>(deserializer: D) -> Result<Vec<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|v| match v {
            Value::Bool(b) => Ok(b),
            Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
            other => Err(D::Error::custom(format!("invalid default_left flag {other}"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// x0 < 1.0 ? (x1 < 0.5 ? -1.0 : 0.5) : 2.0, missing x0 goes right.
    fn tiny_model(objective: &str, base_score: &str) -> String {
        json!({
            "learner": {
                "feature_names": ["MinTemp", "RainToday"],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "trees": [{
                            "left_children": [1, 3, -1, -1, -1],
                            "right_children": [2, 4, -1, -1, -1],
                            "split_indices": [0, 1, 0, 0, 0],
                            "split_conditions": [1.0, 0.5, 2.0, -1.0, 0.5],
                            "default_left": [false, true, false, false, false],
                            "split_type": [0, 0, 0, 0, 0]
                        }]
                    }
                },
                "learner_model_param": { "base_score": base_score, "num_class": "0" },
                "objective": { "name": objective }
            }
        })
        .to_string()
    }

    #[test]
    fn walks_tree_and_applies_sigmoid() {
        let model = XgboostClassifier::from_json_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        assert_eq!(model.num_trees(), 1);
        assert_eq!(model.feature_names(), &["MinTemp".to_string(), "RainToday".to_string()]);

        assert!((model.margin(&[0.0, 0.0]) - -1.0).abs() < 1e-12);
        assert!((model.margin(&[0.0, 1.0]) - 0.5).abs() < 1e-12);
        assert!((model.margin(&[5.0, 0.0]) - 2.0).abs() < 1e-12);

        let p = model.predict_proba(&[5.0, 0.0]);
        assert!((p - sigmoid(2.0)).abs() < 1e-12);
    }

    #[test]
    fn threshold_is_strict_less_than() {
        let model = XgboostClassifier::from_json_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        assert!((model.margin(&[1.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn missing_values_follow_default_direction() {
        let model = XgboostClassifier::from_json_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        assert!((model.margin(&[f64::NAN, 0.0]) - 2.0).abs() < 1e-12);
        assert!((model.margin(&[0.0, f64::NAN]) - -1.0).abs() < 1e-12);
    }

    #[test]
    fn base_score_shifts_margin() {
        let model = XgboostClassifier::from_json_str(&tiny_model("binary:logistic", "[2.5E-1]")).unwrap();
        let expected = -1.0 + logit(0.25);
        assert!((model.margin(&[0.0, 0.0]) - expected).abs() < 1e-12);
    }

    #[test]
    fn rejects_unsupported_objective() {
        let err = XgboostClassifier::from_json_str(&tiny_model("multi:softprob", "5E-1")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Unsupported(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = XgboostClassifier::from_json_str("not json at all").unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt(_)));
    }

    #[test]
    fn rejects_model_without_feature_names() {
        let mut value: Value = serde_json::from_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        value["learner"].as_object_mut().unwrap().remove("feature_names");

        let err = XgboostClassifier::from_json_str(&value.to_string()).unwrap_err();
        assert!(matches!(err, ModelLoadError::MissingSchema));
    }

    #[test]
    fn rejects_backward_child_links() {
        let mut value: Value = serde_json::from_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        value["learner"]["gradient_booster"]["model"]["trees"][0]["left_children"] = json!([1, 0, -1, -1, -1]);

        let err = XgboostClassifier::from_json_str(&value.to_string()).unwrap_err();
        assert!(err.to_string().contains("tree 0"));
    }

    #[test]
    fn accepts_integer_default_left_flags() {
        let mut value: Value = serde_json::from_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        value["learner"]["gradient_booster"]["model"]["trees"][0]["default_left"] = json!([1, 1, 0, 0, 0]);

        let model = XgboostClassifier::from_json_str(&value.to_string()).unwrap();
        assert!((model.margin(&[f64::NAN, 0.0]) - -1.0).abs() < 1e-12);
    }

    #[test]
    fn dart_weights_scale_leaves() {
        let mut value: Value = serde_json::from_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        let inner = value["learner"]["gradient_booster"].take();
        value["learner"]["gradient_booster"] = json!({
            "name": "dart",
            "gbtree": inner,
            "weight_drop": [0.5]
        });

        let model = XgboostClassifier::from_json_str(&value.to_string()).unwrap();
        assert!((model.margin(&[5.0, 0.0]) - 1.0).abs() < 1e-12);
    }

    /// `tiny_model` plus a second round that always adds 3.0.
    fn two_round_model(attributes: Value, gbtree_param: Value) -> String {
        let mut value: Value = serde_json::from_str(&tiny_model("binary:logistic", "5E-1")).unwrap();
        let model = &mut value["learner"]["gradient_booster"]["model"];
        model["trees"].as_array_mut().unwrap().push(json!({
            "left_children": [-1],
            "right_children": [-1],
            "split_indices": [0],
            "split_conditions": [3.0],
            "default_left": [false],
            "split_type": [0]
        }));
        model["gbtree_model_param"] = gbtree_param;
        value["learner"]["attributes"] = attributes;
        value.to_string()
    }

    #[test]
    fn best_iteration_drops_later_rounds() {
        let all = XgboostClassifier::from_json_str(&two_round_model(json!({}), json!({ "num_parallel_tree": "1" })))
            .unwrap();
        assert_eq!(all.num_trees(), 2);
        assert!((all.margin(&[5.0, 0.0]) - 5.0).abs() < 1e-12);

        let best = XgboostClassifier::from_json_str(&two_round_model(
            json!({ "best_iteration": "0", "best_score": "0.31" }),
            json!({ "num_parallel_tree": "1" }),
        ))
        .unwrap();
        assert_eq!(best.num_trees(), 1);
        assert!((best.margin(&[5.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn best_iteration_counts_parallel_trees_per_round() {
        let model = XgboostClassifier::from_json_str(&two_round_model(
            json!({ "best_iteration": "0" }),
            json!({ "num_parallel_tree": "2" }),
        ))
        .unwrap();
        assert_eq!(model.num_trees(), 2);
    }

    #[test]
    fn rejects_malformed_best_iteration() {
        let err = XgboostClassifier::from_json_str(&two_round_model(json!({ "best_iteration": "soon" }), Value::Null))
            .unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt(msg) if msg.contains("best_iteration")));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = XgboostClassifier::load(Path::new("/definitely/not/here/rain_model.json")).unwrap_err();
        assert!(matches!(err, ModelLoadError::NotFound(_)));
    }
}

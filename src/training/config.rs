//! Training configuration

use super::random_forest::MaxFeatures;
use crate::config::ModelConfig;
use serde::{Deserialize, Serialize};

/// Hyperparameters and split settings for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Target column name
    pub target_column: String,
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum tree depth (None = unlimited)
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Features considered per split
    #[serde(default)]
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample for every tree
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,
    /// Seed shared by the split and the forest
    pub random_state: u64,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Name stored alongside results
    pub model_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            target_column: "quality".to_string(),
            n_estimators: 100,
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: MaxFeatures::All,
            bootstrap: default_bootstrap(),
            random_state: 42,
            test_size: 0.2,
            model_name: "random_forest_regressor".to_string(),
        }
    }
}

impl TrainingConfig {
    /// Create a config for the given target with default hyperparameters
    pub fn new(target_column: impl Into<String>) -> Self {
        Self {
            target_column: target_column.into(),
            ..Default::default()
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }
}

impl From<&ModelConfig> for TrainingConfig {
    fn from(model: &ModelConfig) -> Self {
        Self {
            target_column: model.target_column.clone(),
            n_estimators: model.n_estimators,
            max_depth: model.max_depth,
            min_samples_split: model.min_samples_split,
            min_samples_leaf: model.min_samples_leaf,
            max_features: model.max_features,
            bootstrap: model.bootstrap,
            random_state: model.random_state,
            test_size: model.test_size,
            model_name: model.name.clone(),
        }
    }
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_bootstrap() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    #[test]
    fn test_forest_options_flow_from_model_section() {
        let yaml = r#"
data:
  raw_path: raw.csv
  processed_path: processed.csv
model:
  test_size: 0.25
  random_state: 7
  n_estimators: 30
  min_samples_leaf: 3
  max_features: sqrt
  bootstrap: false
"#;
        let pipeline = PipelineConfig::from_yaml_str(yaml).unwrap();
        let config = TrainingConfig::from(&pipeline.model);
        assert_eq!(config.min_samples_leaf, 3);
        assert_eq!(config.min_samples_split, 2);
        assert_eq!(config.max_features, MaxFeatures::Sqrt);
        assert!(!config.bootstrap);
        assert_eq!(config.n_estimators, 30);
    }

    #[test]
    fn test_older_model_json_gets_forest_defaults() {
        let json = r#"{"target_column":"quality","n_estimators":5,"max_depth":null,
            "random_state":1,"test_size":0.2,"model_name":"rf"}"#;
        let config: TrainingConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_features, MaxFeatures::All);
        assert!(config.bootstrap);
        assert_eq!(config.min_samples_leaf, 1);
    }
}

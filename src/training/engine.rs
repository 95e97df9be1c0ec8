//! Training engine implementation

use super::metrics::r2_score;
use super::random_forest::RandomForest;
use super::split::train_test_split;
use super::TrainingConfig;
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// R² scores of a fitted engine on both partitions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingScores {
    pub train_score: f64,
    pub test_score: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub training_time_secs: f64,
}

/// A forest together with everything needed to reuse it: the ordered feature
/// names, the target, the hyperparameters and the scores from fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainEngine {
    config: TrainingConfig,
    feature_names: Vec<String>,
    model: Option<RandomForest>,
    scores: Option<TrainingScores>,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            feature_names: Vec::new(),
            model: None,
            scores: None,
        }
    }

    /// Split the frame, fit the forest on the train partition and score both partitions.
    pub fn fit(&mut self, df: &DataFrame) -> Result<TrainingScores> {
        let start = Instant::now();

        let (x, y) = self.prepare_data(df)?;
        let split = train_test_split(x.nrows(), self.config.test_size, self.config.random_state)?;
        let (x_train, x_test, y_train, y_test) = split.apply(&x, &y);

        let mut forest = RandomForest::new(self.config.n_estimators)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(self.config.max_features)
            .with_bootstrap(self.config.bootstrap)
            .with_random_state(self.config.random_state);
        if let Some(depth) = self.config.max_depth {
            forest = forest.with_max_depth(depth);
        }
        forest.fit(&x_train, &y_train)?;

        let train_score = r2_score(&y_train, &forest.predict(&x_train)?)?;
        let test_score = r2_score(&y_test, &forest.predict(&x_test)?)?;

        let scores = TrainingScores {
            train_score,
            test_score,
            n_train: x_train.nrows(),
            n_test: x_test.nrows(),
            training_time_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            train_score,
            test_score,
            n_train = scores.n_train,
            n_test = scores.n_test,
            "Model fitted"
        );

        self.model = Some(forest);
        self.scores = Some(scores);
        Ok(scores)
    }

    /// Predict for every row of the frame. The frame must contain all training features.
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or(WineError::ModelNotFitted)?;
        let x = Self::columns_to_array2(df, &self.feature_names)?;
        model.predict(&x)
    }

    /// Predict from a feature matrix already ordered like [`Self::feature_names`].
    pub fn predict_array(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let model = self.model.as_ref().ok_or(WineError::ModelNotFitted)?;
        model.predict(x)
    }

    /// Features and target of a frame, using the fitted feature order.
    pub fn extract_xy(&self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        if !self.is_fitted() {
            return Err(WineError::ModelNotFitted);
        }
        let x = Self::columns_to_array2(df, &self.feature_names)?;
        let y = Self::target_to_array1(df, &self.config.target_column)?;
        Ok((x, y))
    }

    /// Feature importances paired with feature names, in feature order
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let importances = self.model.as_ref()?.feature_importances()?;
        Some(
            self.feature_names
                .iter()
                .cloned()
                .zip(importances.iter().copied())
                .collect(),
        )
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Scores from the last fit
    pub fn scores(&self) -> Option<&TrainingScores> {
        self.scores.as_ref()
    }

    /// Get feature names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn model(&self) -> Option<&RandomForest> {
        self.model.as_ref()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the engine to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load an engine from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn prepare_data(&mut self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        let target = &self.config.target_column;
        let feature_cols: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|s| s.to_string())
            .collect();

        if feature_cols.is_empty() {
            return Err(WineError::DataError("no feature columns besides the target".to_string()));
        }

        let y = Self::target_to_array1(df, target)?;
        let x = Self::columns_to_array2(df, &feature_cols)?;
        self.feature_names = feature_cols;

        Ok((x, y))
    }

    fn target_to_array1(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
        let values = Self::column_values(df, target)?;
        Ok(Array1::from_vec(values))
    }

    /// Extract named columns into a row-major matrix.
    fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let n_cols = col_names.len();

        let col_data: Vec<Vec<f64>> = col_names
            .iter()
            .map(|name| Self::column_values(df, name))
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]))
    }

    /// A column cast to f64. Nulls are an error; cleaning must run first.
    fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let column = df
            .column(name)
            .map_err(|_| WineError::FeatureNotFound(name.to_string()))?;
        let as_f64 = column.cast(&DataType::Float64)?;
        as_f64
            .f64()?
            .into_iter()
            .map(|v| v.ok_or_else(|| WineError::DataError(format!("null value in column '{}'", name))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::MaxFeatures;

    fn create_test_data() -> DataFrame {
        DataFrame::new(vec![
            Column::new("feature1".into(), (1..=30).map(|i| i as f64).collect::<Vec<_>>()),
            Column::new("feature2".into(), (1..=30).map(|i| (i % 4) as f64).collect::<Vec<_>>()),
            Column::new("quality".into(), (1..=30).map(|i| 3.0 * i as f64).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = TrainEngine::new(TrainingConfig::new("quality"));
        assert!(!engine.is_fitted());
        assert!(engine.scores().is_none());
    }

    #[test]
    fn test_fit_predict() {
        let df = create_test_data();
        let config = TrainingConfig::new("quality")
            .with_n_estimators(10)
            .with_test_size(0.5);
        let mut engine = TrainEngine::new(config);

        let scores = engine.fit(&df).unwrap();
        assert_eq!(scores.n_train + scores.n_test, 30);
        assert_eq!(scores.n_test, 15);
        assert!(scores.train_score > 0.9);

        let predictions = engine.predict(&df).unwrap();
        assert_eq!(predictions.len(), 30);
    }

    #[test]
    fn test_feature_names_exclude_target() {
        let df = create_test_data();
        let mut engine = TrainEngine::new(TrainingConfig::new("quality").with_n_estimators(5));
        engine.fit(&df).unwrap();

        assert_eq!(engine.feature_names(), &["feature1".to_string(), "feature2".to_string()]);
        let importances = engine.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
    }

    #[test]
    fn test_missing_target() {
        let df = create_test_data().drop("quality").unwrap();
        let mut engine = TrainEngine::new(TrainingConfig::new("quality"));
        assert!(matches!(engine.fit(&df), Err(WineError::FeatureNotFound(_))));
    }

    #[test]
    fn test_predict_unfitted() {
        let engine = TrainEngine::new(TrainingConfig::default());
        assert!(matches!(engine.predict(&create_test_data()), Err(WineError::ModelNotFitted)));
    }

    #[test]
    fn test_forest_options_reach_the_model() {
        let df = create_test_data();
        let config = TrainingConfig::new("quality")
            .with_n_estimators(6)
            .with_min_samples_leaf(4)
            .with_max_features(MaxFeatures::Fixed(1))
            .with_bootstrap(false);
        let mut engine = TrainEngine::new(config);
        engine.fit(&df).unwrap();

        let forest = engine.model().unwrap();
        assert_eq!(forest.min_samples_leaf, 4);
        assert_eq!(forest.max_features, MaxFeatures::Fixed(1));
        assert!(!forest.bootstrap);
        assert_eq!(forest.compute_max_features(engine.feature_names().len()), 1);
    }

    #[test]
    fn test_json_roundtrip_keeps_predictions() {
        let df = create_test_data();
        let mut engine = TrainEngine::new(TrainingConfig::new("quality").with_n_estimators(4));
        engine.fit(&df).unwrap();

        let restored = TrainEngine::from_json(&engine.to_json().unwrap()).unwrap();
        let before = engine.predict(&df).unwrap();
        let after = restored.predict(&df).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(restored.config(), engine.config());
    }
}

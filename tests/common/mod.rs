//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use wine_quality_pipeline::config::PipelineConfig;

pub const RAW_COLUMNS: [&str; 12] = [
    "fixed acidity",
    "volatile acidity",
    "citric acid",
    "residual sugar",
    "chlorides",
    "free sulfur dioxide",
    "total sulfur dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
    "quality",
];

/// Deterministic wine-like row; quality rises with alcohol and falls with volatile acidity.
pub fn wine_row(i: usize) -> [f64; 12] {
    let alcohol = 8.5 + (i % 40) as f64 * 0.12;
    let volatile = 0.2 + (i % 7) as f64 * 0.1;
    let quality = (3.0 + (alcohol - 8.5) * 1.2 - volatile * 2.0).round().clamp(3.0, 8.0);
    [
        6.0 + (i % 11) as f64 * 0.4,
        volatile,
        (i % 5) as f64 * 0.1,
        1.5 + (i % 9) as f64 * 0.3,
        0.05 + (i % 4) as f64 * 0.01,
        10.0 + (i % 13) as f64,
        30.0 + (i % 17) as f64 * 2.0,
        0.995 + (i % 6) as f64 * 0.0005,
        3.1 + (i % 8) as f64 * 0.05,
        0.5 + (i % 10) as f64 * 0.03,
        alcohol,
        quality,
    ]
}

/// Write `n` rows with the given separator. Rows listed in `blank_rows`
/// get an empty `citric acid` field.
pub fn write_wine_csv(path: &Path, n: usize, separator: char, blank_rows: &[usize]) {
    let mut file = std::fs::File::create(path).unwrap();
    let sep = separator.to_string();
    writeln!(file, "{}", RAW_COLUMNS.join(&sep)).unwrap();
    for i in 0..n {
        let fields: Vec<String> = wine_row(i)
            .iter()
            .enumerate()
            .map(|(j, v)| {
                if j == 2 && blank_rows.contains(&i) {
                    String::new()
                } else {
                    v.to_string()
                }
            })
            .collect();
        writeln!(file, "{}", fields.join(&sep)).unwrap();
    }
}

/// Scratch directory layout for one pipeline run
pub struct Workspace {
    pub dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn raw_path(&self) -> PathBuf {
        self.path("raw/winequality-red.csv")
    }

    pub fn processed_path(&self) -> PathBuf {
        self.path("processed/processed_data.csv")
    }

    pub fn mlruns(&self) -> PathBuf {
        self.path("mlruns")
    }

    pub fn db_path(&self) -> PathBuf {
        self.path("results.db")
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.path("processed/evaluation_plots")
    }

    /// Write the raw semicolon file with `n` rows
    pub fn with_raw_data(self, n: usize, blank_rows: &[usize]) -> Self {
        std::fs::create_dir_all(self.path("raw")).unwrap();
        write_wine_csv(&self.raw_path(), n, ';', blank_rows);
        self
    }

    pub fn config(&self, database_enabled: bool) -> PipelineConfig {
        let yaml = format!(
            r#"
data:
  raw_path: "{raw}"
  processed_path: "{processed}"
model:
  test_size: 0.2
  random_state: 42
  n_estimators: 12
mlflow:
  tracking_uri: "file:{mlruns}"
  experiment_id: "0"
database:
  enabled: {enabled}
  path: "{db}"
evaluation:
  output_dir: "{plots}"
"#,
            raw = self.raw_path().display(),
            processed = self.processed_path().display(),
            mlruns = self.mlruns().display(),
            enabled = database_enabled,
            db = self.db_path().display(),
            plots = self.plots_dir().display(),
        );
        PipelineConfig::from_yaml_str(&yaml).unwrap()
    }
}

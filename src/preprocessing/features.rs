//! Feature engineering

use crate::error::{Result, WineError};
use polars::prelude::*;
use tracing::debug;

/// Source column for the ratio numerator
pub const FIXED_ACIDITY: &str = "fixed acidity";
/// Source column for the ratio denominator
pub const VOLATILE_ACIDITY: &str = "volatile acidity";
/// Engineered column name
pub const ACIDITY_RATIO: &str = "acidity_ratio";
/// Added to the denominator so a zero volatile acidity never divides by zero
pub const ACIDITY_EPSILON: f64 = 1e-5;

/// Find a column by name, treating `_` and ` ` as the same character.
///
/// The raw dataset uses `fixed acidity`, request payloads use `fixed_acidity`.
pub fn resolve_column(df: &DataFrame, name: &str) -> Option<String> {
    let wanted = normalize(name);
    df.get_column_names()
        .into_iter()
        .find(|col| normalize(col.as_str()) == wanted)
        .map(|col| col.to_string())
}

fn normalize(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}

/// Select `names` from the frame in that order, matching names the same way
/// as [`resolve_column`] and renaming each column to the requested name.
pub fn align_columns(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let columns = names
        .iter()
        .map(|name| {
            let source = resolve_column(df, name)
                .ok_or_else(|| WineError::FeatureNotFound(name.clone()))?;
            let mut column = df.column(&source)?.clone();
            column.rename(name.as_str().into());
            Ok(column)
        })
        .collect::<Result<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Add `acidity_ratio = fixed acidity / (volatile acidity + 1e-5)`.
///
/// The frame is returned unchanged when either source column is missing.
/// An existing `acidity_ratio` column is replaced.
pub fn engineer_features(df: &DataFrame) -> Result<DataFrame> {
    let (fixed_name, volatile_name) = match (
        resolve_column(df, FIXED_ACIDITY),
        resolve_column(df, VOLATILE_ACIDITY),
    ) {
        (Some(f), Some(v)) => (f, v),
        _ => {
            debug!("Acidity columns not present, skipping acidity_ratio");
            return Ok(df.clone());
        }
    };

    let fixed = df.column(&fixed_name)?.cast(&DataType::Float64)?;
    let volatile = df.column(&volatile_name)?.cast(&DataType::Float64)?;

    let ratio: Float64Chunked = fixed
        .f64()?
        .into_iter()
        .zip(volatile.f64()?.into_iter())
        .map(|(f, v)| match (f, v) {
            (Some(f), Some(v)) => Some(f / (v + ACIDITY_EPSILON)),
            _ => None,
        })
        .collect();

    let mut out = df.clone();
    out.with_column(ratio.with_name(ACIDITY_RATIO.into()).into_series())?;

    debug!(rows = out.height(), column = ACIDITY_RATIO, "Added engineered feature");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acidity_ratio_value() {
        let df = df!(
            "fixed acidity" => &[7.4],
            "volatile acidity" => &[0.70]
        )
        .unwrap();

        let out = engineer_features(&df).unwrap();
        let ratio = out.column(ACIDITY_RATIO).unwrap().f64().unwrap().get(0).unwrap();
        assert!((ratio - 7.4 / 0.70001).abs() < 1e-9);
        assert!((ratio - 10.571).abs() < 1e-3);
    }

    #[test]
    fn test_missing_source_column_skips_feature() {
        let df = df!("fixed acidity" => &[7.4], "alcohol" => &[9.4]).unwrap();
        let out = engineer_features(&df).unwrap();
        assert!(out.column(ACIDITY_RATIO).is_err());
        assert_eq!(out.width(), 2);
    }

    #[test]
    fn test_underscore_names_resolve() {
        let df = df!(
            "fixed_acidity" => &[7.8],
            "volatile_acidity" => &[0.88]
        )
        .unwrap();
        let out = engineer_features(&df).unwrap();
        assert_eq!(out.width(), 3);
    }

    #[test]
    fn test_rerun_replaces_column() {
        let df = df!(
            "fixed acidity" => &[7.4, 7.8],
            "volatile acidity" => &[0.70, 0.88]
        )
        .unwrap();
        let once = engineer_features(&df).unwrap();
        let twice = engineer_features(&once).unwrap();
        assert_eq!(once.width(), twice.width());
    }

    #[test]
    fn test_align_columns_renames_and_orders() {
        let df = df!(
            "alcohol" => &[9.4],
            "fixed_acidity" => &[7.4]
        )
        .unwrap();
        let names = vec!["fixed acidity".to_string(), "alcohol".to_string()];
        let aligned = align_columns(&df, &names).unwrap();
        let got: Vec<String> = aligned.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(got, names);

        let missing = align_columns(&df, &["density".to_string()]);
        assert!(matches!(missing, Err(WineError::FeatureNotFound(_))));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_per_frame_logging_stays_below_info() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();

        let df = df!("fixed acidity" => &[7.4], "volatile acidity" => &[0.7]).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            engineer_features(&df).unwrap();
        });

        let logged = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(!logged.contains("Added engineered feature"), "{}", logged);
    }

    #[test]
    fn test_zero_volatile_acidity_is_finite() {
        let df = df!(
            "fixed acidity" => &[1.0],
            "volatile acidity" => &[0.0]
        )
        .unwrap();
        let out = engineer_features(&df).unwrap();
        let ratio = out.column(ACIDITY_RATIO).unwrap().f64().unwrap().get(0).unwrap();
        assert!(ratio.is_finite());
        assert!((ratio - 1e5).abs() < 1e-6);
    }
}

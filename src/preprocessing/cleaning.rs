//! Missing-value handling

use crate::error::{Result, WineError};
use polars::prelude::*;
use tracing::{debug, info};

/// Drop every row that has a missing value in any column.
///
/// Nulls count as missing in every column; NaN counts as missing in float
/// columns. No imputation is performed, so the row count can only shrink.
pub fn clean(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Err(WineError::DataError("input frame has no columns".to_string()));
    }

    let keep = complete_row_mask(df)?;
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let cleaned = df.filter(&mask)?;

    let dropped = df.height() - cleaned.height();
    if dropped > 0 {
        info!(dropped, remaining = cleaned.height(), "Dropped rows with missing values");
    } else {
        debug!(rows = cleaned.height(), "No missing values found");
    }

    Ok(cleaned)
}

/// Total number of missing cells (nulls, plus NaN in float columns).
pub fn missing_value_count(df: &DataFrame) -> Result<usize> {
    let keep_cells = df
        .get_columns()
        .iter()
        .map(present_cells)
        .collect::<Result<Vec<Vec<bool>>>>()?;
    Ok(keep_cells
        .iter()
        .map(|col| col.iter().filter(|present| !**present).count())
        .sum())
}

fn complete_row_mask(df: &DataFrame) -> Result<Vec<bool>> {
    let mut keep = vec![true; df.height()];
    for column in df.get_columns() {
        for (row, present) in present_cells(column)?.into_iter().enumerate() {
            if !present {
                keep[row] = false;
            }
        }
    }
    Ok(keep)
}

fn present_cells(column: &Column) -> Result<Vec<bool>> {
    if column.dtype().is_float() {
        let values = column.cast(&DataType::Float64)?;
        Ok(values
            .f64()?
            .into_iter()
            .map(|v| matches!(v, Some(x) if !x.is_nan()))
            .collect())
    } else {
        Ok(column.is_null().into_iter().map(|v| !v.unwrap_or(false)).collect())
    }
}

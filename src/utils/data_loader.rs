//! Data loading utilities

use crate::error::{Result, WineError};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Separator of the raw wine quality files
pub const RAW_SEPARATOR: u8 = b';';
/// Separator written to and read from processed files
pub const PROCESSED_SEPARATOR: u8 = b',';

/// Delimited-file loader
pub struct DataLoader {
    /// Rows used for schema inference
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(100),
        }
    }

    /// Set the number of rows used for schema inference (`None` scans the whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Load a delimited file with an explicit separator
    pub fn load_csv_with_separator(&self, path: &Path, separator: u8) -> Result<DataFrame> {
        let file = File::open(path)
            .map_err(|e| WineError::DataError(format!("{}: {}", path.display(), e)))?;

        let parse_opts = CsvParseOptions::default().with_separator(separator);

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| WineError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Load a comma-delimited file
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        self.load_csv_with_separator(path, PROCESSED_SEPARATOR)
    }

    /// Load a raw file written with `;`.
    ///
    /// When the semicolon read yields a single column whose header still
    /// contains a comma, the file is really comma-delimited and is re-read.
    pub fn load_raw(&self, path: &Path) -> Result<DataFrame> {
        let df = self.load_csv_with_separator(path, RAW_SEPARATOR)?;

        if needs_comma_fallback(&df) {
            warn!(
                path = %path.display(),
                "Single column with comma in header, re-reading with ',' separator"
            );
            return self.load_csv_with_separator(path, PROCESSED_SEPARATOR);
        }

        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded raw data");
        Ok(df)
    }
}

fn needs_comma_fallback(df: &DataFrame) -> bool {
    let names = df.get_column_names();
    names.len() == 1 && names[0].as_str().contains(',')
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to comma-delimited CSV with a header and no index column.
    /// Missing parent directories are created.
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)
            .map_err(|e| WineError::DataError(format!("{}: {}", path.display(), e)))?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(PROCESSED_SEPARATOR)
            .finish(df)
            .map_err(|e| WineError::DataError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(lines: &[&str]) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_load_raw_semicolon() {
        let file = write_csv(&[
            "\"fixed acidity\";\"volatile acidity\";\"quality\"",
            "7.4;0.7;5",
            "7.8;0.88;5",
        ]);
        let df = DataLoader::new().load_raw(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert!(df.column("fixed acidity").is_ok());
    }

    #[test]
    fn test_load_raw_falls_back_to_comma() {
        let file = write_csv(&["a,b,c", "1,2,3", "4,5,6"]);
        let df = DataLoader::new().load_raw(file.path()).unwrap();
        assert_eq!(df.width(), 3);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_single_column_without_comma_is_kept() {
        let file = write_csv(&["quality", "5", "6"]);
        let df = DataLoader::new().load_raw(file.path()).unwrap();
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = DataLoader::new().load_raw(Path::new("/nonexistent/raw.csv"));
        assert!(matches!(result, Err(WineError::DataError(_))));
    }

    #[test]
    fn test_save_csv_roundtrip_creates_dirs() {
        let mut df = DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0]),
            Column::new("b".into(), &[4.0, 5.0, 6.0]),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        DataSaver::save_csv(&mut df, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("a,b"));

        let loaded = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }
}

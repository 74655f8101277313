//! Dataset loading for uploads and local files

use crate::error::{ForecastError, Result};
use crate::table::RawTable;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

const UNREADABLE: &str = "Empty or unreadable dataset";

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Delimited(u8),
    Json,
    JsonLines,
    Parquet,
}

impl DatasetFormat {
    /// Detect the format from a file name; unknown extensions are read as CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tsv" | "tab" => DatasetFormat::Delimited(b'\t'),
            "json" => DatasetFormat::Json,
            "jsonl" | "ndjson" => DatasetFormat::JsonLines,
            "parquet" | "pq" => DatasetFormat::Parquet,
            _ => DatasetFormat::Delimited(b','),
        }
    }
}

/// Loads tabular data into a [`RawTable`]
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    /// Rows used for dtype inference; `None` scans the whole file
    infer_schema_length: Option<usize>,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit dtype inference to the first `n` rows
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }

    /// Load a file from disk, picking the reader from its extension
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<RawTable> {
        let path = path.as_ref();
        let start = Instant::now();

        let df = match DatasetFormat::from_path(path) {
            DatasetFormat::Delimited(separator) => {
                let bytes = std::fs::read(path)?;
                self.read_delimited(bytes, separator)
            }
            DatasetFormat::Json => {
                let file = File::open(path)?;
                JsonReader::new(file)
                    .with_json_format(JsonFormat::Json)
                    .finish()
                    .map_err(|e| self.unreadable(e))
            }
            DatasetFormat::JsonLines => {
                let file = File::open(path)?;
                JsonReader::new(file)
                    .with_json_format(JsonFormat::JsonLines)
                    .finish()
                    .map_err(|e| self.unreadable(e))
            }
            DatasetFormat::Parquet => {
                let file = File::open(path)?;
                ParquetReader::new(file)
                    .finish()
                    .map_err(|e| self.unreadable(e))
            }
        }?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Self::into_table(df)
    }

    /// Load an uploaded delimited file held in memory
    pub fn load_bytes(&self, bytes: &[u8], separator: u8) -> Result<RawTable> {
        let df = self.read_delimited(bytes.to_vec(), separator)?;
        info!(rows = df.height(), cols = df.width(), "Loaded uploaded dataset");
        Self::into_table(df)
    }

    fn read_delimited(&self, bytes: Vec<u8>, separator: u8) -> Result<DataFrame> {
        let bytes = if std::str::from_utf8(&bytes).is_ok() {
            bytes
        } else {
            warn!("Dataset is not valid UTF-8, decoding as Latin-1");
            decode_latin1(&bytes).into_bytes()
        };

        let parse_opts = CsvParseOptions::default().with_separator(separator);
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| self.unreadable(e))
    }

    fn unreadable(&self, err: PolarsError) -> ForecastError {
        warn!(error = %err, "Failed to parse dataset");
        ForecastError::EmptyDataset(UNREADABLE.to_string())
    }

    fn into_table(df: DataFrame) -> Result<RawTable> {
        if df.height() == 0 || df.width() == 0 {
            return Err(ForecastError::EmptyDataset(UNREADABLE.to_string()));
        }
        RawTable::from_dataframe(&df)
    }
}

/// Every Latin-1 byte maps to the Unicode code point of the same value
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

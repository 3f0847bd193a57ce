use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use log::{error, info};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value as JsonValue};

use super::model::{CategoricalAttr, Dataset, Listing, NumericAttr};
use crate::error::{DashboardError, Result};

const NAME_COLUMN: &str = "name";

// ---------------------------------------------------------------------------
// Source boundary
// ---------------------------------------------------------------------------

/// Anything that can produce the full listings table in one call.
pub trait ListingSource {
    /// Fetch every listing. Any schema violation must fail the whole fetch.
    fn fetch(&self) -> anyhow::Result<Vec<Listing>>;

    /// Short human-readable description for log lines.
    fn describe(&self) -> String;
}

/// Listings stored in a local file; the format is chosen by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – one column per schema attribute
/// * `.json`            – `[{ "name": ..., "price": ..., ... }, ...]`
/// * `.csv`             – header row with the schema column names
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl ListingSource for FileSource {
    fn fetch(&self) -> anyhow::Result<Vec<Listing>> {
        load_file(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetch from `source` on a worker thread, giving up after `timeout`.
///
/// The worker is detached, not cancelled: after a timeout a slow source
/// keeps running `fetch` (and holding whatever it opened) until it returns,
/// and its result is dropped.
pub fn load_dataset<S>(source: S, timeout: Duration) -> Result<Dataset>
where
    S: ListingSource + Send + 'static,
{
    let description = source.describe();
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("listing-loader".to_string())
        .spawn(move || {
            // The receiver is gone if we already timed out.
            let _ = tx.send(source.fetch());
        })
        .map_err(|e| DashboardError::DataUnavailable(format!("spawning loader: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(Ok(listings)) => {
            info!("Loaded {} listings from {description}", listings.len());
            Ok(Dataset::new(listings))
        }
        Ok(Err(err)) => Err(DashboardError::DataUnavailable(format!(
            "{description}: {err:#}"
        ))),
        Err(RecvTimeoutError::Timeout) => Err(DashboardError::DataUnavailable(format!(
            "{description}: no response within {timeout:?}"
        ))),
        Err(RecvTimeoutError::Disconnected) => Err(DashboardError::DataUnavailable(format!(
            "{description}: loader exited without a result"
        ))),
    }
}

/// Like [`load_dataset`] but degrades to an empty dataset on failure.
pub fn load_or_empty<S>(source: S, timeout: Duration) -> Dataset
where
    S: ListingSource + Send + 'static,
{
    load_dataset(source, timeout).unwrap_or_else(|err| {
        error!("{err}; continuing with an empty dataset");
        Dataset::empty()
    })
}

/// Load listings from a file.  Dispatch by extension.
pub fn load_file(path: &Path) -> anyhow::Result<Vec<Listing>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            read_json(&text)
        }
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            read_csv(file)
        }
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Cell parsing shared by all formats
// ---------------------------------------------------------------------------

/// Numeric cells that fail to parse are kept as missing, not rejected.
fn parse_numeric_text(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "name": "Ocean Loft", "country": "Portugal", "price": 120, ... },
///   ...
/// ]
/// ```
///
/// Text columns must be present in every record; numeric columns may be
/// absent, `null`, or non-numeric, all of which read as missing.
pub fn read_json(text: &str) -> anyhow::Result<Vec<Listing>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| -> anyhow::Result<Listing> {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            json_to_listing(obj).with_context(|| format!("Row {i}"))
        })
        .collect()
}

fn json_to_listing(obj: &Map<String, JsonValue>) -> anyhow::Result<Listing> {
    let mut listing = Listing::named(json_text(obj, NAME_COLUMN)?);
    for attr in CategoricalAttr::ALL {
        listing.set_categorical(attr, json_text(obj, attr.as_str())?);
    }
    for attr in NumericAttr::ALL {
        let value = match obj.get(attr.as_str()) {
            Some(JsonValue::Number(n)) => n.as_f64(),
            Some(JsonValue::String(s)) => parse_numeric_text(s),
            _ => None,
        };
        listing.set_numeric(attr, value);
    }
    Ok(listing)
}

fn json_text(obj: &Map<String, JsonValue>, key: &str) -> anyhow::Result<String> {
    match obj.get(key) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Null) => Ok(String::new()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        Some(JsonValue::Bool(b)) => Ok(b.to_string()),
        Some(other) => bail!("'{key}' must be a scalar, got {other}"),
        None => bail!("missing '{key}'"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row naming every schema column (extra columns are
/// ignored). Rows with the wrong number of fields reject the file.
pub fn read_csv<R: Read>(input: R) -> anyhow::Result<Vec<Listing>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("CSV missing '{name}' column"))
    };
    let name_idx = column(NAME_COLUMN)?;
    let text_cols: Vec<(CategoricalAttr, usize)> = CategoricalAttr::ALL
        .into_iter()
        .map(|attr| column(attr.as_str()).map(|col| (attr, col)))
        .collect::<anyhow::Result<_>>()?;
    let numeric_cols: Vec<(NumericAttr, usize)> = NumericAttr::ALL
        .into_iter()
        .map(|attr| column(attr.as_str()).map(|col| (attr, col)))
        .collect::<anyhow::Result<_>>()?;

    let mut listings = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let mut listing = Listing::named(field(name_idx));
        for &(attr, idx) in &text_cols {
            listing.set_categorical(attr, field(idx));
        }
        for &(attr, idx) in &numeric_cols {
            listing.set_numeric(attr, parse_numeric_text(field(idx)));
        }
        listings.push(listing);
    }

    Ok(listings)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of listings.
///
/// Expected schema:
/// - `name` and the categorical columns: Utf8 or LargeUtf8
/// - numeric columns: Int32, Int64, Float32, Float64, or Utf8 holding numbers
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> anyhow::Result<Vec<Listing>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut listings = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let column = |name: &str| {
            schema
                .index_of(name)
                .map(|idx| batch.column(idx).clone())
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))
        };

        let names = column(NAME_COLUMN)?;
        let text_cols = CategoricalAttr::ALL
            .into_iter()
            .map(|attr| column(attr.as_str()).map(|col| (attr, col)))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let numeric_cols = NumericAttr::ALL
            .into_iter()
            .map(|attr| column(attr.as_str()).map(|col| (attr, col)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let name = extract_text(&names, row)
                .with_context(|| format!("Row {row}: failed to read '{NAME_COLUMN}'"))?;
            let mut listing = Listing::named(name);
            for (attr, col) in &text_cols {
                let value = extract_text(col, row)
                    .with_context(|| format!("Row {row}: failed to read '{attr}'"))?;
                listing.set_categorical(*attr, value);
            }
            for (attr, col) in &numeric_cols {
                let value = extract_numeric(col, row)
                    .with_context(|| format!("Row {row}: failed to read '{attr}'"))?;
                listing.set_numeric(*attr, value);
            }
            listings.push(listing);
        }
    }

    Ok(listings)
}

// -- Parquet / Arrow helpers --

/// Extract a text cell; null reads as the empty string.
fn extract_text(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<String> {
    if col.is_null(row) {
        return Ok(String::new());
    }
    match col.data_type() {
        DataType::Utf8 => Ok(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Ok(col.as_string::<i64>().value(row).to_string()),
        other => bail!("Expected Utf8 or LargeUtf8 column, got {other:?}"),
    }
}

/// Extract a numeric cell; null reads as missing.
fn extract_numeric(col: &Arc<dyn Array>, row: usize) -> anyhow::Result<Option<f64>> {
    if col.is_null(row) {
        return Ok(None);
    }
    let value = match col.data_type() {
        DataType::Int32 => Some(col.as_primitive::<Int32Type>().value(row) as f64),
        DataType::Int64 => Some(col.as_primitive::<Int64Type>().value(row) as f64),
        DataType::Float32 => Some(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Some(col.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => parse_numeric_text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => parse_numeric_text(col.as_string::<i64>().value(row)),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use tempfile::tempdir;

    const HEADER: &str = "name,country,property_type,room_type,cancellation_policy,price,\
number_of_reviews,review_scores_rating,latitude,longitude,availability_30,availability_60,\
availability_90,availability_365";

    struct FixedSource(Vec<Listing>);

    impl ListingSource for FixedSource {
        fn fetch(&self) -> anyhow::Result<Vec<Listing>> {
            Ok(self.0.clone())
        }
        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    struct SlowSource;

    impl ListingSource for SlowSource {
        fn fetch(&self) -> anyhow::Result<Vec<Listing>> {
            thread::sleep(Duration::from_millis(500));
            Ok(Vec::new())
        }
        fn describe(&self) -> String {
            "slow".to_string()
        }
    }

    struct BrokenSource;

    impl ListingSource for BrokenSource {
        fn fetch(&self) -> anyhow::Result<Vec<Listing>> {
            bail!("connection refused")
        }
        fn describe(&self) -> String {
            "postgres://localhost/airbnb".to_string()
        }
    }

    #[test]
    fn test_csv_parses_rows() {
        let csv = format!(
            "{HEADER}\n\
             Ocean Loft,Portugal,Apartment,Entire home/apt,strict,120,15,96,38.7,-9.1,3,10,40,200\n\
             Cabin,Portugal,Cabin,Private room,flexible,n/a,,88,38.9,-9.3,0,0,0,0\n"
        );
        let listings = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "Ocean Loft");
        assert_eq!(listings[0].room_type, "Entire home/apt");
        assert_eq!(listings[0].numeric(NumericAttr::Price), Some(120.0));
        assert_eq!(listings[0].numeric(NumericAttr::Longitude), Some(-9.1));
        assert_eq!(listings[1].numeric(NumericAttr::Price), None);
        assert_eq!(listings[1].numeric(NumericAttr::NumberOfReviews), None);
    }

    #[test]
    fn test_csv_missing_column_rejected() {
        let csv = "name,country,price\nA,Spain,10\n";
        let err = read_csv(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("property_type"));
    }

    #[test]
    fn test_csv_ragged_row_rejected() {
        let csv = format!("{HEADER}\nA,Spain,Flat\n");
        assert!(read_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_json_records() {
        let json = r#"[
            {"name": "Ocean Loft", "country": "Portugal", "property_type": "Loft",
             "room_type": "Entire home/apt", "cancellation_policy": "moderate",
             "price": 120, "review_scores_rating": "97", "latitude": null}
        ]"#;
        let listings = read_json(json).unwrap();
        assert_eq!(listings[0].numeric(NumericAttr::Price), Some(120.0));
        assert_eq!(listings[0].numeric(NumericAttr::ReviewScoresRating), Some(97.0));
        assert_eq!(listings[0].numeric(NumericAttr::Latitude), None);
        assert_eq!(listings[0].numeric(NumericAttr::Availability30), None);
    }

    #[test]
    fn test_json_missing_text_column_rejected() {
        let json = r#"[{"name": "Ocean Loft", "price": 120}]"#;
        assert!(read_json(json).is_err());
        assert!(read_json(r#"{"name": "not an array"}"#).is_err());
        assert!(read_json(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_load_dataset_from_source() {
        let source = FixedSource(vec![Listing::named("a"), Listing::named("b")]);
        let ds = load_dataset(source, Duration::from_secs(5)).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_failed_source_is_data_unavailable() {
        let err = load_dataset(BrokenSource, Duration::from_secs(5)).unwrap_err();
        match err {
            DashboardError::DataUnavailable(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_slow_source_times_out() {
        let err = load_dataset(SlowSource, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, DashboardError::DataUnavailable(_)));
    }

    #[test]
    fn test_load_or_empty_degrades() {
        let ds = load_or_empty(BrokenSource, Duration::from_secs(5));
        assert!(ds.is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(load_file(Path::new("listings.xlsx")).is_err());
    }

    /// Two listings with every schema column: Int64 reviews, Utf8 ratings,
    /// Float64 for the rest, and nulls in the second row.
    fn parquet_columns() -> Vec<(String, ArrayRef)> {
        let mut columns: Vec<(String, ArrayRef)> = vec![
            (
                NAME_COLUMN.to_string(),
                Arc::new(StringArray::from(vec!["Ocean Loft", "Cabin"])),
            ),
            (
                "country".to_string(),
                Arc::new(StringArray::from(vec![Some("Portugal"), None])),
            ),
        ];
        for attr in [
            CategoricalAttr::PropertyType,
            CategoricalAttr::RoomType,
            CategoricalAttr::CancellationPolicy,
        ] {
            columns.push((
                attr.as_str().to_string(),
                Arc::new(StringArray::from(vec!["Loft", "Cabin"])),
            ));
        }
        columns.push((
            "price".to_string(),
            Arc::new(Float64Array::from(vec![Some(120.5), None])),
        ));
        columns.push((
            "number_of_reviews".to_string(),
            Arc::new(Int64Array::from(vec![3, 0])),
        ));
        columns.push((
            "review_scores_rating".to_string(),
            Arc::new(StringArray::from(vec!["97", "n/a"])),
        ));
        for attr in [
            NumericAttr::Latitude,
            NumericAttr::Longitude,
            NumericAttr::Availability30,
            NumericAttr::Availability60,
            NumericAttr::Availability90,
            NumericAttr::Availability365,
        ] {
            columns.push((
                attr.as_str().to_string(),
                Arc::new(Float64Array::from(vec![1.0, 2.0])),
            ));
        }
        columns
    }

    fn write_parquet(path: &Path, columns: Vec<(String, ArrayRef)>) {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, col)| Field::new(name.as_str(), col.data_type().clone(), true))
            .collect();
        let schema = Arc::new(Schema::new(fields));
        let arrays = columns.into_iter().map(|(_, col)| col).collect();
        let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_parquet_reads_mixed_column_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listings.parquet");
        write_parquet(&path, parquet_columns());

        let listings = load_file(&path).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].name, "Ocean Loft");
        assert_eq!(listings[0].country, "Portugal");
        assert_eq!(listings[0].numeric(NumericAttr::Price), Some(120.5));
        assert_eq!(listings[0].numeric(NumericAttr::NumberOfReviews), Some(3.0));
        assert_eq!(listings[0].numeric(NumericAttr::ReviewScoresRating), Some(97.0));
        assert_eq!(listings[1].country, "");
        assert_eq!(listings[1].numeric(NumericAttr::Price), None);
        assert_eq!(listings[1].numeric(NumericAttr::NumberOfReviews), Some(0.0));
        assert_eq!(listings[1].numeric(NumericAttr::ReviewScoresRating), None);
        assert_eq!(listings[1].numeric(NumericAttr::Availability365), Some(2.0));
    }

    #[test]
    fn test_parquet_missing_column_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listings.pq");
        let columns = parquet_columns()
            .into_iter()
            .filter(|(name, _)| name != "latitude")
            .collect();
        write_parquet(&path, columns);

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("latitude"));
        assert!(load_dataset(FileSource::new(path.clone()), Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_parquet_unsupported_type_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("listings.parquet");
        let columns = parquet_columns()
            .into_iter()
            .map(|(name, col)| {
                if name == "price" {
                    let flags: ArrayRef = Arc::new(BooleanArray::from(vec![true, false]));
                    (name, flags)
                } else {
                    (name, col)
                }
            })
            .collect();
        write_parquet(&path, columns);

        let err = load_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("price"));

        let numbers: ArrayRef = Arc::new(Float64Array::from(vec![1.0, 2.0]));
        let columns = parquet_columns()
            .into_iter()
            .map(|(name, col)| {
                if name == "room_type" {
                    (name, numbers.clone())
                } else {
                    (name, col)
                }
            })
            .collect();
        write_parquet(&path, columns);
        assert!(load_file(&path).is_err());
    }
}

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{LoadReport, RecordSet, Value};
use super::schema::Schema;
use crate::error::{LoadError, ParseError};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "json", "parquet", "pq"];

type RawRow = std::result::Result<Vec<Value>, ParseError>;

/// Header plus a stream of untyped rows, before schema checks.
struct RawTable {
    headers: Vec<String>,
    rows: Box<dyn Iterator<Item = RawRow>>,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular file into a [`RecordSet`]. Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.tsv` – header row, one record per line (the downloaded dataset)
/// * `.json`         – `[{ "State": "CA", "Severity": 2, ... }, ...]`
/// * `.parquet`      – any flat schema; nested columns are read as text
///
/// Malformed rows are skipped and counted in the returned [`LoadReport`].
pub fn load_file(
    path: &Path,
    schema: &Schema,
) -> std::result::Result<(RecordSet, LoadReport), LoadError> {
    let raw = read_raw(path)?;
    let (records, report) = RecordSet::build(schema, raw.headers, raw.rows)?;

    log::info!(
        "Loaded {} records with {} columns from {}",
        records.len(),
        records.column_names().len(),
        path.display()
    );
    if report.rows_skipped > 0 {
        log::warn!(
            "Skipped {} malformed rows in {} (first: {})",
            report.rows_skipped,
            path.display(),
            report
                .sample_errors
                .first()
                .map(ToString::to_string)
                .unwrap_or_default()
        );
    }
    Ok((records, report))
}

fn read_raw(path: &Path) -> std::result::Result<RawTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "csv" => read_delimited(path, b','),
        "tsv" => read_delimited(path, b'\t'),
        "json" => read_json(path),
        "parquet" | "pq" => read_parquet(path),
        _ => return Err(LoadError::UnsupportedFormat(ext)),
    };
    raw.map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Header row with column names, then one record per line. A line with the
/// wrong number of fields becomes a per-row parse error.
fn read_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .context("opening delimited file")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rows = reader.into_records().enumerate().map(|(row_no, result)| {
        result
            .map(|record| record.iter().map(Value::from_cell).collect())
            .map_err(|e| ParseError::new(row_no, None, e.to_string()))
    });

    Ok(RawTable {
        headers,
        rows: Box::new(rows),
    })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
/// A key absent from one record reads as missing there.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    // First-seen column order across all records.
    let mut headers: Vec<String> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for obj in records.iter().filter_map(JsonValue::as_object) {
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                headers.push(key.clone());
            }
        }
    }

    let rows: Vec<RawRow> = records
        .iter()
        .enumerate()
        .map(|(i, rec)| -> RawRow {
            let obj = rec
                .as_object()
                .ok_or_else(|| ParseError::new(i, None, "record is not a JSON object"))?;
            Ok(headers
                .iter()
                .map(|h| obj.get(h).map_or(Value::Missing, json_to_value))
                .collect())
        })
        .collect();

    Ok(RawTable {
        headers,
        rows: Box::new(rows.into_iter()),
    })
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::from_cell(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Text(b.to_string()),
        JsonValue::Null => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows: Vec<RawRow> = Vec::new();
    let format = FormatOptions::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let formatters = batch
            .columns()
            .iter()
            .map(|col| ArrayFormatter::try_new(col.as_ref(), &format))
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("preparing parquet column formatters")?;

        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .zip(&formatters)
                .map(|(col, fmt)| {
                    extract_value(col, row).unwrap_or_else(|| Value::Text(fmt.value(row).to_string()))
                })
                .collect();
            rows.push(Ok(cells));
        }
    }

    Ok(RawTable {
        headers,
        rows: Box::new(rows.into_iter()),
    })
}

/// Read one cell of a primitive or string Arrow column. `None` means the type
/// has no direct mapping and should be rendered as text.
fn extract_value(col: &ArrayRef, row: usize) -> Option<Value> {
    if col.is_null(row) {
        return Some(Value::Missing);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::from_cell(col.as_string_opt::<i32>()?.value(row)),
        DataType::LargeUtf8 => Value::from_cell(col.as_string_opt::<i64>()?.value(row)),
        DataType::Int8 => Value::Integer(col.as_primitive_opt::<Int8Type>()?.value(row).into()),
        DataType::Int16 => Value::Integer(col.as_primitive_opt::<Int16Type>()?.value(row).into()),
        DataType::Int32 => Value::Integer(col.as_primitive_opt::<Int32Type>()?.value(row).into()),
        DataType::Int64 => Value::Integer(col.as_primitive_opt::<Int64Type>()?.value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive_opt::<UInt8Type>()?.value(row).into()),
        DataType::UInt16 => Value::Integer(col.as_primitive_opt::<UInt16Type>()?.value(row).into()),
        DataType::UInt32 => Value::Integer(col.as_primitive_opt::<UInt32Type>()?.value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive_opt::<UInt64Type>()?.value(row);
            i64::try_from(v).map_or_else(|_| Value::Float(v as f64), Value::Integer)
        }
        DataType::Float32 => {
            Value::Float(col.as_primitive_opt::<Float32Type>()?.value(row).into())
        }
        DataType::Float64 => Value::Float(col.as_primitive_opt::<Float64Type>()?.value(row)),
        DataType::Boolean => Value::Text(col.as_boolean_opt()?.value(row).to_string()),
        _ => return None,
    };
    Some(value)
}

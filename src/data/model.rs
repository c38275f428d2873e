use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use super::schema::{ColumnKind, Schema};
use crate::error::{LoadError, ParseError};

/// Cell texts read as missing, a subset of what pandas treats as NA.
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

/// Parse errors kept verbatim in a [`LoadReport`]; the rest are only counted.
const MAX_SAMPLED_ERRORS: usize = 20;

// ---------------------------------------------------------------------------
// Value – a single typed cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. `Missing` is its own variant and never compares
/// equal to a present value.
///
/// Equality, ordering and hashing all follow [`f64::total_cmp`] for floats.
/// Loaded floats are stored with `-0.0` folded into `0.0`.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Missing,
}

// -- Manual Eq/Ord so Value can key a BTreeMap / BTreeSet --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Integer(_) => 1,
                Float(_) => 2,
                Text(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(fold_zero(v))
    }
}

impl Value {
    /// Interpret raw delimited text: missing tokens become [`Value::Missing`],
    /// anything else stays text until its column's type is known.
    pub fn from_cell(s: &str) -> Value {
        if MISSING_TOKENS.contains(&s.trim()) {
            Value::Missing
        } else {
            Value::Text(s.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn to_integer(&self) -> Result<Option<i64>, String> {
        match self {
            Value::Missing => Ok(None),
            Value::Integer(i) => Ok(Some(*i)),
            Value::Float(f) => whole_number(*f)
                .map(Some)
                .ok_or_else(|| format!("{f} is not an integer")),
            Value::Text(s) => {
                let t = s.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().and_then(whole_number))
                    .map(Some)
                    .ok_or_else(|| format!("'{s}' is not an integer"))
            }
        }
    }

    fn to_float(&self) -> Result<Option<f64>, String> {
        match self {
            Value::Missing => Ok(None),
            Value::Integer(i) => Ok(Some(*i as f64)),
            Value::Float(f) if f.is_nan() => Ok(None),
            Value::Float(f) => Ok(Some(fold_zero(*f))),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| if f.is_nan() { None } else { Some(fold_zero(f)) })
                .map_err(|_| format!("'{s}' is not a number")),
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Value::Missing => None,
            Value::Text(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

/// `-0.0` and `0.0` are one key.
fn fold_zero(f: f64) -> f64 {
    if f == 0.0 {
        0.0
    } else {
        f
    }
}

fn whole_number(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// ColumnData – one typed column
// ---------------------------------------------------------------------------

/// Columnar storage for one column. `None` is a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `row`; out-of-range rows read as missing.
    pub fn value(&self, row: usize) -> Value {
        match self {
            ColumnData::Text(v) => v.get(row).cloned().flatten().map_or(Value::Missing, Value::Text),
            ColumnData::Integer(v) => v.get(row).copied().flatten().map_or(Value::Missing, Value::Integer),
            ColumnData::Float(v) => v.get(row).copied().flatten().map_or(Value::Missing, Value::Float),
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Text(v) => !matches!(v.get(row), Some(Some(_))),
            ColumnData::Integer(v) => !matches!(v.get(row), Some(Some(_))),
            ColumnData::Float(v) => !matches!(v.get(row), Some(Some(_))),
        }
    }

    /// Exact equality on the column's native type. A value of another type,
    /// or [`Value::Missing`], never matches.
    pub fn matches(&self, row: usize, value: &Value) -> bool {
        match (self, value) {
            (ColumnData::Text(v), Value::Text(want)) => {
                v.get(row).and_then(Option::as_deref) == Some(want.as_str())
            }
            (ColumnData::Integer(v), Value::Integer(want)) => v.get(row).copied().flatten() == Some(*want),
            (ColumnData::Float(v), Value::Float(want)) => v.get(row).copied().flatten() == Some(*want),
            _ => false,
        }
    }

    /// Convert raw text into a value of this column's native type, so a
    /// selector's string can be compared with [`ColumnData::matches`].
    pub fn parse_value(&self, raw: &str) -> Value {
        let text = Value::Text(raw.to_string());
        match self {
            ColumnData::Text(_) => text,
            ColumnData::Integer(_) => match text.to_integer() {
                Ok(Some(i)) => Value::Integer(i),
                _ => text,
            },
            ColumnData::Float(_) => match text.to_float() {
                Ok(Some(f)) => Value::Float(f),
                _ => text,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// LoadReport – what the load skipped
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    /// The first few parse errors, in file order.
    pub sample_errors: Vec<ParseError>,
}

impl LoadReport {
    fn record_skip(&mut self, error: ParseError) {
        self.rows_skipped += 1;
        if self.sample_errors.len() < MAX_SAMPLED_ERRORS {
            self.sample_errors.push(error);
        }
    }
}

// ---------------------------------------------------------------------------
// RecordSet – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset, stored column-wise. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    names: Vec<String>,
    kinds: Vec<ColumnKind>,
    columns: Vec<ColumnData>,
    len: usize,
}

impl RecordSet {
    /// Build a record set from header + raw rows, checking `schema` once.
    ///
    /// Required columns are coerced to the storage type of their declared kind;
    /// a row whose required cell does not coerce is skipped and reported.
    /// Every other column gets the narrowest type all of its cells fit
    /// (integer, then float, then text).
    pub fn build(
        schema: &Schema,
        headers: Vec<String>,
        rows: impl IntoIterator<Item = Result<Vec<Value>, ParseError>>,
    ) -> Result<(RecordSet, LoadReport), LoadError> {
        let missing = schema.missing_from(&headers);
        if !missing.is_empty() {
            return Err(LoadError::Schema {
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        let declared: Vec<Option<ColumnKind>> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // A repeated header only takes its declared kind on first occurrence.
                let first = headers.iter().position(|x| x == h) == Some(i);
                if first {
                    schema.kind_of(h)
                } else {
                    None
                }
            })
            .collect();

        let mut builders: Vec<ColumnBuilder> = declared
            .iter()
            .map(|kind| match kind {
                Some(ColumnKind::Categorical) => ColumnBuilder::Text(Vec::new()),
                Some(ColumnKind::Ordinal) => ColumnBuilder::Integer(Vec::new()),
                Some(ColumnKind::Coordinate | ColumnKind::Continuous) => {
                    ColumnBuilder::Float(Vec::new())
                }
                None => ColumnBuilder::Raw(Vec::new()),
            })
            .collect();

        let mut report = LoadReport::default();

        for (row_no, row) in rows.into_iter().enumerate() {
            let cells = match row {
                Ok(cells) => cells,
                Err(e) => {
                    report.record_skip(e);
                    continue;
                }
            };
            if cells.len() != headers.len() {
                report.record_skip(ParseError::new(
                    row_no,
                    None,
                    format!("expected {} fields, found {}", headers.len(), cells.len()),
                ));
                continue;
            }

            let typed = match coerce_declared(&builders, &headers, &cells, row_no) {
                Ok(typed) => typed,
                Err(e) => {
                    report.record_skip(e);
                    continue;
                }
            };

            for ((builder, cell), typed) in builders.iter_mut().zip(cells).zip(typed) {
                builder.push(cell, typed);
            }
            report.rows_loaded += 1;
        }

        let mut kinds = Vec::with_capacity(headers.len());
        let mut columns = Vec::with_capacity(headers.len());
        for (builder, kind) in builders.into_iter().zip(declared) {
            let (data, inferred) = builder.finish();
            kinds.push(kind.unwrap_or(inferred));
            columns.push(data);
        }

        let set = RecordSet {
            names: headers,
            kinds,
            columns,
            len: report.rows_loaded,
        };
        Ok((set, report))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Column names in file order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.index_of(name).map(|i| &self.columns[i])
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.index_of(name).map(|i| self.kinds[i])
    }

    pub fn integers(&self, name: &str) -> Option<&[Option<i64>]> {
        match self.column(name)? {
            ColumnData::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn floats(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            ColumnData::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Cell at (`row`, `name`); unknown columns read as missing.
    pub fn value(&self, row: usize, name: &str) -> Value {
        self.column(name)
            .map_or(Value::Missing, |c| c.value(row))
    }

    /// All cells of one record, in column order.
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }

    /// Sorted distinct non-missing values of a column (numeric ascending,
    /// text lexicographic). Unknown columns yield nothing.
    pub fn distinct_values(&self, name: &str) -> Vec<Value> {
        let Some(column) = self.column(name) else {
            return Vec::new();
        };
        let set: BTreeSet<Value> = (0..self.len)
            .map(|row| column.value(row))
            .filter(|v| !v.is_missing())
            .collect();
        set.into_iter().collect()
    }

    /// Missing-cell count per column, for the load summary.
    pub fn missing_counts(&self) -> BTreeMap<&str, usize> {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(name, col)| {
                let n = (0..self.len).filter(|&r| col.is_missing(r)).count();
                (name.as_str(), n)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Column builders
// ---------------------------------------------------------------------------

enum ColumnBuilder {
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    /// Column outside the schema; typed once all cells are seen.
    Raw(Vec<Value>),
}

/// A declared cell after coercion to its column's storage type.
enum Typed {
    Integer(Option<i64>),
    Float(Option<f64>),
    Untyped,
}

fn coerce_declared(
    builders: &[ColumnBuilder],
    headers: &[String],
    cells: &[Value],
    row_no: usize,
) -> Result<Vec<Typed>, ParseError> {
    builders
        .iter()
        .zip(cells)
        .zip(headers)
        .map(|((builder, cell), name)| match builder {
            ColumnBuilder::Integer(_) => cell
                .to_integer()
                .map(Typed::Integer)
                .map_err(|msg| ParseError::new(row_no, Some(name), msg)),
            ColumnBuilder::Float(_) => cell
                .to_float()
                .map(Typed::Float)
                .map_err(|msg| ParseError::new(row_no, Some(name), msg)),
            ColumnBuilder::Text(_) | ColumnBuilder::Raw(_) => Ok(Typed::Untyped),
        })
        .collect()
}

impl ColumnBuilder {
    fn push(&mut self, cell: Value, typed: Typed) {
        match (self, typed) {
            (ColumnBuilder::Text(v), _) => v.push(cell.into_text()),
            (ColumnBuilder::Integer(v), Typed::Integer(i)) => v.push(i),
            (ColumnBuilder::Float(v), Typed::Float(f)) => v.push(f),
            (ColumnBuilder::Raw(v), _) => v.push(cell),
            // coerce_declared pairs each typed builder with its own variant
            (ColumnBuilder::Integer(v), _) => v.push(None),
            (ColumnBuilder::Float(v), _) => v.push(None),
        }
    }

    fn finish(self) -> (ColumnData, ColumnKind) {
        match self {
            ColumnBuilder::Text(v) => (ColumnData::Text(v), ColumnKind::Categorical),
            ColumnBuilder::Integer(v) => (ColumnData::Integer(v), ColumnKind::Ordinal),
            ColumnBuilder::Float(v) => (ColumnData::Float(v), ColumnKind::Continuous),
            ColumnBuilder::Raw(cells) => infer_column(cells),
        }
    }
}

fn infer_column(cells: Vec<Value>) -> (ColumnData, ColumnKind) {
    if let Ok(ints) = cells.iter().map(Value::to_integer).collect::<Result<Vec<_>, _>>() {
        return (ColumnData::Integer(ints), ColumnKind::Ordinal);
    }
    if let Ok(floats) = cells.iter().map(Value::to_float).collect::<Result<Vec<_>, _>>() {
        return (ColumnData::Float(floats), ColumnKind::Continuous);
    }
    let texts = cells.into_iter().map(Value::into_text).collect();
    (ColumnData::Text(texts), ColumnKind::Categorical)
}

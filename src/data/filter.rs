use std::collections::BTreeMap;
use std::fmt;

use super::model::{ColumnData, RecordSet, Value};

/// Selector text meaning "no restriction on this column".
pub const ALL: &str = "All";

// ---------------------------------------------------------------------------
// Predicate: a single column-level condition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact equality on the column's native type.
    Equals { column: String, value: Value },
    /// Inclusive range; numeric bounds compare numerically, text bounds lexicographically.
    Between {
        column: String,
        low: Value,
        high: Value,
    },
    /// Matches every record, including ones missing a value in `column`.
    Unconstrained { column: String },
}

impl Predicate {
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn between(column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Predicate::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn unconstrained(column: impl Into<String>) -> Self {
        Predicate::Unconstrained {
            column: column.into(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Equals { column, .. }
            | Predicate::Between { column, .. }
            | Predicate::Unconstrained { column } => column,
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Predicate::Unconstrained { .. })
    }

    fn matches(&self, data: &ColumnData, row: usize) -> bool {
        match self {
            Predicate::Equals { value, .. } => data.matches(row, value),
            Predicate::Between { low, high, .. } => in_range(&data.value(row), low, high),
            Predicate::Unconstrained { .. } => true,
        }
    }
}

fn in_range(cell: &Value, low: &Value, high: &Value) -> bool {
    if let (Some(c), Some(l), Some(h)) = (cell.as_f64(), low.as_f64(), high.as_f64()) {
        return l <= c && c <= h;
    }
    match (cell, low, high) {
        (Value::Text(c), Value::Text(l), Value::Text(h)) => l <= c && c <= h,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Selection: a record set narrowed by a conjunction of predicates
// ---------------------------------------------------------------------------

/// Row indices (ascending) of the records that pass every predicate.
/// Borrows the record set; never mutates it.
#[derive(Clone)]
pub struct Selection<'a> {
    records: &'a RecordSet,
    indices: Vec<usize>,
}

impl<'a> Selection<'a> {
    /// Every record.
    pub fn all(records: &'a RecordSet) -> Self {
        Selection {
            records,
            indices: (0..records.len()).collect(),
        }
    }

    fn empty(records: &'a RecordSet) -> Self {
        Selection {
            records,
            indices: Vec::new(),
        }
    }

    pub fn records(&self) -> &'a RecordSet {
        self.records
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether nothing was filtered out.
    pub fn is_full(&self) -> bool {
        self.indices.len() == self.records.len()
    }

    /// Further narrow this selection (conjunction with the predicates already applied).
    pub fn refine(&self, predicates: &[Predicate]) -> Selection<'a> {
        let Some(resolved) = resolve(self.records, predicates) else {
            return Selection::empty(self.records);
        };
        Selection {
            records: self.records,
            indices: self
                .indices
                .iter()
                .copied()
                .filter(|&row| resolved.iter().all(|(p, data)| p.matches(data, row)))
                .collect(),
        }
    }
}

impl PartialEq for Selection<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.records, other.records) && self.indices == other.indices
    }
}

impl fmt::Debug for Selection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("selected", &self.indices.len())
            .field("total", &self.records.len())
            .finish()
    }
}

/// Pair each constraining predicate with its column. `None` when a predicate
/// names a column the record set lacks (nothing can match).
fn resolve<'p, 'r>(
    records: &'r RecordSet,
    predicates: &'p [Predicate],
) -> Option<Vec<(&'p Predicate, &'r ColumnData)>> {
    predicates
        .iter()
        .filter(|p| !p.is_unconstrained())
        .map(|p| records.column(p.column()).map(|data| (p, data)))
        .collect()
}

/// Return the records that satisfy every predicate.
///
/// * no predicates, or only unconstrained ones → every record
/// * a predicate on an unknown column, or for a value absent from the data → empty
///
/// Pure: the same inputs always give the same selection.
pub fn apply<'a>(records: &'a RecordSet, predicates: &[Predicate]) -> Selection<'a> {
    Selection::all(records).refine(predicates)
}

// ---------------------------------------------------------------------------
// Filter selections: what a user picked per column
// ---------------------------------------------------------------------------

/// One selector's state.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    All,
    Only(Value),
}

impl Choice {
    /// Selector text to a choice. [`ALL`] is the unconstrained sentinel;
    /// anything else is kept as text until matched against its column.
    pub fn parse(raw: &str) -> Self {
        if raw == ALL {
            Choice::All
        } else {
            Choice::Only(Value::Text(raw.to_string()))
        }
    }
}

/// Per-column selector state: column_name → choice.
/// A column absent from the map is not constrained.
pub type FilterSelections = BTreeMap<String, Choice>;

/// Turn selector state into predicates. Text choices are converted to the
/// column's native type so "2" matches severity 2.
pub fn to_predicates(records: &RecordSet, selections: &FilterSelections) -> Vec<Predicate> {
    selections
        .iter()
        .map(|(column, choice)| match choice {
            Choice::All => Predicate::unconstrained(column.as_str()),
            Choice::Only(Value::Text(raw)) => {
                let value = records
                    .column(column)
                    .map_or_else(|| Value::Text(raw.clone()), |data| data.parse_value(raw));
                Predicate::equals(column.as_str(), value)
            }
            Choice::Only(value) => Predicate::equals(column.as_str(), value.clone()),
        })
        .collect()
}

//! Shapes handed to the rendering layer. Every view carries its own labels
//! and keys, so a consumer never depends on column order.

use serde::Serialize;

use crate::data::filter::Selection;
use crate::data::model::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionEntry {
    pub key: Value,
    pub count: usize,
}

/// Counts of records grouped by one column's value, already ordered for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionView {
    pub column: String,
    pub entries: Vec<DistributionEntry>,
}

impl DistributionView {
    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(key, count)` pairs in display order.
    pub fn pairs(&self) -> Vec<(Value, usize)> {
        self.entries
            .iter()
            .map(|e| (e.key.clone(), e.count))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Coordinates of every selected record that has both of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointSetView {
    pub points: Vec<GeoPoint>,
}

impl PointSetView {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A single labelled number, e.g. a record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalarView {
    pub label: String,
    pub value: usize,
}

impl ScalarView {
    pub fn new(label: impl Into<String>, value: usize) -> Self {
        ScalarView {
            label: label.into(),
            value,
        }
    }
}

/// The first rows of a selection, for a preview grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableView {
    pub fn head(selection: &Selection<'_>, n: usize) -> Self {
        let records = selection.records();
        TableView {
            columns: records.column_names().to_vec(),
            rows: selection
                .indices()
                .iter()
                .take(n)
                .map(|&row| records.row(row))
                .collect(),
        }
    }
}

/// Any derived view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    Distribution(DistributionView),
    Points(PointSetView),
    Scalar(ScalarView),
    Table(TableView),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_serializes_self_describing_entries() {
        let view = View::Distribution(DistributionView {
            column: "Severity".into(),
            entries: vec![
                DistributionEntry {
                    key: Value::Integer(2),
                    count: 2,
                },
                DistributionEntry {
                    key: Value::Integer(4),
                    count: 1,
                },
            ],
        });
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "distribution",
                "column": "Severity",
                "entries": [{"key": 2, "count": 2}, {"key": 4, "count": 1}]
            })
        );
    }

    #[test]
    fn missing_cells_serialize_as_null() {
        let table = TableView {
            columns: vec!["State".into(), "Start_Lat".into()],
            rows: vec![vec![Value::from("CA"), Value::Missing]],
        };
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"columns":["State","Start_Lat"],"rows":[["CA",null]]}"#);
    }

    #[test]
    fn point_view_uses_latitude_longitude_names() {
        let view = PointSetView {
            points: vec![GeoPoint {
                latitude: 34.5,
                longitude: -118.25,
            }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["points"][0]["latitude"], 34.5);
        assert_eq!(json["points"][0]["longitude"], -118.25);
    }
}

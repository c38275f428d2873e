use std::collections::BTreeMap;

use super::filter::Selection;
use super::model::{RecordSet, Value};
use super::schema::ColumnKind;
use crate::view::{DistributionEntry, DistributionView, GeoPoint, PointSetView};

// ---------------------------------------------------------------------------
// Ordering policy
// ---------------------------------------------------------------------------

/// How a distribution's entries are ordered.
///
/// Categories absent from the selection are omitted (sparse) under both
/// orders, so a filtered and a global distribution of the same column stay
/// comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionOrder {
    /// Low to high key.
    AscendingKey,
    /// Most frequent first, ties by ascending key, optionally cut to `top_k`.
    DescendingCount { top_k: Option<usize> },
}

impl DistributionOrder {
    /// One policy per column class: ordered kinds read by key, open
    /// categorical columns by frequency.
    pub fn for_kind(kind: ColumnKind, top_k: Option<usize>) -> Self {
        if kind.is_ordered() {
            DistributionOrder::AscendingKey
        } else {
            DistributionOrder::DescendingCount { top_k }
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

/// Count selected records per value of `column`. Missing cells are not
/// counted; an unknown column gives an empty view.
pub fn distribution_by_category(
    selection: &Selection<'_>,
    column: &str,
    order: DistributionOrder,
) -> DistributionView {
    let mut counts: BTreeMap<Value, usize> = BTreeMap::new();
    if let Some(data) = selection.records().column(column) {
        for &row in selection.indices() {
            let value = data.value(row);
            if !value.is_missing() {
                *counts.entry(value).or_default() += 1;
            }
        }
    }

    let mut entries: Vec<DistributionEntry> = counts
        .into_iter()
        .map(|(key, count)| DistributionEntry { key, count })
        .collect();

    if let DistributionOrder::DescendingCount { top_k } = order {
        // stable: equal counts keep ascending key order
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        if let Some(k) = top_k {
            entries.truncate(k);
        }
    }

    DistributionView {
        column: column.to_string(),
        entries,
    }
}

/// Distribution ordered by the policy of the column's kind.
pub fn distribution(selection: &Selection<'_>, column: &str, top_k: Option<usize>) -> DistributionView {
    let order = selection
        .records()
        .kind(column)
        .map_or(DistributionOrder::AscendingKey, |kind| {
            DistributionOrder::for_kind(kind, top_k)
        });
    distribution_by_category(selection, column, order)
}

/// Coordinates of selected records where both are present, in record order.
/// Non-float or unknown columns give an empty view.
pub fn point_set(selection: &Selection<'_>, lat_column: &str, lng_column: &str) -> PointSetView {
    let records = selection.records();
    let (Some(lats), Some(lngs)) = (records.floats(lat_column), records.floats(lng_column)) else {
        return PointSetView::default();
    };

    let points = selection
        .indices()
        .iter()
        .filter_map(|&row| match (lats[row], lngs[row]) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        })
        .collect();

    PointSetView { points }
}

/// Exact-match count straight over the record set, bypassing predicate
/// composition. A value outside the column's domain counts zero.
pub fn count_by_exact_value(records: &RecordSet, column: &str, value: &Value) -> usize {
    let Some(data) = records.column(column) else {
        return 0;
    };
    (0..records.len())
        .filter(|&row| data.matches(row, value))
        .count()
}

/// Selected records whose `column` cell is missing. Every record counts as
/// missing for an unknown column.
pub fn missing_count(selection: &Selection<'_>, column: &str) -> usize {
    match selection.records().column(column) {
        Some(data) => selection
            .indices()
            .iter()
            .filter(|&&row| data.is_missing(row))
            .count(),
        None => selection.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply, Predicate};
    use crate::data::schema::{
        Schema, SEVERITY, START_HOUR, START_LAT, START_LNG, STATE, WEATHER_CONDITION,
    };
    use crate::error::ParseError;

    fn records(rows: &[[&str; 6]]) -> RecordSet {
        let schema = Schema::new([
            (STATE, ColumnKind::Categorical),
            (SEVERITY, ColumnKind::Ordinal),
            (WEATHER_CONDITION, ColumnKind::Categorical),
            (START_HOUR, ColumnKind::Ordinal),
            (START_LAT, ColumnKind::Coordinate),
            (START_LNG, ColumnKind::Coordinate),
        ]);
        let headers = [STATE, SEVERITY, WEATHER_CONDITION, START_HOUR, START_LAT, START_LNG]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Result<Vec<Value>, ParseError>> = rows
            .iter()
            .map(|r| Ok(r.iter().map(|s| Value::from_cell(s)).collect()))
            .collect();
        RecordSet::build(&schema, headers, rows).unwrap().0
    }

    fn five() -> RecordSet {
        records(&[
            ["NY", "2", "Rain", "8", "40.7", "-74.0"],
            ["NY", "3", "Fog", "8", "40.8", "-73.9"],
            ["CA", "2", "Clear", "17", "", "-118.2"],
            ["CA", "4", "Rain", "17", "34.1", "-118.3"],
            ["CA", "2", "Clear", "23", "34.2", "-118.4"],
        ])
    }

    #[test]
    fn severity_for_one_state_ascending() {
        let r = five();
        let sel = apply(&r, &[Predicate::equals(STATE, "CA")]);
        assert_eq!(sel.len(), 3);

        let view = distribution_by_category(&sel, SEVERITY, DistributionOrder::AscendingKey);
        assert_eq!(
            view.pairs(),
            vec![(Value::Integer(2), 2), (Value::Integer(4), 1)]
        );
    }

    #[test]
    fn missing_latitude_counts_for_severity_but_not_points() {
        let r = five();
        let sel = apply(&r, &[Predicate::equals(STATE, "CA")]);

        assert_eq!(distribution(&sel, SEVERITY, None).total(), 3);
        let points = point_set(&sel, START_LAT, START_LNG);
        assert_eq!(points.len(), 2);
        assert!(points.points.iter().all(|p| p.latitude > 34.0));
    }

    #[test]
    fn categorical_ordered_by_count_then_key_and_truncated() {
        let r = records(&[
            ["A", "1", "Rain", "1", "", ""],
            ["A", "1", "Snow", "1", "", ""],
            ["A", "1", "Clear", "1", "", ""],
            ["A", "1", "Snow", "1", "", ""],
            ["A", "1", "Clear", "1", "", ""],
            ["A", "1", "Fog", "1", "", ""],
            ["A", "1", "", "1", "", ""],
        ]);
        let sel = apply(&r, &[]);

        let view = distribution(&sel, WEATHER_CONDITION, Some(3));
        assert_eq!(
            view.pairs(),
            vec![
                (Value::from("Clear"), 2),
                (Value::from("Snow"), 2),
                (Value::from("Fog"), 1),
            ]
        );

        let all = distribution(&sel, WEATHER_CONDITION, None);
        assert_eq!(all.total(), sel.len() - missing_count(&sel, WEATHER_CONDITION));
    }

    #[test]
    fn empty_selection_gives_empty_views() {
        let r = five();
        let sel = apply(&r, &[Predicate::equals(STATE, "WA")]);
        assert!(distribution(&sel, SEVERITY, None).is_empty());
        assert!(point_set(&sel, START_LAT, START_LNG).is_empty());
    }

    #[test]
    fn out_of_domain_hour_counts_zero() {
        let r = five();
        assert_eq!(count_by_exact_value(&r, START_HOUR, &Value::Integer(17)), 2);
        assert_eq!(count_by_exact_value(&r, START_HOUR, &Value::Integer(25)), 0);
        assert_eq!(count_by_exact_value(&r, "Nope", &Value::Integer(1)), 0);
    }

    #[test]
    fn point_set_on_text_columns_is_empty() {
        let r = five();
        let sel = apply(&r, &[]);
        assert!(point_set(&sel, STATE, START_LNG).is_empty());
    }

    #[test]
    fn signed_zeros_share_one_key() {
        let r = records(&[
            ["NY", "2", "Rain", "8", "0.0", "-74.0"],
            ["NY", "3", "Fog", "8", "-0.0", "-73.9"],
            ["CA", "2", "Clear", "17", "34.1", "-118.2"],
        ]);
        let sel = apply(&r, &[Predicate::equals(START_LAT, 0.0)]);
        assert_eq!(sel.len(), 2);

        let view = distribution_by_category(&sel, START_LAT, DistributionOrder::AscendingKey);
        assert_eq!(view.pairs(), vec![(Value::Float(0.0), 2)]);
        assert_eq!(r.distinct_values(START_LAT).len(), 2);
    }
}

use serde::Serialize;

use crate::config::QueryConfig;
use crate::data::filter::{Choice, FilterSelections, ALL};
use crate::data::model::Value;
use crate::data::schema::{SEVERITY, START_HOUR, STATE, WEATHER_CONDITION};
use crate::handle::DatasetHandle;
use crate::view::{DistributionView, PointSetView, ScalarView, TableView};

// ---------------------------------------------------------------------------
// Selector choices
// ---------------------------------------------------------------------------

/// Columns offered as selectors, and whether each offers the [`ALL`] choice.
pub const FILTER_COLUMNS: &[(&str, bool)] = &[
    (STATE, false),
    (SEVERITY, false),
    (WEATHER_CONDITION, true),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterColumn {
    pub column: String,
    /// Choices in display order; `"All"` first when the column allows it.
    pub choices: Vec<Value>,
}

/// Populate every selector from the dataset's distinct values.
pub fn filter_options(handle: &DatasetHandle) -> Vec<FilterColumn> {
    FILTER_COLUMNS
        .iter()
        .map(|&(column, allow_all)| {
            let mut choices = Vec::new();
            if allow_all {
                choices.push(Value::from(ALL));
            }
            choices.extend(handle.distinct_values(column));
            FilterColumn {
                column: column.to_string(),
                choices,
            }
        })
        .collect()
}

/// Initial selector state: the first choice of every selector.
pub fn default_selections(options: &[FilterColumn]) -> FilterSelections {
    options
        .iter()
        .filter_map(|opt| {
            let first = opt.choices.first()?;
            let choice = match first {
                Value::Text(t) if t == ALL => Choice::All,
                v => Choice::Only(v.clone()),
            };
            Some((opt.column.clone(), choice))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Snapshot – everything one interaction re-renders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    pub filters: FilterSelections,
    pub hour: i64,
}

impl DashboardRequest {
    pub fn new(hour: i64) -> Self {
        Self {
            filters: FilterSelections::new(),
            hour,
        }
    }

    pub fn with_filter(mut self, column: &str, choice: Choice) -> Self {
        self.filters.insert(column.to_string(), choice);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub total: ScalarView,
    pub preview: TableView,
    pub filtered: ScalarView,
    pub filtered_preview: TableView,
    pub points: PointSetView,
    pub severity_filtered: DistributionView,
    pub severity_global: DistributionView,
    pub weather_top: DistributionView,
    pub hour: ScalarView,
    pub severity_at_hour: DistributionView,
}

/// Compute every view for one request. Pure: call it on every re-render.
pub fn snapshot(
    handle: &DatasetHandle,
    request: &DashboardRequest,
    query: &QueryConfig,
) -> DashboardSnapshot {
    let everything = handle.all();
    let filtered = handle.select_filters(&request.filters);
    let at_hour = handle.select_filters(&FilterSelections::from([(
        START_HOUR.to_string(),
        Choice::Only(Value::Integer(request.hour)),
    )]));
    let top_k = Some(query.top_k);

    DashboardSnapshot {
        total: handle.count("Total records", &everything),
        preview: TableView::head(&everything, query.preview_rows),
        filtered: handle.count("Filtered records", &filtered),
        filtered_preview: TableView::head(&filtered, query.preview_rows),
        points: handle.points(&filtered),
        severity_filtered: handle.distribution(&filtered, SEVERITY, top_k),
        severity_global: handle.distribution(&everything, SEVERITY, top_k),
        weather_top: handle.distribution(&everything, WEATHER_CONDITION, top_k),
        hour: handle.hour_count(request.hour),
        severity_at_hour: handle.distribution(&at_hour, SEVERITY, top_k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RecordSet;
    use crate::data::schema::Schema;
    use crate::error::ParseError;

    fn handle() -> DatasetHandle {
        let headers = "ID,State,Severity,Weather_Condition,Start_Hour,Start_Month,Start_Lat,Start_Lng"
            .split(',')
            .map(str::to_string)
            .collect();
        let rows: Vec<Result<Vec<Value>, ParseError>> = [
            "1,TX,2,Rain,12,1,30.2,-97.7",
            "2,TX,3,Rain,12,1,,-97.8",
            "3,OH,2,Clear,9,5,39.9,-83.0",
            "4,OH,2,,12,5,40.0,-83.1",
        ]
        .iter()
        .map(|line| Ok(line.split(',').map(Value::from_cell).collect()))
        .collect();
        let (records, report) = RecordSet::build(&Schema::accidents(), headers, rows).unwrap();
        DatasetHandle::from_records(records, report, "memory")
    }

    #[test]
    fn options_list_all_first_for_weather_only() {
        let opts = filter_options(&handle());
        assert_eq!(opts[0].choices, vec![Value::from("OH"), Value::from("TX")]);
        assert_eq!(opts[1].choices, vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(
            opts[2].choices,
            vec![Value::from(ALL), Value::from("Clear"), Value::from("Rain")]
        );

        let defaults = default_selections(&opts);
        assert_eq!(defaults[STATE], Choice::Only(Value::from("OH")));
        assert_eq!(defaults[WEATHER_CONDITION], Choice::All);
    }

    #[test]
    fn snapshot_views_agree() {
        let h = handle();
        let req = DashboardRequest::new(12)
            .with_filter(STATE, Choice::parse("TX"))
            .with_filter(WEATHER_CONDITION, Choice::parse(ALL));
        let snap = snapshot(&h, &req, &QueryConfig::default());

        assert_eq!(snap.total.value, 4);
        assert_eq!(snap.filtered.value, 2);
        assert_eq!(snap.filtered_preview.rows.len(), 2);
        assert_eq!(snap.points.len(), 1);
        assert_eq!(snap.severity_filtered.total(), 2);
        assert_eq!(snap.severity_global.total(), 4);
        assert_eq!(snap.hour.value, 3);
        assert_eq!(snap.severity_at_hour.total(), 3);
        assert_eq!(snap.weather_top.entries[0].key, Value::from("Rain"));

        // Same request, same snapshot.
        assert_eq!(snap, snapshot(&h, &req, &QueryConfig::default()));
    }
}

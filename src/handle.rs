use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::aggregate::{count_by_exact_value, distribution, point_set};
use crate::data::archive::{ArchiveCache, DatasetSpec, Fetcher};
use crate::data::filter::{apply, to_predicates, FilterSelections, Predicate, Selection};
use crate::data::loader::load_file;
use crate::data::model::{LoadReport, RecordSet, Value};
use crate::data::schema::{Schema, START_HOUR, START_LAT, START_LNG};
use crate::error::{LoadError, PipelineError};
use crate::view::{DistributionView, PointSetView, ScalarView};

// ---------------------------------------------------------------------------
// DatasetHandle – a loaded dataset and the queries over it
// ---------------------------------------------------------------------------

/// A loaded, read-only dataset. Cloning shares the same records, so a handle
/// can be passed to any number of concurrent queries.
///
/// Every query is a pure function of the handle and its arguments.
#[derive(Debug, Clone)]
pub struct DatasetHandle {
    records: Arc<RecordSet>,
    report: Arc<LoadReport>,
    source: PathBuf,
}

impl DatasetHandle {
    /// Load an already local tabular file.
    pub fn open(path: &Path, schema: &Schema) -> Result<Self, LoadError> {
        let (records, report) = load_file(path, schema)?;
        Ok(Self {
            records: Arc::new(records),
            report: Arc::new(report),
            source: path.to_path_buf(),
        })
    }

    /// Ensure the dataset is cached, then load it.
    pub fn acquire<F: Fetcher>(
        cache: &ArchiveCache<F>,
        spec: &DatasetSpec,
        schema: &Schema,
    ) -> Result<Self, PipelineError> {
        let path = cache.ensure(spec)?;
        Ok(Self::open(&path, schema)?)
    }

    /// Wrap records built elsewhere.
    pub fn from_records(records: RecordSet, report: LoadReport, source: impl Into<PathBuf>) -> Self {
        Self {
            records: Arc::new(records),
            report: Arc::new(report),
            source: source.into(),
        }
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn columns(&self) -> &[String] {
        self.records.column_names()
    }

    pub fn distinct_values(&self, column: &str) -> Vec<Value> {
        self.records.distinct_values(column)
    }

    // -- Query interface --

    /// The whole record set as a selection (global baselines).
    pub fn all(&self) -> Selection<'_> {
        Selection::all(&self.records)
    }

    pub fn select(&self, predicates: &[Predicate]) -> Selection<'_> {
        apply(&self.records, predicates)
    }

    /// Apply selector state: one choice per column, `All` meaning unconstrained.
    pub fn select_filters(&self, selections: &FilterSelections) -> Selection<'_> {
        self.select(&to_predicates(&self.records, selections))
    }

    /// Distribution of `column`, ordered by the policy of its kind. `top_k`
    /// only cuts frequency-ordered (categorical) distributions.
    pub fn distribution(
        &self,
        selection: &Selection<'_>,
        column: &str,
        top_k: Option<usize>,
    ) -> DistributionView {
        distribution(selection, column, top_k)
    }

    /// Start coordinates of the selected accidents.
    pub fn points(&self, selection: &Selection<'_>) -> PointSetView {
        point_set(selection, START_LAT, START_LNG)
    }

    /// Accidents starting in `hour` over the whole dataset. Hours outside 0–23
    /// simply count zero.
    pub fn hour_count(&self, hour: i64) -> ScalarView {
        let n = count_by_exact_value(&self.records, START_HOUR, &Value::Integer(hour));
        ScalarView::new(format!("Accidents at {hour}:00"), n)
    }

    pub fn count(&self, label: impl Into<String>, selection: &Selection<'_>) -> ScalarView {
        ScalarView::new(label, selection.len())
    }
}

use std::fmt;

// ---------------------------------------------------------------------------
// Well-known column names of the accident dataset
// ---------------------------------------------------------------------------

pub const STATE: &str = "State";
pub const SEVERITY: &str = "Severity";
pub const WEATHER_CONDITION: &str = "Weather_Condition";
pub const START_HOUR: &str = "Start_Hour";
pub const START_MONTH: &str = "Start_Month";
pub const START_LAT: &str = "Start_Lat";
pub const START_LNG: &str = "Start_Lng";

// ---------------------------------------------------------------------------
// ColumnKind – semantic class of a column
// ---------------------------------------------------------------------------

/// Semantic class of a column. Decides storage type at load time and the
/// ordering policy of distributions computed over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Open-ended text labels (state codes, weather conditions).
    Categorical,
    /// Small integer domains with a natural order (severity, hour, month).
    Ordinal,
    /// Floating-point latitude / longitude.
    Coordinate,
    /// Any other floating-point measurement.
    Continuous,
}

impl ColumnKind {
    /// Whether distributions over this kind read best ordered by key.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ColumnKind::Categorical)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Categorical => "categorical",
            ColumnKind::Ordinal => "ordinal",
            ColumnKind::Coordinate => "coordinate",
            ColumnKind::Continuous => "continuous",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Schema – required columns checked once at load
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

/// The set of columns a tabular file must provide, with their semantic kind.
/// Columns present in the file but not named here are kept with an inferred kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: impl IntoIterator<Item = (impl Into<String>, ColumnKind)>) -> Self {
        Schema {
            columns: columns
                .into_iter()
                .map(|(name, kind)| ColumnSpec {
                    name: name.into(),
                    kind,
                })
                .collect(),
        }
    }

    /// Columns the accident dashboard depends on.
    pub fn accidents() -> Self {
        Schema::new([
            (STATE, ColumnKind::Categorical),
            (SEVERITY, ColumnKind::Ordinal),
            (WEATHER_CONDITION, ColumnKind::Categorical),
            (START_HOUR, ColumnKind::Ordinal),
            (START_MONTH, ColumnKind::Ordinal),
            (START_LAT, ColumnKind::Coordinate),
            (START_LNG, ColumnKind::Coordinate),
        ])
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
    }

    /// Required columns absent from `headers`, in schema order.
    pub fn missing_from<'a>(&'a self, headers: &[String]) -> Vec<&'a str> {
        self.columns
            .iter()
            .filter(|c| !headers.iter().any(|h| h == &c.name))
            .map(|c| c.name.as_str())
            .collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::accidents()
    }
}

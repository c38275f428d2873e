//! Data layer: acquisition, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!   remote .zip / .gz
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ archive   │  fetch once, extract atomically → local tabular file
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse .csv / .json / .parquet → RecordSet (schema-checked)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  conjunction of predicates → Selection (row indices)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate  │  distributions, point sets, exact counts → views
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod archive;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;

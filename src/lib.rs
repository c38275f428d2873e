//! Acquisition, filtering and aggregation of traffic-accident records.
//!
//! The dataset is fetched once into a local cache, loaded into a read-only
//! columnar [`RecordSet`](data::model::RecordSet), and queried through a
//! shared [`DatasetHandle`](handle::DatasetHandle). Every query returns a
//! serializable view for an external renderer.

pub mod app;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod handle;
pub mod view;

pub use config::{AppConfig, ConfigManager, APP_NAME};
pub use error::{AcquireError, LoadError, ParseError, PipelineError};
pub use handle::DatasetHandle;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{Args, Command, QueryArgs};
use crate::config::{AppConfig, ConfigManager, APP_NAME};
use crate::dashboard::{self, DashboardRequest};
use crate::data::archive::{ArchiveCache, CacheStatus, DatasetSpec};
use crate::data::schema::Schema;
use crate::handle::DatasetHandle;
use crate::view::View;

// ---------------------------------------------------------------------------
// Command runner
// ---------------------------------------------------------------------------

pub struct ExplorerApp {
    pub config: AppConfig,
    pub spec: DatasetSpec,
    pub cache: ArchiveCache,
    pub schema: Schema,
}

#[derive(Debug, Serialize)]
struct FetchOutput<'a> {
    dataset: &'a str,
    path: PathBuf,
    rows_loaded: usize,
    rows_skipped: usize,
    missing: BTreeMap<&'a str, usize>,
}

#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    dataset: &'a str,
    cache_dir: PathBuf,
    status: CacheStatus,
}

impl ExplorerApp {
    /// Resolve configuration (file, then command-line overrides).
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => AppConfig::from_file(path)?,
            None => ConfigManager::new(APP_NAME)?.load_config()?,
        };
        if let Some(dir) = &args.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if let Some(url) = &args.url {
            config.dataset.url = Some(url.clone());
        }
        config.validate()?;
        Self::new(config)
    }

    pub fn new(config: AppConfig) -> Result<Self> {
        let cache = ArchiveCache::with_http(config.cache_dir()?, config.http_timeout());
        Ok(Self {
            spec: config.dataset_spec(),
            cache,
            schema: Schema::accidents(),
            config,
        })
    }

    /// Acquire and load the configured dataset.
    pub fn open(&self) -> Result<DatasetHandle> {
        let handle = DatasetHandle::acquire(&self.cache, &self.spec, &self.schema)
            .with_context(|| format!("opening dataset {}", self.spec.id))?;
        log::info!(
            "{} rows loaded from {}",
            handle.records().len(),
            handle.source().display()
        );
        Ok(handle)
    }

    pub fn run(&self, command: &Command, out: &mut dyn Write) -> Result<()> {
        match command {
            Command::Fetch => {
                let handle = self.open()?;
                let report = handle.report();
                emit(
                    out,
                    &FetchOutput {
                        dataset: &self.spec.id,
                        path: handle.source().to_path_buf(),
                        rows_loaded: report.rows_loaded,
                        rows_skipped: report.rows_skipped,
                        missing: handle.records().missing_counts(),
                    },
                    false,
                )
            }
            Command::Columns => {
                let handle = self.open()?;
                emit(out, handle.columns(), false)
            }
            Command::Options => {
                let handle = self.open()?;
                emit(out, &dashboard::filter_options(&handle), false)
            }
            Command::Query(query) => self.query(query, out),
            Command::Hour { hour } => {
                let handle = self.open()?;
                emit(out, &View::Scalar(handle.hour_count(*hour)), false)
            }
            Command::Status => emit(
                out,
                &StatusOutput {
                    dataset: &self.spec.id,
                    cache_dir: self.cache.dir().to_path_buf(),
                    status: self.cache.status(&self.spec),
                },
                false,
            ),
            Command::Clear => {
                self.cache
                    .evict(&self.spec)
                    .context("clearing the dataset cache")?;
                log::info!("cache cleared for {}", self.spec.id);
                emit(
                    out,
                    &StatusOutput {
                        dataset: &self.spec.id,
                        cache_dir: self.cache.dir().to_path_buf(),
                        status: self.cache.status(&self.spec),
                    },
                    false,
                )
            }
            // Runs in main before any config is loaded.
            Command::GenerateConfig { .. } => Ok(()),
        }
    }

    fn query(&self, args: &QueryArgs, out: &mut dyn Write) -> Result<()> {
        let handle = self.open()?;
        let mut query = self.config.query.clone();
        if let Some(k) = args.top_k {
            query.top_k = k;
        }
        let request = DashboardRequest {
            filters: args.selections(),
            hour: args.hour.unwrap_or(query.default_hour),
        };
        log::debug!("query {:?}", request);
        emit(out, &dashboard::snapshot(&handle, &request, &query), args.pretty)
    }
}

/// Write one JSON document followed by a newline.
fn emit<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Handle `generate-config` without touching the dataset.
pub fn generate_config(args: &Args, force: bool, out: &mut dyn Write) -> Result<()> {
    let path = match &args.config {
        Some(path) => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let text = toml::to_string_pretty(&AppConfig::default())
                .context("serializing default config")?;
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            path.clone()
        }
        None => ConfigManager::new(APP_NAME)?.write_default_config(force)?,
    };
    writeln!(out, "Config file written to {}", path.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn app_in(dir: &TempDir) -> ExplorerApp {
        let mut config = AppConfig::default();
        config.cache.dir = Some(dir.path().to_path_buf());
        config.dataset.file_name = "sample.csv".into();
        ExplorerApp::new(config).unwrap()
    }

    fn write_sample(dir: &TempDir) {
        std::fs::write(
            dir.path().join("sample.csv"),
            "ID,State,Severity,Weather_Condition,Start_Hour,Start_Month,Start_Lat,Start_Lng\n\
             1,CA,2,Rain,12,1,34.0,-118.2\n\
             2,CA,4,Fog,8,1,,-118.3\n\
             3,TX,2,Clear,12,3,30.2,-97.7\n",
        )
        .unwrap();
    }

    fn run(app: &ExplorerApp, argv: &[&str]) -> serde_json::Value {
        let args = Args::parse_from(argv);
        let mut out = Vec::new();
        app.run(&args.command, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn query_prints_snapshot_json() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir);
        let app = app_in(&dir);
        let json = run(&app, &["accident-explorer", "query", "--state", "CA"]);
        assert_eq!(json["filtered"]["value"], 2);
        assert_eq!(json["points"]["points"].as_array().unwrap().len(), 1);
        assert_eq!(json["hour"]["label"], "Accidents at 12:00");
        assert_eq!(json["hour"]["value"], 2);
    }

    #[test]
    fn fetch_reports_missing_cells_per_column() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir);
        let app = app_in(&dir);
        let json = run(&app, &["accident-explorer", "fetch"]);
        assert_eq!(json["rows_loaded"], 3);
        assert_eq!(json["rows_skipped"], 0);
        assert_eq!(json["missing"]["Start_Lat"], 1);
        assert_eq!(json["missing"]["State"], 0);
    }

    #[test]
    fn hour_prints_tagged_scalar() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir);
        let app = app_in(&dir);
        let json = run(&app, &["accident-explorer", "hour", "12"]);
        assert_eq!(json["kind"], "scalar");
        assert_eq!(json["label"], "Accidents at 12:00");
        assert_eq!(json["value"], 2);
    }

    #[test]
    fn status_and_clear_report_cache_state() {
        let dir = TempDir::new().unwrap();
        write_sample(&dir);
        let app = app_in(&dir);
        assert_eq!(run(&app, &["accident-explorer", "status"])["status"], "extracted");
        assert_eq!(run(&app, &["accident-explorer", "clear"])["status"], "absent");
    }

    #[test]
    fn fetch_without_url_on_empty_cache_fails() {
        let dir = TempDir::new().unwrap();
        let app = app_in(&dir);
        let mut out = Vec::new();
        let err = app.run(&Command::Fetch, &mut out).unwrap_err();
        assert!(format!("{err:#}").contains("dataset unavailable"));
    }

    #[test]
    fn generate_config_to_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let args = Args::parse_from([
            "accident-explorer",
            "--config",
            path.to_str().unwrap(),
            "generate-config",
        ]);
        let mut out = Vec::new();
        generate_config(&args, false, &mut out).unwrap();
        AppConfig::from_file(&path).unwrap();
        assert!(generate_config(&args, false, &mut out).is_err());
        generate_config(&args, true, &mut out).unwrap();
    }
}

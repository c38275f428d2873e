use accident_explorer::config::{AppConfig, ConfigManager, CONFIG_FILE};
use tempfile::TempDir;

#[test]
fn test_missing_config_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_dir(dir.path().to_path_buf());
    let config = manager.load_config().unwrap();
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.query.top_k, 10);
    assert_eq!(config.query.default_hour, 12);
}

#[test]
fn test_write_default_config_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let manager = ConfigManager::with_dir(dir.path().join("accident-explorer"));

    let path = manager.write_default_config(false).unwrap();
    assert_eq!(path, dir.path().join("accident-explorer").join(CONFIG_FILE));
    assert!(manager.write_default_config(false).is_err());
    manager.write_default_config(true).unwrap();
    assert_eq!(manager.load_config().unwrap(), AppConfig::default());
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE),
        r#"
[dataset]
url = "https://example.invalid/US_Accidents_sample100k.zip"

[query]
top_k = 5
"#,
    )
    .unwrap();

    let config = ConfigManager::with_dir(dir.path().to_path_buf())
        .load_config()
        .unwrap();
    assert_eq!(config.query.top_k, 5);
    assert_eq!(config.query.preview_rows, 5);
    assert_eq!(config.http.timeout_secs, 300);
    assert_eq!(
        config.dataset_spec().url.as_deref(),
        Some("https://example.invalid/US_Accidents_sample100k.zip")
    );
    assert_eq!(config.dataset.file_name, "US_Accidents_sample100k.csv");
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE), "[query]\ntop_k = 0\n").unwrap();
    let err = ConfigManager::with_dir(dir.path().to_path_buf())
        .load_config()
        .unwrap_err();
    assert!(err.to_string().contains("top_k"));
}

#[test]
fn test_cache_dir_override() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.cache.dir = Some(dir.path().to_path_buf());
    assert_eq!(config.cache_dir().unwrap(), dir.path());
}

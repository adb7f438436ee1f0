use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tabledb::{Result, ServerConfig, TableConfig, TableEngine, TableError};
use tempfile::TempDir;

#[test]
fn defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.addr, "127.0.0.1:7000");
    assert_eq!(config.max_sessions, 5);
    assert_eq!(config.grace_period(), Duration::from_secs(10));
    assert_eq!(config.worker_threads(), 5);
    assert_eq!(config.tables, vec![TableConfig::new("DemoData")]);
    assert!(config.validate().is_ok());
}

#[test]
fn reads_partial_file() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("tabledb.json");
    fs::write(
        &path,
        r#"{
            "max_sessions": 3,
            "grace_period_secs": 0.5,
            "tables": [ { "kind": "ScoreData" }, { "kind": "PlayerData", "path": "players.csv" } ],
            "kinds": { "PlayerData": [ { "name": "Level", "kind": "integer" } ] }
        }"#,
    )?;

    let config = ServerConfig::from_file(&path)?;
    assert_eq!(config.addr, ServerConfig::DEFAULT_ADDR);
    assert_eq!(config.max_sessions, 3);
    assert_eq!(config.worker_threads(), 3);
    assert_eq!(config.grace_period(), Duration::from_millis(500));
    assert_eq!(config.tables[1].path, Some(PathBuf::from("players.csv")));
    assert!(config.registry()?.resolve("PlayerData")?.has_field("Level"));
    Ok(())
}

#[test]
fn invalid_json() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let path = temp_dir.path().join("tabledb.json");
    fs::write(&path, "{ not json")?;
    assert!(matches!(ServerConfig::from_file(&path), Err(TableError::Json(_))));
    Ok(())
}

#[test]
fn validation() {
    let invalid = |edit: fn(&mut ServerConfig)| {
        let mut config = ServerConfig::default();
        edit(&mut config);
        config.validate()
    };

    assert!(matches!(invalid(|c| c.max_sessions = 0), Err(TableError::Config(_))));
    assert!(matches!(invalid(|c| c.grace_period_secs = -1.0), Err(TableError::Config(_))));
    assert!(matches!(invalid(|c| c.threads = Some(0)), Err(TableError::Config(_))));
    assert!(matches!(invalid(|c| c.tables.clear()), Err(TableError::Config(_))));
    assert!(matches!(
        invalid(|c| c.tables.push(TableConfig::new("DemoData"))),
        Err(TableError::Config(_))
    ));
    assert!(matches!(
        invalid(|c| c.addr = "localhost".to_string()),
        Err(TableError::Parsing(_))
    ));
}

#[test]
fn table_paths() {
    let data_dir = Path::new("data");
    assert_eq!(
        TableConfig::new("DemoData").resolve_path(data_dir),
        PathBuf::from("data/DemoData.csv")
    );

    let mut table = TableConfig::new("VersionData");
    table.path = Some(PathBuf::from("v.csv"));
    assert_eq!(table.resolve_path(data_dir), PathBuf::from("data/v.csv"));

    let absolute = std::env::temp_dir().join("v.csv");
    table.path = Some(absolute.clone());
    assert_eq!(table.resolve_path(data_dir), absolute);
}

#[test]
fn opens_configured_tables() -> Result<()> {
    let temp_dir = TempDir::new().expect("unable to create temporary working directory");
    let mut config = ServerConfig::default();
    config.data_dir = temp_dir.path().join("tables");
    config.tables = vec![TableConfig::new("DemoData"), TableConfig::new("VersionData")];

    let tables = config.open_tables()?;
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].kind(), "DemoData");
    assert!(temp_dir.path().join("tables").join("VersionData.csv").exists());

    config.tables.push(TableConfig::new("Unknown"));
    assert!(matches!(config.open_tables(), Err(TableError::UnknownKind(_))));
    Ok(())
}

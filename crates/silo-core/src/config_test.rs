use super::*;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn load_with_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("silo.yml");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "pipeline: health_etl").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.pipeline, "health_etl");
    assert_eq!(config.database, "silo.duckdb");
    assert_eq!(config.ruleset, "rules.yml");
    assert!(!config.force_reload);
}

#[test]
fn load_missing_file() {
    let err = Config::load(Path::new("/nonexistent/silo.yml")).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn unknown_fields_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("silo.yml");
    std::fs::write(&path, "pipeline: p\nunknown_key: true\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}

#[test]
fn empty_pipeline_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("silo.yml");
    std::fs::write(&path, "pipeline: '  '\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn paths_resolve_relative_to_root() {
    let config = Config {
        pipeline: "p".to_string(),
        database: "data/silo.duckdb".to_string(),
        ruleset: "conf/rules.yml".to_string(),
        force_reload: false,
    };
    let root = Path::new("/project");
    assert_eq!(
        config.database_path(root),
        PathBuf::from("/project/data/silo.duckdb")
    );
    assert_eq!(
        config.ruleset_path(root),
        PathBuf::from("/project/conf/rules.yml")
    );
}

use crate::commands::helpers::{expand_secrets, load_sources, read_statements, resolve_source};
use crate::exit_codes::{self, CliError};
use sluice_common::EngineKind;
use std::io::Write;

const SOURCES: &str = r#"
sources:
  - id: 1
    name: warehouse
    type: postgresql
    host: db.internal
    port: 5432
    database: analytics
    username: reader
    password: ${SLUICE_TEST_WAREHOUSE_PASSWORD}
  - id: 2
    name: local
    type: sqlite
    database: /tmp/local.db
"#;

fn sources_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_expand_secrets_keeps_unset_placeholders() {
    std::env::set_var("SLUICE_TEST_EXPANDED", "s3cret");
    assert_eq!(expand_secrets("pw: ${SLUICE_TEST_EXPANDED}"), "pw: s3cret");
    assert_eq!(
        expand_secrets("pw: ${SLUICE_TEST_NEVER_SET_42}"),
        "pw: ${SLUICE_TEST_NEVER_SET_42}"
    );
}

#[test]
fn test_resolve_source_by_id() {
    let file = sources_file(SOURCES);
    let sources = load_sources(file.path().to_str().unwrap()).unwrap();

    let warehouse = resolve_source(&sources, 1).unwrap();
    assert_eq!(warehouse.engine, EngineKind::Postgres);
    assert_eq!(warehouse.host, "db.internal");

    let local = resolve_source(&sources, 2).unwrap();
    assert_eq!(local.engine, EngineKind::Sqlite);
}

#[test]
fn test_unknown_source_is_usage_error() {
    let file = sources_file(SOURCES);
    let sources = load_sources(file.path().to_str().unwrap()).unwrap();

    let err = resolve_source(&sources, 9).unwrap_err();
    let cli_err = err.downcast_ref::<CliError>().unwrap();
    assert_eq!(cli_err.exit_code, exit_codes::USAGE_ERROR);
    assert!(cli_err.message.contains("known: 1, 2"));
}

#[test]
fn test_unsupported_engine_surfaces_on_resolve() {
    let file = sources_file(
        "sources:\n  - id: 3\n    name: legacy\n    type: oracle\n    database: x\n",
    );
    let sources = load_sources(file.path().to_str().unwrap()).unwrap();
    let err = resolve_source(&sources, 3).unwrap_err();
    assert_eq!(exit_codes::for_error(&err), exit_codes::CONFIG_ERROR);
}

#[test]
fn test_missing_sources_file_is_config_error() {
    let err = load_sources("/nonexistent/sources.yaml").unwrap_err();
    assert_eq!(exit_codes::for_error(&err), exit_codes::CONFIG_ERROR);
}

#[test]
fn test_read_statements() {
    let content = "-- workload\nSELECT a FROM t WHERE b = 1;\n\n  SELECT c FROM t  \n;\n";
    assert_eq!(
        read_statements(content),
        vec!["SELECT a FROM t WHERE b = 1".to_string(), "SELECT c FROM t".to_string()]
    );
}

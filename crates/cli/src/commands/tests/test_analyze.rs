use crate::commands::analyze::plan;
use sluice_common::config::AppConfig;
use sluice_common::EngineKind;
use sluice_sql::{Complexity, QueryClass};
use std::io::Write;

#[test]
fn test_plan_without_source() {
    let plan = plan(
        "SELECT u.name FROM users u JOIN orders o ON o.user_id = u.id WHERE u.id = 1",
        None,
        "unused.yaml",
        &AppConfig::default(),
    )
    .unwrap();

    assert_eq!(plan.tables, vec!["users".to_string(), "orders".to_string()]);
    assert_eq!(plan.joins.len(), 1);
    assert_eq!(plan.classification, QueryClass::Standard);
    assert_eq!(plan.complexity, Complexity::Medium);
    assert!(plan.engine.is_none());
}

#[test]
fn test_plan_uses_source_engine() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"sources:\n  - id: 4\n    name: shop\n    type: mysql\n    host: h\n    database: shop\n")
        .unwrap();

    let plan = plan(
        "SELECT id FROM orders",
        Some(4),
        file.path().to_str().unwrap(),
        &AppConfig::default(),
    )
    .unwrap();
    assert_eq!(plan.engine, Some(EngineKind::MySql));
}

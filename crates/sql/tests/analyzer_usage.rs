use sluice_common::config::AnalyzerSettings;
use sluice_common::EngineKind;
use sluice_sql::{Benefit, Complexity, QueryAnalyzer, QueryClass};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_repeated_filters_produce_index_suggestion() {
    let analyzer = QueryAnalyzer::default();
    let sql = "SELECT a FROM t WHERE b = 1";

    let plan = analyzer.analyze(sql, Some(EngineKind::Postgres));
    assert_eq!(plan.tables, vec!["t".to_string()]);
    assert_eq!(plan.complexity, Complexity::Low);
    assert_eq!(plan.classification, QueryClass::Simple);

    analyzer.analyze(sql, Some(EngineKind::Postgres));
    assert!(analyzer.suggest_indexes().is_empty());

    analyzer.analyze(sql, Some(EngineKind::Postgres));
    let suggestions = analyzer.suggest_indexes();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].index_name, "idx_t_b");
    assert_eq!(suggestions[0].index_type, "btree");
}

#[test]
fn test_mysql_ddl_and_benefit_tiers() {
    let analyzer = QueryAnalyzer::default();
    for _ in 0..10 {
        analyzer.analyze(
            "SELECT id FROM orders WHERE customer_id = 7",
            Some(EngineKind::MySql),
        );
    }
    for _ in 0..5 {
        analyzer.analyze("SELECT id FROM orders WHERE status = 'open'", None);
    }

    let suggestions = analyzer.suggest_indexes();
    assert_eq!(suggestions.len(), 2);

    assert_eq!(suggestions[0].columns, vec!["customer_id".to_string()]);
    assert_eq!(suggestions[0].estimated_benefit, Benefit::High);
    assert_eq!(
        suggestions[0].create_statement,
        "CREATE INDEX `idx_orders_customer_id` ON `orders` (`customer_id`)"
    );

    // No engine seen for this pair, so the DDL falls back to Postgres syntax.
    assert_eq!(suggestions[1].estimated_benefit, Benefit::Medium);
    assert!(suggestions[1].create_statement.starts_with("CREATE INDEX IF NOT EXISTS"));
}

#[test]
fn test_custom_threshold() {
    let analyzer = QueryAnalyzer::new(AnalyzerSettings {
        index_usage_threshold: 1,
        ..Default::default()
    });
    analyzer.analyze("SELECT * FROM s.events e WHERE e.kind = 'click'", None);

    let suggestions = analyzer.suggest_indexes();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].table, "s.events");
    assert_eq!(suggestions[0].index_name, "idx_s_events_kind");
}

#[test]
fn test_concurrent_analysis_keeps_counters_consistent() {
    let analyzer = Arc::new(QueryAnalyzer::default());

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let analyzer = analyzer.clone();
            scope.spawn(move || {
                for i in 0..25 {
                    let plan = analyzer.analyze(
                        &format!("SELECT a FROM t{} WHERE b = {}", worker, i),
                        None,
                    );
                    analyzer.record_execution(&plan.query_id, Duration::from_millis(5), 1);
                }
            });
        }
    });

    let stats = analyzer.stats();
    assert_eq!(stats.queries_analyzed, 200);
    assert_eq!(stats.executions_recorded, 200);
    assert_eq!(stats.slow_queries, 0);
    assert_eq!(stats.indexes_suggested, 8);
    assert!((stats.avg_execution_ms - 5.0).abs() < 1e-6);
}

#[test]
fn test_plan_serializes_execution_time_in_millis() {
    let analyzer = QueryAnalyzer::default();
    let plan = analyzer.analyze("SELECT a FROM t WHERE b = 1", None);
    let plan = analyzer
        .record_execution(&plan.query_id, Duration::from_millis(42), 1)
        .unwrap();

    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["execution_time"], 42.0);
    assert_eq!(json["complexity"], "low");
    assert_eq!(json["classification"], "simple");
}

//! Integration tests for reading schemas from `system.*` tables.

mod common;

use chschema::introspect::{get_database, get_table, get_view, table_engine, table_exists};
use chschema::prelude::*;
use common::{MockConnection, row};
use serde_json::json;

#[tokio::test]
async fn test_get_table_parses_descriptor() {
    let conn = MockConnection::new()
        .respond(
            "\"system\".\"tables\" WHERE database = 'db' AND name = 'events'",
            vec![row(json!({
                "engine": "ReplacingMergeTree",
                "engine_full": "ReplacingMergeTree(version) PARTITION BY toYYYYMM(date) \
                                ORDER BY (id, date) SETTINGS index_granularity = 8192, \
                                storage_policy = 'hot'",
                "partition_key": "toYYYYMM(date)",
                "sorting_key": "id, date",
                "primary_key": "id",
                "comment": "all events",
            }))],
        )
        .respond(
            "\"system\".\"columns\"",
            vec![
                row(json!({ "name": "id", "type": "UInt64", "comment": "" })),
                row(json!({ "name": "date", "type": "Date", "comment": "day" })),
                row(json!({ "name": "value", "type": "Nullable(Float64)", "comment": "" })),
                row(json!({ "name": "version", "type": "UInt32", "comment": "" })),
            ],
        );

    let table = get_table(&conn, "db", "events").await.unwrap();

    assert_eq!(table.engine, "ReplacingMergeTree");
    assert_eq!(table.engine_params, vec!["version"]);
    assert_eq!(table.partition_by, "toYYYYMM(date)");
    assert_eq!(table.order_by, vec!["id", "date"]);
    assert_eq!(table.primary_key, vec!["id"]);
    assert_eq!(table.comment, "all events");
    assert_eq!(table.settings.len(), 2);
    assert_eq!(table.settings["storage_policy"], "hot");

    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "date", "value", "version"]);
    assert_eq!(table.columns[1].comment, "day");
    assert!(table.columns[2].nullable);
    assert_eq!(table.columns[2].column_type, "Float64");

    let queries = conn.queries();
    assert!(queries[1].ends_with("ORDER BY \"position\""));
}

#[tokio::test]
async fn test_get_table_rejects_malformed_settings() {
    let conn = MockConnection::new().respond(
        "\"system\".\"tables\"",
        vec![row(json!({
            "engine": "MergeTree",
            "engine_full": "MergeTree ORDER BY id SETTINGS broken",
        }))],
    );

    let err = get_table(&conn, "db", "t").await.unwrap_err();
    assert!(matches!(
        err,
        ChError::Schema(SchemaError::InvalidDescriptor { .. })
    ));
}

#[tokio::test]
async fn test_get_table_not_found() {
    let conn = MockConnection::new();
    match get_table(&conn, "db", "missing").await.unwrap_err() {
        ChError::NotFound { entity, name, query } => {
            assert_eq!(entity, "table");
            assert_eq!(name, "db.missing");
            assert!(query.contains("name = 'missing'"));
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }
    assert!(!table_exists(&conn, "db", "missing").await.unwrap());
}

#[tokio::test]
async fn test_table_engine() {
    let conn = MockConnection::new().with_table(
        "db",
        "queue",
        "RabbitMQ SETTINGS rabbitmq_format = 'JSONEachRow'",
        "",
        &[("a", "String")],
    );
    assert_eq!(
        table_engine(&conn, "db", "queue").await.unwrap().as_deref(),
        Some("RabbitMQ")
    );
    assert_eq!(table_engine(&conn, "db", "missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_get_database() {
    let conn = MockConnection::new()
        .respond(
            "WHERE name = 'analytics'",
            vec![row(json!({ "engine": "Atomic", "comment": "events" }))],
        )
        .respond(
            "WHERE name = 'legacy'",
            vec![row(json!({ "engine": "Ordinary", "comment": "" }))],
        );

    let db = get_database(&conn, "analytics").await.unwrap();
    assert_eq!(db.engine, DatabaseEngine::Atomic);
    assert_eq!(db.comment, "events");

    assert!(matches!(
        get_database(&conn, "legacy").await,
        Err(ChError::Schema(SchemaError::InvalidDescriptor { .. }))
    ));
    assert!(matches!(
        get_database(&conn, "nope").await,
        Err(ChError::NotFound { entity: "database", .. })
    ));
}

#[test]
fn test_get_view() {
    let conn = MockConnection::new().respond(
        "engine = 'View'",
        vec![row(json!({ "as_select": "SELECT id FROM db.events" }))],
    );

    let view = tokio_test::block_on(get_view(&conn, "db", "v")).unwrap();
    assert_eq!(view, ViewSchema::new("db", "v", "SELECT id FROM db.events"));
}

//! Reading the current schema from the server.
//!
//! Snapshots are built from the `system.*` tables. Only `String` columns are
//! selected so every value arrives as a JSON string.

use chschema_core::descriptor::{parse_engine_params, parse_settings, split_expression_list};
use chschema_core::error::SchemaError;
use chschema_core::quote::{quote_identifier, quote_literal};
use chschema_core::schema::{Column, DatabaseEngine, DatabaseSchema, TableSchema, ViewSchema};
use tracing::debug;

use crate::connection::{Connection, Row};
use crate::error::{ChError, Result};

/// Returns a string field of a row, empty when missing.
fn text(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn table_lookup(database: &str, name: &str) -> String {
    format!(
        "SELECT engine, engine_full, partition_key, sorting_key, primary_key, comment \
         FROM \"system\".\"tables\" WHERE database = {} AND name = {}",
        quote_literal(database),
        quote_literal(name)
    )
}

/// Reads the schema of `database.name`.
///
/// # Errors
///
/// Returns [`ChError::NotFound`] when the table does not exist, and
/// [`ChError::Schema`] when its engine descriptor cannot be parsed.
pub async fn get_table<C: Connection>(
    conn: &C,
    database: &str,
    name: &str,
) -> Result<TableSchema> {
    let query = table_lookup(database, name);
    let rows = conn.query(&query).await?;
    let Some(row) = rows.first() else {
        return Err(ChError::NotFound {
            entity: "table",
            name: format!("{database}.{name}"),
            query,
        });
    };

    let engine_full = text(row, "engine_full");
    let mut table = TableSchema::new(database, name, text(row, "engine"))
        .engine_params(parse_engine_params(&engine_full))
        .partition_by(text(row, "partition_key"))
        .order_by(split_expression_list(&text(row, "sorting_key")))
        .primary_key(split_expression_list(&text(row, "primary_key")))
        .comment(text(row, "comment"));
    table.settings = parse_settings(&engine_full)?;
    table.columns = get_columns(conn, database, name).await?;

    debug!(
        table = %table.full_name(),
        columns = table.columns.len(),
        "Introspected table"
    );
    Ok(table)
}

async fn get_columns<C: Connection>(
    conn: &C,
    database: &str,
    table: &str,
) -> Result<Vec<Column>> {
    let query = format!(
        "SELECT \"name\", \"type\", \"comment\" FROM \"system\".\"columns\" \
         WHERE database = {} AND table = {} ORDER BY \"position\"",
        quote_literal(database),
        quote_literal(table)
    );

    Ok(conn
        .query(&query)
        .await?
        .iter()
        .map(|row| {
            Column::from_introspected(text(row, "name"), &text(row, "type"), text(row, "comment"))
        })
        .collect())
}

/// Returns whether `database.name` exists.
///
/// # Errors
///
/// Propagates connection failures.
pub async fn table_exists<C: Connection>(conn: &C, database: &str, name: &str) -> Result<bool> {
    Ok(!conn.query(&table_lookup(database, name)).await?.is_empty())
}

/// Returns the engine of `database.name`, or `None` when nothing by that name
/// exists. Views report `View`.
///
/// # Errors
///
/// Propagates connection failures.
pub async fn table_engine<C: Connection>(
    conn: &C,
    database: &str,
    name: &str,
) -> Result<Option<String>> {
    let rows = conn.query(&table_lookup(database, name)).await?;
    Ok(rows.first().map(|row| text(row, "engine")))
}

/// Returns whether `database.name` holds no rows.
///
/// # Errors
///
/// Propagates connection failures, including a missing table.
pub async fn is_table_empty<C: Connection>(conn: &C, database: &str, name: &str) -> Result<bool> {
    let query = format!(
        "SELECT 1 FROM {}.{} LIMIT 1",
        quote_identifier(database),
        quote_identifier(name)
    );
    Ok(conn.query(&query).await?.is_empty())
}

/// Reads a database definition.
///
/// # Errors
///
/// Returns [`ChError::NotFound`] when the database does not exist, and
/// [`ChError::Schema`] when it uses an engine that cannot be managed.
pub async fn get_database<C: Connection>(conn: &C, name: &str) -> Result<DatabaseSchema> {
    let query = format!(
        "SELECT engine, comment FROM \"system\".\"databases\" WHERE name = {}",
        quote_literal(name)
    );
    let rows = conn.query(&query).await?;
    let Some(row) = rows.first() else {
        return Err(ChError::NotFound {
            entity: "database",
            name: name.to_string(),
            query,
        });
    };

    let engine_name = text(row, "engine");
    let engine =
        DatabaseEngine::parse(&engine_name).ok_or_else(|| SchemaError::InvalidDescriptor {
            descriptor: engine_name.clone(),
            message: format!("database '{name}' uses an unsupported engine"),
        })?;

    Ok(DatabaseSchema {
        name: name.to_string(),
        engine,
        comment: text(row, "comment"),
    })
}

/// Reads a view definition.
///
/// # Errors
///
/// Returns [`ChError::NotFound`] when no view called `database.name` exists.
pub async fn get_view<C: Connection>(conn: &C, database: &str, name: &str) -> Result<ViewSchema> {
    let query = format!(
        "SELECT as_select FROM \"system\".\"tables\" \
         WHERE database = {} AND name = {} AND engine = 'View'",
        quote_literal(database),
        quote_literal(name)
    );
    let rows = conn.query(&query).await?;
    let Some(row) = rows.first() else {
        return Err(ChError::NotFound {
            entity: "view",
            name: format!("{database}.{name}"),
            query,
        });
    };

    Ok(ViewSchema::new(database, name, text(row, "as_select")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field() {
        let row: Row = serde_json::from_str(r#"{"a":"x","b":1,"c":null}"#).unwrap();
        assert_eq!(text(&row, "a"), "x");
        assert_eq!(text(&row, "b"), "1");
        assert_eq!(text(&row, "c"), "");
        assert_eq!(text(&row, "missing"), "");
    }

    #[test]
    fn test_table_lookup_quotes_literals() {
        let query = table_lookup("db", "it's");
        assert!(query.ends_with(r"WHERE database = 'db' AND name = 'it\'s'"));
    }
}

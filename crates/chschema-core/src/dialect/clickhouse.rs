//! ClickHouse dialect.
//!
//! Identifiers in statement heads are double-quoted, column names inside
//! column lists and key clauses use backticks. Column types, engine
//! parameters, partition expressions and view queries are expressions and
//! are emitted as given.

use crate::operations::{AlterOperation, ColumnPlacement, SchemaOperation};
use crate::quote::{
    quote_identifier, quote_list_with_ticks_and_join, quote_literal, quote_map_and_join,
    quote_with_ticks,
};
use crate::schema::{Column, DatabaseSchema, TableSchema, ViewSchema};

use super::Dialect;

/// ClickHouse SQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseDialect;

impl ClickHouseDialect {
    /// Creates a new ClickHouse dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn qualified(database: &str, name: &str) -> String {
        format!("{}.{}", quote_identifier(database), quote_identifier(name))
    }

    fn column_definition(column: &Column) -> String {
        let mut def = format!("{} {}", quote_with_ticks(&column.name), column.full_type());
        if !column.comment.is_empty() {
            def.push_str(" COMMENT ");
            def.push_str(&quote_literal(&column.comment));
        }
        def
    }

    fn create_table_sql(table: &TableSchema) -> String {
        let columns: Vec<String> = table.columns.iter().map(Self::column_definition).collect();

        let mut sql = format!(
            "CREATE TABLE {} ({}) ENGINE = {}({})",
            Self::qualified(&table.database, &table.name),
            columns.join(", "),
            quote_identifier(&table.engine),
            table.engine_params.join(", "),
        );

        if !table.partition_by.is_empty() {
            sql.push_str(" PARTITION BY ");
            sql.push_str(&table.partition_by);
        }
        if !table.order_by.is_empty() {
            sql.push_str(&format!(
                " ORDER BY ({})",
                quote_list_with_ticks_and_join(&table.order_by)
            ));
        }
        if !table.primary_key.is_empty() {
            sql.push_str(&format!(
                " PRIMARY KEY ({})",
                quote_list_with_ticks_and_join(&table.primary_key)
            ));
        }
        if !table.settings.is_empty() {
            sql.push_str(" SETTINGS ");
            sql.push_str(&quote_map_and_join(&table.settings));
        }
        if !table.comment.is_empty() {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(&table.comment));
        }

        sql
    }

    fn create_database_sql(database: &DatabaseSchema) -> String {
        let mut sql = format!(
            "CREATE DATABASE {} ENGINE = {}",
            quote_identifier(&database.name),
            database.engine
        );
        if !database.comment.is_empty() {
            sql.push_str(" COMMENT ");
            sql.push_str(&quote_literal(&database.comment));
        }
        sql
    }

    fn create_view_sql(view: &ViewSchema, replace: bool) -> String {
        let verb = if replace {
            "CREATE OR REPLACE VIEW"
        } else {
            "CREATE VIEW"
        };
        format!(
            "{verb} {} AS {}",
            Self::qualified(&view.database, &view.name),
            view.query
        )
    }
}

impl Dialect for ClickHouseDialect {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn generate_sql(&self, operation: &SchemaOperation) -> String {
        match operation {
            SchemaOperation::CreateTable(table) => Self::create_table_sql(table),
            SchemaOperation::DropTable { database, name } => {
                format!("DROP TABLE {}", Self::qualified(database, name))
            }
            SchemaOperation::RenameTable { database, from, to } => format!(
                "RENAME TABLE {} TO {}",
                Self::qualified(database, from),
                Self::qualified(database, to)
            ),
            SchemaOperation::AlterTable {
                database,
                table,
                operation,
            } => self.alter_sql(database, table, operation),
            SchemaOperation::CreateDatabase(database) => Self::create_database_sql(database),
            SchemaOperation::DropDatabase { name } => {
                format!("DROP DATABASE {} SYNC", quote_identifier(name))
            }
            SchemaOperation::CreateView { view, replace } => Self::create_view_sql(view, *replace),
            SchemaOperation::DropView { database, name } => {
                format!("DROP VIEW {}", Self::qualified(database, name))
            }
        }
    }

    fn alter_sql(&self, database: &str, table: &str, operation: &AlterOperation) -> String {
        let action = match operation {
            AlterOperation::AddColumn {
                name,
                column_type,
                comment,
            } => format!(
                "ADD COLUMN {} {column_type} COMMENT {}",
                quote_identifier(name),
                quote_literal(comment)
            ),
            AlterOperation::ChangeColumnType {
                name,
                column_type,
                comment,
            } => format!(
                "MODIFY COLUMN {} {column_type} COMMENT {}",
                quote_identifier(name),
                quote_literal(comment)
            ),
            AlterOperation::ReorderColumn {
                name,
                column_type,
                placement,
            } => {
                let position = match placement {
                    ColumnPlacement::First => "FIRST".to_string(),
                    ColumnPlacement::After(anchor) => format!("AFTER {}", quote_identifier(anchor)),
                };
                format!(
                    "MODIFY COLUMN {} {column_type} {position}",
                    quote_identifier(name)
                )
            }
            AlterOperation::ModifySettings { settings } => {
                format!("MODIFY SETTING {}", quote_map_and_join(settings))
            }
            AlterOperation::ResetSettings { names } => {
                let names: Vec<&String> = names.iter().collect();
                format!("RESET SETTING {}", quote_list_with_ticks_and_join(&names))
            }
            AlterOperation::ModifyOrderBy { expressions } => {
                format!(
                    "MODIFY ORDER BY ({})",
                    quote_list_with_ticks_and_join(expressions)
                )
            }
        };

        format!("ALTER TABLE {} {action}", Self::qualified(database, table))
    }
}

//! Schema executor.
//!
//! Plans changes by comparing declarations with what the server reports, and
//! applies them one statement at a time. ClickHouse DDL is not
//! transactional: when a statement fails, the ones before it stay applied.

use chschema_core::dialect::Dialect;
use chschema_core::operations::SchemaOperation;
use chschema_core::reconcile::{
    has_immutable_settings, order_by_unreconciled, reconcile, recreation_required,
};
use chschema_core::schema::{DatabaseSchema, TableSchema, ViewSchema};
use tracing::{debug, info, warn};

use crate::config::{DesiredState, TableDeclaration};
use crate::connection::Connection;
use crate::error::{ChError, Result};
use crate::introspect::{
    get_database, get_table, get_view, is_table_empty, table_engine, table_exists,
};

/// Plans and applies schema changes against a server.
pub struct SchemaExecutor<C: Connection, D: Dialect> {
    conn: C,
    dialect: D,
    dry_run: bool,
}

impl<C: Connection, D: Dialect> SchemaExecutor<C, D> {
    /// Creates a new executor.
    pub fn new(conn: C, dialect: D) -> Self {
        Self {
            conn,
            dialect,
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    ///
    /// Introspection queries still run, since planning needs them.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Returns the connection.
    #[must_use]
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Renders the statements for a plan without running them.
    #[must_use]
    pub fn render(&self, operations: &[SchemaOperation]) -> Vec<String> {
        operations
            .iter()
            .map(|op| self.dialect.generate_sql(op))
            .collect()
    }

    /// Plans every declaration: databases, then tables, then views.
    ///
    /// # Errors
    ///
    /// Fails on the first declaration that cannot be planned.
    pub async fn plan(&self, state: &DesiredState) -> Result<Vec<SchemaOperation>> {
        let mut operations = Vec::new();
        for database in &state.databases {
            operations.extend(self.plan_database(database).await?);
        }
        for table in &state.tables {
            operations.extend(self.plan_table(table).await?);
        }
        for view in &state.views {
            operations.extend(self.plan_view(view).await?);
        }

        debug!(operations = operations.len(), "Planned desired state");
        Ok(operations)
    }

    /// Plans a single table.
    ///
    /// The table is created when absent. When only the table named in
    /// `renamed_from` exists, it is renamed and then reconciled.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::RequiresRecreation`] when immutable attributes
    /// differ and [`ChError::Schema`] when columns would be removed.
    pub async fn plan_table(
        &self,
        declaration: &TableDeclaration,
    ) -> Result<Vec<SchemaOperation>> {
        let database = &declaration.database;

        if table_exists(&self.conn, database, &declaration.name).await? {
            let current = get_table(&self.conn, database, &declaration.name).await?;
            return Self::plan_update(&current, declaration);
        }

        if let Some(old_name) = &declaration.renamed_from {
            if table_exists(&self.conn, database, old_name).await? {
                let current = get_table(&self.conn, database, old_name).await?;
                return Self::plan_rename_and_update(current, declaration);
            }
        }

        debug!(table = %declaration.full_name(), "Table does not exist, planning creation");
        Ok(vec![SchemaOperation::CreateTable(declaration.resolve(None))])
    }

    fn plan_rename_and_update(
        mut current: TableSchema,
        declaration: &TableDeclaration,
    ) -> Result<Vec<SchemaOperation>> {
        let mut operations = vec![SchemaOperation::rename_table(
            &declaration.database,
            &current.name,
            &declaration.name,
        )];
        current.name.clone_from(&declaration.name);
        operations.extend(Self::plan_update(&current, declaration)?);
        Ok(operations)
    }

    fn plan_update(
        current: &TableSchema,
        declaration: &TableDeclaration,
    ) -> Result<Vec<SchemaOperation>> {
        let desired = declaration.resolve(Some(current));
        let table = desired.full_name();

        let attributes = recreation_required(current, &desired);
        if !attributes.is_empty() {
            return Err(ChError::RequiresRecreation {
                table,
                attributes: attributes.into_iter().map(str::to_string).collect(),
            });
        }

        if order_by_unreconciled(current, &desired) {
            warn!(
                table = %table,
                current = ?current.order_by,
                desired = ?desired.order_by,
                "ORDER BY differs but is only reconciled for multi-expression keys"
            );
        }

        let plan = reconcile(current, &desired)?;
        debug!(table = %table, steps = plan.len(), "Planned table update");

        Ok(plan
            .into_iter()
            .map(|op| SchemaOperation::alter(&desired.database, &desired.name, op))
            .collect())
    }

    /// Plans a database.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::RequiresRecreation`] when an existing database has
    /// a different engine or comment.
    pub async fn plan_database(&self, database: &DatabaseSchema) -> Result<Vec<SchemaOperation>> {
        let current = match get_database(&self.conn, &database.name).await {
            Ok(current) => current,
            Err(ChError::NotFound { .. }) => {
                return Ok(vec![SchemaOperation::CreateDatabase(database.clone())]);
            }
            Err(e) => return Err(e),
        };

        let mut attributes = Vec::new();
        if current.engine != database.engine {
            attributes.push("engine".to_string());
        }
        if current.comment != database.comment {
            attributes.push("comment".to_string());
        }
        if !attributes.is_empty() {
            return Err(ChError::RequiresRecreation {
                table: database.name.clone(),
                attributes,
            });
        }

        Ok(Vec::new())
    }

    /// Plans a view, replacing it when it already exists.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::KindMismatch`] when a table holds the view's name,
    /// and propagates introspection failures.
    pub async fn plan_view(&self, view: &ViewSchema) -> Result<Vec<SchemaOperation>> {
        let replace = match get_view(&self.conn, &view.database, &view.name).await {
            Ok(_) => true,
            Err(ChError::NotFound { .. }) => {
                let existing = table_engine(&self.conn, &view.database, &view.name).await?;
                if let Some(engine) = existing {
                    return Err(ChError::KindMismatch {
                        name: view.full_name(),
                        expected: "view",
                        found: engine,
                    });
                }
                false
            }
            Err(e) => return Err(e),
        };

        Ok(vec![SchemaOperation::CreateView {
            view: view.clone(),
            replace,
        }])
    }

    /// Applies operations in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::Operation`] naming the failed operation. Earlier
    /// operations are not rolled back.
    pub async fn apply(&self, operations: &[SchemaOperation]) -> Result<()> {
        for operation in operations {
            let description = operation.description();
            let sql = self.dialect.generate_sql(operation);

            info!(sql = %sql, "{description}");

            if self.dry_run {
                println!("{sql};");
                continue;
            }

            self.conn
                .exec(&sql)
                .await
                .map_err(|source| ChError::Operation {
                    description,
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }

    /// Creates a table.
    ///
    /// # Errors
    ///
    /// Fails when the server rejects the statement.
    pub async fn create_table(&self, table: &TableSchema) -> Result<()> {
        self.apply(&[SchemaOperation::CreateTable(table.clone())]).await
    }

    /// Brings the table currently called `current_name` in line with `desired`.
    ///
    /// A differing name is applied as a rename before any alteration.
    ///
    /// # Errors
    ///
    /// Fails when the table is missing, the change is not supported, or a
    /// statement is rejected.
    pub async fn update_table(
        &self,
        current_name: &str,
        desired: &TableDeclaration,
    ) -> Result<()> {
        let current = get_table(&self.conn, &desired.database, current_name).await?;

        let operations = if current_name == desired.name {
            Self::plan_update(&current, desired)?
        } else {
            Self::plan_rename_and_update(current, desired)?
        };

        info!(
            table = %desired.full_name(),
            steps = operations.len(),
            "Updating table"
        );
        self.apply(&operations).await
    }

    /// Drops a table, refusing when it holds rows and `check_empty` is set.
    ///
    /// Queue-backed tables (see [`has_immutable_settings`]) are never
    /// checked, since selecting from them consumes messages.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::TableNotEmpty`] when the emptiness check fails.
    pub async fn drop_table(&self, database: &str, name: &str, check_empty: bool) -> Result<()> {
        if check_empty {
            let engine = table_engine(&self.conn, database, name).await?;
            let queue_backed = engine.as_deref().is_some_and(has_immutable_settings);
            if queue_backed {
                debug!(database, table = name, "Skipping emptiness check for queue engine");
            } else if !is_table_empty(&self.conn, database, name).await? {
                return Err(ChError::TableNotEmpty {
                    table: format!("{database}.{name}"),
                });
            }
        }
        self.apply(&[SchemaOperation::drop_table(database, name)]).await
    }

    /// Drops a view.
    ///
    /// # Errors
    ///
    /// Fails when the server rejects the statement.
    pub async fn drop_view(&self, database: &str, name: &str) -> Result<()> {
        self.apply(&[SchemaOperation::DropView {
            database: database.to_string(),
            name: name.to_string(),
        }])
        .await
    }

    /// Drops a database and everything in it.
    ///
    /// # Errors
    ///
    /// Fails when the server rejects the statement.
    pub async fn drop_database(&self, name: &str) -> Result<()> {
        self.apply(&[SchemaOperation::DropDatabase {
            name: name.to_string(),
        }])
        .await
    }
}

//! Table schema reconciliation.
//!
//! Compares a current table snapshot against a desired one and produces the
//! ordered list of [`AlterOperation`]s that transforms the former into the
//! latter. Steps are emitted in a fixed order: additions, type changes,
//! reordering, settings modification, settings reset, sorting key.
//!
//! Column removal is refused outright. A column missing from the desired
//! schema could mean "drop" or "rename to one of the added columns", and
//! neither guess is safe for a data-bearing table.

use std::collections::{BTreeSet, HashSet};

use crate::error::{Result, SchemaError};
use crate::operations::{AlterOperation, ColumnPlacement};
use crate::schema::{TableSchema, column_set};

/// Operation name reported when columns would disappear.
pub const RENAME_OR_REMOVE: &str = "renaming or removing columns";

/// Engines whose settings are fixed at creation.
///
/// These engines consume from an external queue, so reading from them is
/// destructive as well.
pub const IMMUTABLE_SETTINGS_ENGINES: &[&str] = &["RabbitMQ"];

/// Returns true when `engine` only takes settings at creation time.
#[must_use]
pub fn has_immutable_settings(engine: &str) -> bool {
    IMMUTABLE_SETTINGS_ENGINES.contains(&engine)
}

/// Computes the alteration plan turning `current` into `desired`.
///
/// Validation happens before anything is emitted: callers get either a
/// complete plan or an error, never a partial plan.
///
/// # Errors
///
/// Returns [`SchemaError::UnsupportedChange`] when a column of `current` is
/// absent from `desired`.
pub fn reconcile(current: &TableSchema, desired: &TableSchema) -> Result<Vec<AlterOperation>> {
    let current_names = column_set(&current.columns);
    let desired_names = column_set(&desired.columns);

    check_no_removed_columns(current, desired, &desired_names)?;

    let added: HashSet<&str> = desired_names
        .difference(&current_names)
        .copied()
        .collect();

    let mut operations = Vec::new();
    operations.extend(additions(desired, &added));
    operations.extend(type_changes(desired, &added));
    operations.extend(reorders(current, desired));
    operations.extend(settings_changes(current, desired));

    if desired.order_by.len() > 1 {
        operations.push(AlterOperation::ModifyOrderBy {
            expressions: desired.order_by.clone(),
        });
    }

    Ok(operations)
}

fn check_no_removed_columns(
    current: &TableSchema,
    desired: &TableSchema,
    desired_names: &HashSet<&str>,
) -> Result<()> {
    let removed: Vec<&str> = current
        .columns
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| !desired_names.contains(name))
        .collect();

    if removed.is_empty() {
        return Ok(());
    }

    Err(SchemaError::UnsupportedChange {
        operation: RENAME_OR_REMOVE.to_string(),
        detail: format!(
            "cannot update columns of table {}: desired schema does not contain \
             column(s) {} from the current schema; delete and recreate the table instead",
            desired.full_name(),
            removed.join(", "),
        ),
    })
}

/// New columns, in desired declaration order.
fn additions<'a>(
    desired: &'a TableSchema,
    added: &'a HashSet<&str>,
) -> impl Iterator<Item = AlterOperation> + 'a {
    desired
        .columns
        .iter()
        .filter(|c| added.contains(c.name.as_str()))
        .map(|c| AlterOperation::add_column(&c.name, c.full_type(), &c.comment))
}

/// Every pre-existing column gets its type and comment rewritten, changed or not.
fn type_changes<'a>(
    desired: &'a TableSchema,
    added: &'a HashSet<&str>,
) -> impl Iterator<Item = AlterOperation> + 'a {
    desired
        .columns
        .iter()
        .filter(|c| !added.contains(c.name.as_str()))
        .map(|c| AlterOperation::change_column_type(&c.name, c.full_type(), &c.comment))
}

/// Positional moves, anchored on the desired predecessor.
///
/// Anchoring on the desired sequence keeps the result correct no matter how
/// earlier steps shifted physical offsets.
fn reorders(current: &TableSchema, desired: &TableSchema) -> Vec<AlterOperation> {
    let mut operations = Vec::new();

    for (i, column) in desired.columns.iter().enumerate() {
        let in_place = current
            .columns
            .get(i)
            .is_some_and(|existing| existing.name == column.name);
        if in_place {
            continue;
        }

        let placement = match i {
            0 => ColumnPlacement::First,
            _ => ColumnPlacement::After(desired.columns[i - 1].name.clone()),
        };
        operations.push(AlterOperation::reorder_column(
            &column.name,
            column.full_type(),
            placement,
        ));
    }

    operations
}

fn settings_changes(current: &TableSchema, desired: &TableSchema) -> Vec<AlterOperation> {
    let mut operations = Vec::new();

    if !desired.settings.is_empty() {
        operations.push(AlterOperation::ModifySettings {
            settings: desired.settings.clone(),
        });
    }

    let to_reset: BTreeSet<String> = current
        .settings
        .keys()
        .filter(|key| !desired.settings.contains_key(*key))
        .cloned()
        .collect();
    if !to_reset.is_empty() {
        operations.push(AlterOperation::ResetSettings { names: to_reset });
    }

    operations
}

/// Lists the immutable attributes that differ between the two snapshots.
///
/// Changing any of them requires dropping and recreating the table, which is
/// never done implicitly. Settings count as immutable for the engines in
/// [`IMMUTABLE_SETTINGS_ENGINES`].
#[must_use]
pub fn recreation_required(current: &TableSchema, desired: &TableSchema) -> Vec<&'static str> {
    let mut attributes = Vec::new();
    if current.engine != desired.engine {
        attributes.push("engine");
    }
    if current.engine_params != desired.engine_params {
        attributes.push("engine_params");
    }
    if current.partition_by != desired.partition_by {
        attributes.push("partition_by");
    }
    if current.primary_key != desired.primary_key {
        attributes.push("primary_key");
    }
    if has_immutable_settings(&desired.engine) && current.settings != desired.settings {
        attributes.push("settings");
    }
    if current.comment != desired.comment {
        attributes.push("comment");
    }
    attributes
}

/// Returns true when the sorting key differs but [`reconcile`] will not touch it.
///
/// Only multi-expression sorting keys are reconciled; a changed single or
/// empty `ORDER BY` is left as is.
#[must_use]
pub fn order_by_unreconciled(current: &TableSchema, desired: &TableSchema) -> bool {
    desired.order_by.len() <= 1 && current.order_by != desired.order_by
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::schema::Column;

    fn table(columns: Vec<Column>) -> TableSchema {
        TableSchema::new("default", "t", "MergeTree").columns(columns)
    }

    #[test]
    fn test_removed_column_rejected() {
        let current = table(vec![Column::new("a", "Int32"), Column::new("b", "String")]);
        let desired = table(vec![Column::new("a", "Int32")]);

        let err = reconcile(&current, &desired).unwrap_err();
        match err {
            SchemaError::UnsupportedChange { operation, detail } => {
                assert_eq!(operation, RENAME_OR_REMOVE);
                assert!(detail.contains("default.t"));
                assert!(detail.contains('b'));
            }
            other => panic!("Expected UnsupportedChange, got {other:?}"),
        }
    }

    #[test]
    fn test_rename_is_treated_as_removal() {
        let current = table(vec![Column::new("a", "Int32")]);
        let desired = table(vec![Column::new("renamed", "Int32")]);

        assert!(matches!(
            reconcile(&current, &desired),
            Err(SchemaError::UnsupportedChange { .. })
        ));
    }

    #[test]
    fn test_append_column() {
        let current = table(vec![Column::new("a", "Int32")]);
        let desired = table(vec![
            Column::new("a", "Int32"),
            Column::new("b", "String").nullable().comment("new"),
        ]);

        let ops = reconcile(&current, &desired).unwrap();
        assert_eq!(
            ops,
            vec![
                AlterOperation::add_column("b", "Nullable(String)", "new"),
                AlterOperation::change_column_type("a", "Int32", ""),
                AlterOperation::reorder_column(
                    "b",
                    "Nullable(String)",
                    ColumnPlacement::After("a".into())
                ),
            ]
        );
    }

    #[test]
    fn test_additions_follow_declaration_order() {
        let current = table(vec![Column::new("a", "Int32")]);
        let desired = table(vec![
            Column::new("z", "Int32"),
            Column::new("a", "Int32"),
            Column::new("m", "Int32"),
            Column::new("b", "Int32"),
        ]);

        let ops = reconcile(&current, &desired).unwrap();
        let added: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                AlterOperation::AddColumn { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec!["z", "m", "b"]);
    }

    #[test]
    fn test_swap_columns() {
        let current = table(vec![Column::new("a", "Int32"), Column::new("b", "String")]);
        let desired = table(vec![Column::new("b", "String"), Column::new("a", "Int32")]);

        let ops = reconcile(&current, &desired).unwrap();
        assert_eq!(
            &ops[2..],
            &[
                AlterOperation::reorder_column("b", "String", ColumnPlacement::First),
                AlterOperation::reorder_column("a", "Int32", ColumnPlacement::After("b".into())),
            ]
        );
    }

    #[test]
    fn test_type_change_emitted_for_changed_type() {
        let current = table(vec![Column::new("a", "Int32")]);
        let desired = table(vec![Column::new("a", "Int64").nullable()]);

        let ops = reconcile(&current, &desired).unwrap();
        assert_eq!(
            ops,
            vec![AlterOperation::change_column_type("a", "Nullable(Int64)", "")]
        );
    }

    #[test]
    fn test_settings_modify_and_reset() {
        let current = table(vec![Column::new("a", "Int32")])
            .setting("index_granularity", "8192")
            .setting("ttl_only_drop_parts", "1");
        let desired = table(vec![Column::new("a", "Int32")]).setting("index_granularity", "4096");

        let ops = reconcile(&current, &desired).unwrap();
        assert_eq!(
            &ops[1..],
            &[
                AlterOperation::ModifySettings {
                    settings: BTreeMap::from([(
                        "index_granularity".to_string(),
                        "4096".to_string()
                    )]),
                },
                AlterOperation::ResetSettings {
                    names: BTreeSet::from(["ttl_only_drop_parts".to_string()]),
                },
            ]
        );
    }

    #[test]
    fn test_order_by_only_reconciled_for_multiple_expressions() {
        let current = table(vec![Column::new("a", "Int32"), Column::new("b", "Int32")])
            .order_by(vec!["a".into()]);

        let single = current.clone().order_by(vec!["b".into()]);
        let ops = reconcile(&current, &single).unwrap();
        assert!(
            !ops.iter()
                .any(|op| matches!(op, AlterOperation::ModifyOrderBy { .. }))
        );
        assert!(order_by_unreconciled(&current, &single));

        let multi = current.clone().order_by(vec!["a".into(), "b".into()]);
        let ops = reconcile(&current, &multi).unwrap();
        assert_eq!(
            ops.last(),
            Some(&AlterOperation::ModifyOrderBy {
                expressions: vec!["a".into(), "b".into()],
            })
        );
        assert!(!order_by_unreconciled(&current, &multi));
    }

    #[test]
    fn test_recreation_required() {
        let current = table(vec![Column::new("a", "Int32")]).order_by(vec!["a".into()]);
        assert!(recreation_required(&current, &current).is_empty());

        let desired = TableSchema {
            engine: "ReplacingMergeTree".into(),
            comment: "changed".into(),
            ..current.clone()
        };
        assert_eq!(
            recreation_required(&current, &desired),
            vec!["engine", "comment"]
        );
    }

    #[test]
    fn test_queue_engine_settings_require_recreation() {
        let current = TableSchema::new("default", "q", "RabbitMQ")
            .columns(vec![Column::new("a", "String")])
            .setting("rabbitmq_format", "JSONEachRow");
        let desired = current.clone().setting("rabbitmq_num_consumers", "2");
        assert_eq!(recreation_required(&current, &desired), vec!["settings"]);
        assert!(recreation_required(&current, &current).is_empty());

        let mergetree = table(vec![Column::new("a", "Int32")]);
        let tuned = mergetree.clone().setting("index_granularity", "1024");
        assert!(recreation_required(&mergetree, &tuned).is_empty());
    }
}

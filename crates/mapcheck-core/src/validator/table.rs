//! Structural rules for tables and their columns.

use crate::catalog::{ColumnKind, DbTable, TableType, NOT_MAPPED_TABLE};
use crate::error::Error;

use super::ValidationContext;

pub(crate) fn validate_table(ctx: &ValidationContext<'_>, table: &DbTable) -> Result<(), Error> {
    if table.columns.is_empty() && !table.name.eq_ignore_ascii_case(NOT_MAPPED_TABLE) {
        return Err(ctx.fail(format!("Table '{}' has no columns.", table.name)));
    }

    match table.table_type {
        TableType::Existing => {
            require_physical(ctx, table)?;
            require_no_parent(ctx, table)?;
        }
        TableType::Primary => {
            require_physical(ctx, table)?;
            require_no_parent(ctx, table)?;
            require_physical_column_count(ctx, table)?;
        }
        TableType::Joined => {
            require_physical(ctx, table)?;
            require_parent(ctx, table)?;
            if table.children.len() > 1 {
                return Err(ctx.fail(format!(
                    "Joined table '{}' must have at most one child table but has {}.",
                    table.name,
                    table.children.len()
                )));
            }
            require_physical_column_count(ctx, table)?;
        }
        TableType::Overflow => {
            require_physical(ctx, table)?;
            require_parent(ctx, table)?;
            if !table.children.is_empty() {
                return Err(ctx.fail(format!(
                    "Overflow table '{}' must not have child tables.",
                    table.name
                )));
            }
            require_physical_column_count(ctx, table)?;
        }
        TableType::Virtual => {
            require_no_parent(ctx, table)?;
            if let Some(column) = ctx.catalog.table_columns(table).find(|c| !c.is_virtual) {
                return Err(ctx.fail(format!(
                    "Virtual table '{}' has non-virtual column '{}'.",
                    table.name, column.name
                )));
            }
        }
    }

    if !table.is_virtual() {
        require_system_column(ctx, table, ColumnKind::InstanceId)?;
        require_system_column(ctx, table, ColumnKind::ClassId)?;
        validate_columns(ctx, table)?;
    }
    Ok(())
}

fn require_physical(ctx: &ValidationContext<'_>, table: &DbTable) -> Result<(), Error> {
    if ctx.store.table_exists(&table.name)? {
        Ok(())
    } else {
        Err(ctx.fail(format!(
            "Table '{}' of type {} does not exist in the file.",
            table.name, table.table_type
        )))
    }
}

fn require_no_parent(ctx: &ValidationContext<'_>, table: &DbTable) -> Result<(), Error> {
    match table.parent.and_then(|id| ctx.catalog.table(id)) {
        Some(parent) => Err(ctx.fail(format!(
            "Table '{}' of type {} must not have a parent table, but has parent '{}'.",
            table.name, table.table_type, parent.name
        ))),
        None if table.parent.is_some() => Err(ctx.fail(format!(
            "Table '{}' of type {} must not have a parent table.",
            table.name, table.table_type
        ))),
        None => Ok(()),
    }
}

fn require_parent(ctx: &ValidationContext<'_>, table: &DbTable) -> Result<(), Error> {
    if table.parent.and_then(|id| ctx.catalog.table(id)).is_some() {
        Ok(())
    } else {
        Err(ctx.fail(format!(
            "Table '{}' of type {} must have a parent table.",
            table.name, table.table_type
        )))
    }
}

fn require_physical_column_count(ctx: &ValidationContext<'_>, table: &DbTable) -> Result<(), Error> {
    let mapped = ctx
        .catalog
        .table_columns(table)
        .filter(|c| !c.is_virtual)
        .count();
    let physical = ctx.store.physical_columns(&table.name)?.len();
    if mapped == physical {
        Ok(())
    } else {
        Err(ctx.fail(format!(
            "Table '{}' has {} non-virtual columns in the mapping but {} columns in the file.",
            table.name, mapped, physical
        )))
    }
}

fn require_system_column(
    ctx: &ValidationContext<'_>,
    table: &DbTable,
    kind: ColumnKind,
) -> Result<(), Error> {
    let count = ctx
        .catalog
        .table_columns(table)
        .filter(|c| c.kind == kind)
        .count();
    if count == 1 {
        Ok(())
    } else {
        Err(ctx.fail(format!(
            "Table '{}' must have exactly one column of kind {} but has {}.",
            table.name, kind, count
        )))
    }
}

fn validate_columns(ctx: &ValidationContext<'_>, table: &DbTable) -> Result<(), Error> {
    let physical = ctx.store.physical_columns(&table.name)?;
    for column in ctx.catalog.table_columns(table) {
        if column.is_shared() {
            if column.not_null || column.unique {
                return Err(ctx.fail(format!(
                    "Shared column '{}.{}' must not have a NOT NULL or UNIQUE constraint.",
                    table.name, column.name
                )));
            }
            continue;
        }
        if column.is_virtual {
            continue;
        }
        if !physical.iter().any(|p| p.eq_ignore_ascii_case(&column.name)) {
            return Err(ctx.fail(format!(
                "Column '{}.{}' does not exist in the file.",
                table.name, column.name
            )));
        }
    }
    Ok(())
}

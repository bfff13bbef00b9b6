//! Rules evaluated directly against the persisted catalog rows.

use crate::catalog::{ClassId, CustomAttributeContainer};
use crate::error::Error;

use super::ValidationContext;

/// Every `ec_ClassMap` row must have produced a class map.
pub(crate) fn validate_class_map_count(ctx: &ValidationContext<'_>) -> Result<(), Error> {
    let persisted = ctx.store.query_count("SELECT COUNT(*) FROM ec_ClassMap", [])?;
    let loaded = ctx.catalog.class_maps().count() as i64;
    if persisted != loaded {
        return Err(ctx.fail(format!(
            "ec_ClassMap has {} rows but {} class maps could be loaded.",
            persisted, loaded
        )));
    }
    Ok(())
}

/// A data property path may map to one column per class; a system path to
/// one column per class and table.
pub(crate) fn validate_duplicate_property_maps(ctx: &ValidationContext<'_>) -> Result<(), Error> {
    let mut duplicates: Vec<(ClassId, String, String)> = Vec::new();
    ctx.store.for_each_row(
        "SELECT pm.ClassId, pp.AccessString, group_concat(t.Name || '.' || c.Name, ', ')
         FROM ec_PropertyMap pm
         JOIN ec_PropertyPath pp ON pp.Id=pm.PropertyPathId
         JOIN ec_Column c ON c.Id=pm.ColumnId
         JOIN ec_Table t ON t.Id=c.TableId
         GROUP BY pm.ClassId, pm.PropertyPathId,
                  CASE WHEN pp.RootPropertyId IS NULL THEN c.TableId ELSE 0 END
         HAVING COUNT(*)>1
         ORDER BY pm.ClassId, pm.PropertyPathId",
        [],
        |row| {
            duplicates.push((ClassId(row.get(0)?), row.get(1)?, row.get(2)?));
            Ok(true)
        },
    )?;

    for (class, access_string, columns) in duplicates {
        ctx.issues.report(&format!(
            "ECClass '{}': property '{}' is mapped to more than one column ({}).",
            ctx.catalog.class_name(class),
            access_string,
            columns
        ));
    }
    Ok(())
}

/// One `ec_CustomAttribute` row.
struct CustomAttributeRow {
    id: i64,
    container_id: i64,
    container_type: i64,
    class_id: i64,
    class_exists: bool,
}

/// Every custom attribute must reference an existing attribute class and an
/// existing container of a known container type.
pub(crate) fn validate_custom_attributes(ctx: &ValidationContext<'_>) -> Result<(), Error> {
    let mut rows = Vec::new();
    ctx.store.for_each_row(
        "SELECT ca.Id, ca.ContainerId, ca.ContainerType, ca.ClassId, c.Id IS NOT NULL
         FROM ec_CustomAttribute ca LEFT JOIN ec_Class c ON c.Id=ca.ClassId
         ORDER BY ca.Id",
        [],
        |row| {
            rows.push(CustomAttributeRow {
                id: row.get(0)?,
                container_id: row.get(1)?,
                container_type: row.get(2)?,
                class_id: row.get(3)?,
                class_exists: row.get(4)?,
            });
            Ok(true)
        },
    )?;

    for row in rows {
        if !row.class_exists {
            ctx.issues.report(&format!(
                "Custom attribute {} references custom attribute class id {} which does not exist.",
                row.id, row.class_id
            ));
            continue;
        }
        let container = match CustomAttributeContainer::from_code(row.container_type, "ec_CustomAttribute") {
            Ok(container) => container,
            Err(_) => {
                ctx.issues.report(&format!(
                    "Custom attribute {} has unknown container type {}.",
                    row.id, row.container_type
                ));
                continue;
            }
        };
        let exists = ctx.store.query_count(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE Id=?1",
                container.container_table()
            ),
            [row.container_id],
        )? > 0;
        if !exists {
            ctx.issues.report(&format!(
                "Custom attribute {} is attached to {} {} which does not exist.",
                row.id, container, row.container_id
            ));
        }
    }
    Ok(())
}

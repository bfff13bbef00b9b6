//! Property map rules, applied recursively to compound maps.

use std::collections::HashMap;

use crate::catalog::{
    ClassDef, ClassMap, ColumnId, DataMapKind, DataPropertyMap, DbColumn, MapStrategy,
    NavigationMap, PropertyMap, SystemPropertyMap,
};
use crate::error::Error;

use super::ValidationContext;

/// Columns claimed so far by the property maps of one class.
#[derive(Debug, Default)]
pub(crate) struct ColumnOwners {
    owners: HashMap<ColumnId, String>,
}

impl ColumnOwners {
    /// Record that `access_string` is mapped to `column`.
    ///
    /// Fails if another property already claimed the column.
    fn claim(
        &mut self,
        ctx: &ValidationContext<'_>,
        class: &ClassDef,
        column: ColumnId,
        access_string: &str,
    ) -> Result<(), Error> {
        match self.owners.get(&column) {
            Some(owner) if owner != access_string => Err(ctx.fail(format!(
                "ECClass '{}': properties '{}' and '{}' are both mapped to column '{}'.",
                class.full_name,
                owner,
                access_string,
                ctx.catalog.column_label(column)
            ))),
            Some(_) => Ok(()),
            None => {
                self.owners.insert(column, access_string.to_string());
                Ok(())
            }
        }
    }
}

pub(crate) fn validate_property_map(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    class_map: &ClassMap,
    map: &PropertyMap,
    owners: &mut ColumnOwners,
) -> Result<(), Error> {
    match map {
        PropertyMap::System(system) => validate_system_map(ctx, class, system, owners),
        PropertyMap::Data(data) => validate_data_map(ctx, class, class_map, data, owners),
    }
}

fn validate_system_map(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    map: &SystemPropertyMap,
    owners: &mut ColumnOwners,
) -> Result<(), Error> {
    for column_id in &map.columns {
        if let Some(required) = map.kind.required_column_kind() {
            let column = lookup_column(ctx, *column_id)?;
            if column.kind != required {
                return Err(ctx.fail(format!(
                    "System property '{}' of ECClass '{}' is mapped to column '{}' of kind {} but requires kind {}.",
                    map.kind,
                    class.full_name,
                    ctx.catalog.column_label(*column_id),
                    column.kind,
                    required
                )));
            }
        }
        owners.claim(ctx, class, *column_id, map.kind.access_string())?;
    }
    Ok(())
}

fn validate_data_map(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    class_map: &ClassMap,
    map: &DataPropertyMap,
    owners: &mut ColumnOwners,
) -> Result<(), Error> {
    match &map.kind {
        DataMapKind::Primitive { column } => owners.claim(ctx, class, *column, &map.access_string),
        DataMapKind::Point2d { x, y } => {
            for (member, column) in [("X", x), ("Y", y)] {
                let column = require_member(ctx, class, map, member, *column)?;
                owners.claim(ctx, class, column, &map.access_string)?;
            }
            Ok(())
        }
        DataMapKind::Point3d { x, y, z } => {
            for (member, column) in [("X", x), ("Y", y), ("Z", z)] {
                let column = require_member(ctx, class, map, member, *column)?;
                owners.claim(ctx, class, column, &map.access_string)?;
            }
            Ok(())
        }
        DataMapKind::Struct {
            struct_class,
            members,
        } => {
            let expected = ctx.catalog.all_properties(*struct_class).len();
            if members.len() != expected {
                return Err(ctx.fail(format!(
                    "Struct property map '{}' of ECClass '{}' has {} member maps but struct '{}' has {} properties.",
                    map.access_string,
                    class.full_name,
                    members.len(),
                    ctx.catalog.class_name(*struct_class),
                    expected
                )));
            }
            for member in members {
                validate_data_map(ctx, class, class_map, member, owners)?;
            }
            Ok(())
        }
        DataMapKind::Navigation(nav) => validate_navigation(ctx, class, class_map, map, nav, owners),
    }
}

fn validate_navigation(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    class_map: &ClassMap,
    map: &DataPropertyMap,
    nav: &NavigationMap,
    owners: &mut ColumnOwners,
) -> Result<(), Error> {
    let catalog = ctx.catalog;
    let label = format!("{}.{}", class.full_name, map.access_string);
    let id_column = require_member(ctx, class, map, "Id", nav.id)?;
    let rel_column = require_member(ctx, class, map, "RelECClassId", nav.rel_class_id)?;

    if class_map.strategy == MapStrategy::ExistingTable {
        if nav.physical_fk {
            return Err(ctx.fail(format!(
                "Navigation property '{}' is mapped to an existing table and must not have a physical foreign key.",
                label
            )));
        }
    } else {
        let Some(rel_map) = catalog.class_map(nav.relationship) else {
            return Err(ctx.fail(format!(
                "Navigation property '{}' uses relationship '{}' which has no class map.",
                label,
                catalog.class_name(nav.relationship)
            )));
        };
        let expected = nav.direction.implied_strategy();
        if rel_map.strategy != expected {
            return Err(ctx.fail(format!(
                "Navigation property '{}' with direction {} requires relationship '{}' to be mapped with {} but it is mapped with {}.",
                label,
                nav.direction,
                catalog.class_name(nav.relationship),
                expected,
                rel_map.strategy
            )));
        }
    }

    let id = lookup_column(ctx, id_column)?;
    let rel = lookup_column(ctx, rel_column)?;
    validate_nullability(ctx, &label, map, nav, id, rel)?;
    validate_uniqueness(ctx, &label, nav, id, rel)?;

    owners.claim(ctx, class, id_column, &map.access_string)?;
    owners.claim(ctx, class, rel_column, &map.access_string)?;
    Ok(())
}

/// A logical foreign key must be nullable. A physical one is NOT NULL
/// exactly when the relationship requires one related instance and the
/// declaring class is the exclusive root of the table; both columns agree.
fn validate_nullability(
    ctx: &ValidationContext<'_>,
    label: &str,
    map: &DataPropertyMap,
    nav: &NavigationMap,
    id: &DbColumn,
    rel: &DbColumn,
) -> Result<(), Error> {
    let catalog = ctx.catalog;
    if !nav.physical_fk {
        if id.not_null {
            return Err(ctx.fail(format!(
                "Navigation property '{}' has a logical foreign key, so column '{}' must be nullable.",
                label,
                catalog.column_label(id.id)
            )));
        }
        return Ok(());
    }

    let declaring_class = catalog.property(map.property).map(|p| p.class);
    let exclusive_root = catalog
        .table(id.table)
        .and_then(|t| t.exclusive_root_class)
        .is_some_and(|root| Some(root) == declaring_class);
    let must_be_not_null = nav.implies_not_null && exclusive_root;

    for column in [id, rel] {
        if column.not_null == must_be_not_null {
            continue;
        }
        let message = if must_be_not_null {
            format!(
                "Navigation property '{}': column '{}' must be NOT NULL because the relationship requires exactly one related instance and the class is the exclusive root of its table.",
                label,
                catalog.column_label(column.id)
            )
        } else {
            format!(
                "Navigation property '{}': column '{}' must be nullable.",
                label,
                catalog.column_label(column.id)
            )
        };
        return Err(ctx.fail(message));
    }
    Ok(())
}

fn validate_uniqueness(
    ctx: &ValidationContext<'_>,
    label: &str,
    nav: &NavigationMap,
    id: &DbColumn,
    rel: &DbColumn,
) -> Result<(), Error> {
    let catalog = ctx.catalog;
    for column in [id, rel] {
        if column.unique {
            return Err(ctx.fail(format!(
                "Navigation property '{}': column '{}' must not carry a UNIQUE constraint. Uniqueness is enforced through an index.",
                label,
                catalog.column_label(column.id)
            )));
        }
    }

    match ctx.column_indexes.auto_generated_single_column(catalog, id.id) {
        Some(index) if index.is_unique != nav.implies_unique => Err(ctx.fail(format!(
            "Navigation property '{}': index '{}' on column '{}' must {}be unique.",
            label,
            index.name,
            catalog.column_label(id.id),
            if nav.implies_unique { "" } else { "not " }
        ))),
        None if nav.implies_unique => Err(ctx.fail(format!(
            "Navigation property '{}' requires a unique index on column '{}' but none exists.",
            label,
            catalog.column_label(id.id)
        ))),
        _ => Ok(()),
    }
}

fn require_member(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    map: &DataPropertyMap,
    member: &str,
    column: Option<ColumnId>,
) -> Result<ColumnId, Error> {
    column.ok_or_else(|| {
        ctx.fail(format!(
            "Property map '{}' of ECClass '{}' has no '{}' member.",
            map.access_string, class.full_name, member
        ))
    })
}

fn lookup_column<'c>(ctx: &ValidationContext<'c>, id: ColumnId) -> Result<&'c DbColumn, Error> {
    ctx.catalog.column(id).ok_or_else(|| {
        ctx.fail(format!(
            "Property map references column id {} which does not exist.",
            id
        ))
    })
}

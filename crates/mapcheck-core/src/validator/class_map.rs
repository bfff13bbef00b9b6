//! Class map rules: strategy, map type and overflow consistency.

use crate::catalog::{
    ClassDef, ClassMap, ClassMapType, MapStrategy, RelationshipEnd, SystemPropertyKind, TableType,
};
use crate::error::Error;

use super::property_map::{self, ColumnOwners};
use super::ValidationContext;

pub(crate) fn validate_class_map(ctx: &ValidationContext<'_>, map: &ClassMap) -> Result<(), Error> {
    let Some(class) = ctx.catalog.class(map.class) else {
        return Err(ctx.fail(format!(
            "Class map of class id {} has no class definition.",
            map.class
        )));
    };

    validate_strategy(ctx, class, map)?;
    validate_overflow(ctx, class, map)?;

    match map.map_type {
        ClassMapType::NotMapped => {
            if !map.property_maps.is_empty() {
                return Err(ctx.fail(format!(
                    "ECClass '{}' is not mapped but has {} property maps.",
                    class.full_name,
                    map.property_maps.len()
                )));
            }
        }
        ClassMapType::Class => {
            let has_both = map.system_map(SystemPropertyKind::InstanceId).is_some()
                && map.system_map(SystemPropertyKind::ClassId).is_some();
            let count = map.system_maps().count();
            if count != 2 || !has_both {
                return Err(ctx.fail(format!(
                    "ECClass '{}' must have exactly the ECInstanceId and ECClassId system property maps but has {}.",
                    class.full_name, count
                )));
            }
            validate_data_map_count(ctx, class, map)?;
        }
        ClassMapType::RelationshipEndTable => {
            require_relationship_system_maps(ctx, class, map)?;
            let data_maps = map.data_maps().count();
            if data_maps > 0 {
                return Err(ctx.fail(format!(
                    "Foreign key relationship '{}' must not have data property maps but has {}.",
                    class.full_name, data_maps
                )));
            }
            let single_virtual = match map.tables.as_slice() {
                [table] => ctx.catalog.table(*table).is_some_and(|t| t.is_virtual()),
                _ => false,
            };
            if !single_virtual {
                return Err(ctx.fail(format!(
                    "Foreign key relationship '{}' must be mapped to exactly one virtual table.",
                    class.full_name
                )));
            }
            let referenced_end = match map.strategy {
                MapStrategy::ForeignKeyRelationshipInSourceTable => RelationshipEnd::Target,
                _ => RelationshipEnd::Source,
            };
            require_single_constraint_table(ctx, class, referenced_end, "Foreign key relationship")?;
        }
        ClassMapType::RelationshipLinkTable => {
            require_relationship_system_maps(ctx, class, map)?;
            validate_data_map_count(ctx, class, map)?;
            require_single_constraint_table(ctx, class, RelationshipEnd::Source, "Link table relationship")?;
            require_single_constraint_table(ctx, class, RelationshipEnd::Target, "Link table relationship")?;
        }
    }

    let mut owners = ColumnOwners::default();
    for property_map in &map.property_maps {
        property_map::validate_property_map(ctx, class, map, property_map, &mut owners)?;
    }
    Ok(())
}

fn validate_strategy(ctx: &ValidationContext<'_>, class: &ClassDef, map: &ClassMap) -> Result<(), Error> {
    let catalog = ctx.catalog;
    match map.strategy {
        MapStrategy::ExistingTable => {
            if !class.is_sealed() {
                return Err(ctx.fail(format!(
                    "ECClass '{}' is mapped to an existing table and must be sealed.",
                    class.full_name
                )));
            }
            for base in &class.base_classes {
                let base_strategy = catalog.class_map(*base).map(|m| m.strategy);
                if base_strategy == Some(MapStrategy::TablePerHierarchy) {
                    return Err(ctx.fail(format!(
                        "ECClass '{}' is mapped to an existing table, but its base class '{}' is mapped with TablePerHierarchy.",
                        class.full_name,
                        catalog.class_name(*base)
                    )));
                }
            }
        }
        MapStrategy::OwnTable if class.is_relationship() => {
            if let Some(nav) = catalog.navigation_properties_of(class.id).next() {
                return Err(ctx.fail(format!(
                    "Relationship '{}' is mapped to its own table, but navigation property '{}.{}' requires it to be a foreign key relationship.",
                    class.full_name,
                    catalog.class_name(nav.class),
                    nav.name
                )));
            }
            if !class.is_sealed() {
                return Err(ctx.fail(format!(
                    "Link table relationship '{}' is mapped with OwnTable and must be sealed.",
                    class.full_name
                )));
            }
        }
        MapStrategy::NotMapped if !class.is_relationship() => {
            for rel in catalog.relationships().filter(|r| r.references(class.id)) {
                let rel_strategy = catalog
                    .class_map(rel.class)
                    .map(|m| m.strategy)
                    .unwrap_or(MapStrategy::NotMapped);
                if rel_strategy != MapStrategy::NotMapped {
                    return Err(ctx.fail(format!(
                        "ECClass '{}' is not mapped, but relationship '{}' referencing it is mapped with {}.",
                        class.full_name,
                        catalog.class_name(rel.class),
                        rel_strategy
                    )));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_data_map_count(ctx: &ValidationContext<'_>, class: &ClassDef, map: &ClassMap) -> Result<(), Error> {
    let properties = ctx.catalog.all_properties(class.id);
    let data_maps = map.data_maps().count();
    let unmapped: Vec<&str> = properties
        .iter()
        .filter(|p| map.data_map(p.id).is_none())
        .map(|p| p.name.as_str())
        .collect();

    if data_maps != properties.len() {
        let unmapped = if unmapped.is_empty() {
            "none".to_string()
        } else {
            unmapped.join(", ")
        };
        return Err(ctx.fail(format!(
            "ECClass '{}' has {} properties but {} data property maps. Unmapped properties: {}.",
            class.full_name,
            properties.len(),
            data_maps,
            unmapped
        )));
    }
    if let Some(name) = unmapped.first() {
        return Err(ctx.fail(format!(
            "Property '{}.{}' has no property map.",
            class.full_name, name
        )));
    }
    Ok(())
}

fn require_relationship_system_maps(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    map: &ClassMap,
) -> Result<(), Error> {
    let count = map.system_maps().count();
    let complete = SystemPropertyKind::ALL
        .iter()
        .all(|kind| map.system_map(*kind).is_some());
    if count != SystemPropertyKind::ALL.len() || !complete {
        return Err(ctx.fail(format!(
            "Relationship '{}' must have exactly {} system property maps but has {}.",
            class.full_name,
            SystemPropertyKind::ALL.len(),
            count
        )));
    }
    Ok(())
}

fn require_single_constraint_table(
    ctx: &ValidationContext<'_>,
    class: &ClassDef,
    end: RelationshipEnd,
    label: &str,
) -> Result<(), Error> {
    let tables = ctx.catalog.constraint_tables(class.id, end);
    if tables.len() == 1 {
        return Ok(());
    }
    let names: Vec<&str> = tables
        .iter()
        .filter_map(|id| ctx.catalog.table(*id))
        .map(|t| t.name.as_str())
        .collect();
    let resolved = if names.is_empty() {
        "no table".to_string()
    } else {
        names.join(", ")
    };
    Err(ctx.fail(format!(
        "{} '{}': the {} constraint must resolve to exactly one table but resolves to {}.",
        label, class.full_name, end, resolved
    )))
}

fn validate_overflow(ctx: &ValidationContext<'_>, class: &ClassDef, map: &ClassMap) -> Result<(), Error> {
    let catalog = ctx.catalog;
    let table_of = |column| catalog.column(column).and_then(|c| catalog.table(c.table));

    for property_map in &map.property_maps {
        for column in property_map.columns() {
            if let Some(table) = table_of(column) {
                if table.table_type == TableType::Overflow && !map.tables.contains(&table.id) {
                    return Err(ctx.fail(format!(
                        "ECClass '{}' maps property '{}' to overflow table '{}' which it does not reference.",
                        class.full_name,
                        property_map.access_string(),
                        table.name
                    )));
                }
            }
        }
    }

    let overflow_tables = map
        .tables
        .iter()
        .filter_map(|id| catalog.table(*id))
        .filter(|t| t.table_type == TableType::Overflow);
    for overflow in overflow_tables {
        let in_overflow = |kind: SystemPropertyKind| {
            map.system_map(kind).is_some_and(|m| {
                m.columns
                    .iter()
                    .any(|c| table_of(*c).is_some_and(|t| t.id == overflow.id))
            })
        };
        let instance_id = in_overflow(SystemPropertyKind::InstanceId);
        let class_id = in_overflow(SystemPropertyKind::ClassId);
        let data = map.data_maps().any(|m| {
            m.columns()
                .into_iter()
                .any(|c| table_of(c).is_some_and(|t| t.id == overflow.id))
        });

        if !instance_id && !class_id && !data {
            return Err(ctx.fail(format!(
                "ECClass '{}' points to overflow table '{}' but has no property mapped to it.",
                class.full_name, overflow.name
            )));
        }
        if instance_id != class_id {
            return Err(ctx.fail(format!(
                "ECClass '{}': ECInstanceId and ECClassId must both be mapped to overflow table '{}' or neither of them.",
                class.full_name, overflow.name
            )));
        }
        if instance_id && !data {
            return Err(ctx.fail(format!(
                "ECClass '{}' maps system properties to overflow table '{}' but no data property.",
                class.full_name, overflow.name
            )));
        }
        if data && !instance_id {
            return Err(ctx.fail(format!(
                "ECClass '{}' maps data properties to overflow table '{}' but not ECInstanceId and ECClassId.",
                class.full_name, overflow.name
            )));
        }
    }
    Ok(())
}

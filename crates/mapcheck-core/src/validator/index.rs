//! Index rules and the column to index lookup.

use std::collections::HashMap;

use crate::catalog::{Catalog, ClassMapType, ColumnId, DbIndex, IndexId, MapStrategy};
use crate::error::Error;

use super::ValidationContext;

/// Indexes each column takes part in.
///
/// Built once at the start of a validation run and only read afterwards.
#[derive(Debug, Default)]
pub struct ColumnIndexMap {
    indexes: HashMap<ColumnId, Vec<IndexId>>,
}

impl ColumnIndexMap {
    /// Build the lookup from every index of the catalog.
    pub fn build(catalog: &Catalog) -> Self {
        let mut indexes: HashMap<ColumnId, Vec<IndexId>> = HashMap::new();
        for index in catalog.indexes() {
            for column in &index.columns {
                indexes.entry(*column).or_default().push(index.id);
            }
        }
        Self { indexes }
    }

    /// Indexes containing the column.
    pub fn indexes_of(&self, column: ColumnId) -> &[IndexId] {
        self.indexes.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The auto-generated index whose only column is the given one.
    pub fn auto_generated_single_column<'c>(
        &self,
        catalog: &'c Catalog,
        column: ColumnId,
    ) -> Option<&'c DbIndex> {
        self.indexes_of(column)
            .iter()
            .filter_map(|id| catalog.index(*id))
            .find(|index| index.is_auto_generated && index.columns.len() == 1)
    }
}

pub(crate) fn validate_index(ctx: &ValidationContext<'_>, index: &DbIndex) -> Result<(), Error> {
    let catalog = ctx.catalog;
    let Some(table) = catalog.table(index.table) else {
        return Err(ctx.fail(format!(
            "Index '{}' references a table that does not exist.",
            index.name
        )));
    };
    if table.is_virtual() {
        return Ok(());
    }

    if index.columns.is_empty() {
        return Err(ctx.fail(format!("Index '{}' has no columns.", index.name)));
    }
    for column in &index.columns {
        let same_table = catalog.column(*column).is_some_and(|c| c.table == index.table);
        if !same_table {
            return Err(ctx.fail(format!(
                "Index '{}' on table '{}' includes column '{}' of another table.",
                index.name,
                table.name,
                catalog.column_label(*column)
            )));
        }
    }

    if index.is_auto_generated {
        return Ok(());
    }
    let Some(class_id) = index.class else {
        return Ok(());
    };
    let Some(class) = catalog.class(class_id) else {
        return Err(ctx.fail(format!(
            "Index '{}' is defined on class id {} which does not exist.",
            index.name, class_id
        )));
    };
    if class.is_mixin {
        return Err(ctx.fail(format!(
            "Index '{}' is defined on mixin '{}'. Indexes on mixins are not supported.",
            index.name, class.full_name
        )));
    }
    let class_map = catalog.class_map(class_id);
    if class_map.is_some_and(|m| m.map_type == ClassMapType::RelationshipEndTable) {
        return Err(ctx.fail(format!(
            "Index '{}' is defined on foreign key relationship '{}'. Indexes on foreign key relationships are not supported.",
            index.name, class.full_name
        )));
    }
    let hierarchical = class_map.is_some_and(|m| m.strategy == MapStrategy::TablePerHierarchy);
    if !class.is_sealed() && !hierarchical {
        return Err(ctx.fail(format!(
            "Index '{}' is defined on class '{}' which is neither sealed nor mapped with TablePerHierarchy. Subclasses could violate the index.",
            index.name, class.full_name
        )));
    }
    Ok(())
}

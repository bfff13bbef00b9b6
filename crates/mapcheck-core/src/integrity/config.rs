//! Integrity checker configuration.

/// Configuration for the integrity checker.
#[derive(Debug, Clone)]
pub struct IntegrityConfig {
    /// Instance id of the self-referential root row. Rows with this id whose
    /// navigation property points back into their own table are skipped by
    /// the navigation referential check. None disables the exception.
    pub root_row_id: Option<i64>,

    /// Base tables the quick-check runs the missing child rows check against.
    /// Empty means every primary table that has a joined child table.
    pub child_row_base_tables: Vec<String>,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            root_row_id: Some(1),
            child_row_base_tables: Vec::new(),
        }
    }
}

impl IntegrityConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root row id.
    pub fn with_root_row_id(mut self, id: i64) -> Self {
        self.root_row_id = Some(id);
        self
    }

    /// Disable the root row exception.
    pub fn without_root_row(mut self) -> Self {
        self.root_row_id = None;
        self
    }

    /// Add a base table for the missing child rows check.
    pub fn with_child_row_base_table(mut self, table: impl Into<String>) -> Self {
        self.child_row_base_tables.push(table.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntegrityConfig::default();
        assert_eq!(config.root_row_id, Some(1));
        assert!(config.child_row_base_tables.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = IntegrityConfig::new()
            .with_root_row_id(7)
            .with_child_row_base_table("ts_Element");
        assert_eq!(config.root_row_id, Some(7));
        assert_eq!(config.child_row_base_tables, vec!["ts_Element"]);
        assert_eq!(config.without_root_row().root_row_id, None);
    }
}

//! Schema resolution check.

use tracing::{instrument, warn};

use crate::error::Error;

use super::{IntegrityChecker, RowSink, SchemaLoadViolation};

impl IntegrityChecker<'_> {
    /// Report every schema that does not resolve through the mapping loader.
    ///
    /// If the catalog as a whole cannot be loaded, every persisted schema is
    /// reported with the load error.
    #[instrument(skip(self, on_row))]
    pub fn check_schema_load<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(SchemaLoadViolation) -> bool,
    {
        let mut sink = RowSink::new(on_row);
        let catalog = match self.catalog() {
            Ok(catalog) => catalog,
            Err(err @ (Error::InvalidCatalog(_) | Error::UnknownEnumValue { .. })) => {
                warn!(error = %err, "catalog does not load");
                let message = err.to_string();
                self.store.for_each_row("SELECT Name FROM ec_Schema ORDER BY Id", [], |row| {
                    Ok(sink.emit(SchemaLoadViolation {
                        schema_name: row.get(0)?,
                        message: message.clone(),
                    }))
                })?;
                return Ok(sink.delivered());
            }
            Err(err) => return Err(err),
        };

        for schema in catalog.schemas() {
            let Err(err) = catalog.resolve_schema(&schema.name) else {
                continue;
            };
            let violation = SchemaLoadViolation {
                schema_name: schema.name.clone(),
                message: err.to_string(),
            };
            if !sink.emit(violation) {
                break;
            }
        }
        Ok(sink.delivered())
    }
}

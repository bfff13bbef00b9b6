//! System profile check.

use tracing::{debug, instrument};

use crate::error::Error;
use crate::profile::{self, ProfileVersion};

use super::{IntegrityChecker, ProfileIssue, ProfileViolation, RowSink};

impl IntegrityChecker<'_> {
    /// Compare every system table, index and trigger with the pinned DDL of
    /// the profile version declared by the file.
    #[instrument(skip(self, on_row))]
    pub fn check_ec_profile<F>(&self, on_row: F) -> Result<usize, Error>
    where
        F: FnMut(ProfileViolation) -> bool,
    {
        let version = ProfileVersion::read(self.store)?;
        debug!(%version, "comparing system profile");

        let mut sink = RowSink::new(on_row);
        for object in profile::baseline(version) {
            let issue = match self.store.object_sql(object.kind, object.name)? {
                None => ProfileIssue::Missing,
                Some(actual) if profile::normalize_ddl(&actual) != profile::normalize_ddl(object.ddl) => {
                    ProfileIssue::DdlMismatch {
                        expected: object.ddl.to_string(),
                        actual,
                    }
                }
                Some(_) => continue,
            };
            let violation = ProfileViolation {
                kind: object.kind,
                name: object.name.to_string(),
                issue,
            };
            if !sink.emit(violation) {
                break;
            }
        }
        Ok(sink.delivered())
    }
}

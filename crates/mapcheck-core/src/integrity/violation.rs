//! Violation rows streamed by the integrity checks.

use serde::Serialize;

use crate::catalog::RelationshipEnd;
use crate::storage::PhysicalObjectKind;

/// How a system object differs from the pinned profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProfileIssue {
    /// The object does not exist.
    Missing,
    /// The object exists with different DDL.
    DdlMismatch {
        /// Pinned DDL.
        expected: String,
        /// DDL found in the file.
        actual: String,
    },
}

/// A system object that drifted from the pinned profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileViolation {
    /// Object kind.
    pub kind: PhysicalObjectKind,
    /// Object name.
    pub name: String,
    /// What is wrong.
    pub issue: ProfileIssue,
}

/// A catalog object that does not exist physically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalDriftViolation {
    /// Object kind.
    pub kind: PhysicalObjectKind,
    /// Table name.
    pub table: String,
    /// Column or index name, absent for tables.
    pub name: Option<String>,
}

/// A navigation id pointing at a row that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavIdViolation {
    /// Instance holding the reference.
    pub instance_id: i64,
    /// Class whose table stores the navigation property.
    pub class_name: String,
    /// Navigation property.
    pub property_name: String,
    /// The dangling id.
    pub nav_id: i64,
    /// Class the property points at.
    pub target_class_name: String,
}

/// A navigation relationship class id that is not a valid relationship class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavClassIdViolation {
    /// Instance holding the reference.
    pub instance_id: i64,
    /// Class whose table stores the navigation property.
    pub class_name: String,
    /// Navigation property.
    pub property_name: String,
    /// The stored relationship class id.
    pub rel_class_id: i64,
    /// Declared relationship class.
    pub relationship_class_name: String,
}

/// A link table row whose end id does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTableIdViolation {
    /// Link row id.
    pub instance_id: i64,
    /// Relationship class.
    pub relationship_class_name: String,
    /// Which end.
    pub end: RelationshipEnd,
    /// The id that does not resolve.
    pub missing_id: i64,
    /// Table(s) the id was looked up in.
    pub constraint_table: String,
}

/// A link table row whose end class id is not a valid constraint class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTableClassIdViolation {
    /// Link row id.
    pub instance_id: i64,
    /// Relationship class.
    pub relationship_class_name: String,
    /// Which end.
    pub end: RelationshipEnd,
    /// The stored class id.
    pub class_id: i64,
}

/// Role of a table in the class id check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableRole {
    /// Root table of a table-per-hierarchy class.
    Primary,
    /// Joined table.
    Joined,
    /// Overflow table.
    Overflow,
}

impl std::fmt::Display for TableRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableRole::Primary => write!(f, "primary"),
            TableRole::Joined => write!(f, "joined"),
            TableRole::Overflow => write!(f, "overflow"),
        }
    }
}

/// A stored row whose class id does not resolve to a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassIdViolation {
    /// Role of the table.
    pub table_role: TableRole,
    /// Table name.
    pub table_name: String,
    /// Row id.
    pub instance_id: i64,
    /// Stored class id, absent if NULL.
    pub class_id: Option<i64>,
}

/// A base table row that lacks its row in a joined table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingChildRowViolation {
    /// Row id.
    pub instance_id: i64,
    /// Stored class id.
    pub class_id: i64,
    /// Class name.
    pub class_name: String,
    /// Table missing the row.
    pub table_name: String,
}

/// A schema that does not load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaLoadViolation {
    /// Schema name.
    pub schema_name: String,
    /// Why it does not load.
    pub message: String,
}

/// Any violation, as produced by [`super::IntegrityChecker::run_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "kebab-case")]
pub enum Violation {
    /// Profile drift.
    EcProfile(ProfileViolation),
    /// Catalog vs physical drift.
    DataColumns(PhysicalDriftViolation),
    /// Dangling navigation id.
    NavIds(NavIdViolation),
    /// Invalid navigation relationship class id.
    NavClassIds(NavClassIdViolation),
    /// Dangling link table end id.
    LinktableIds(LinkTableIdViolation),
    /// Invalid link table end class id.
    LinktableClassIds(LinkTableClassIdViolation),
    /// Unresolvable class id.
    ClassIds(ClassIdViolation),
    /// Missing joined table row.
    MissingChildRows(MissingChildRowViolation),
    /// Schema that does not load.
    SchemaLoad(SchemaLoadViolation),
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::EcProfile(v) => match &v.issue {
                ProfileIssue::Missing => write!(f, "{} '{}' is missing", v.kind, v.name),
                ProfileIssue::DdlMismatch { expected, actual } => write!(
                    f,
                    "{} '{}' has DDL mismatch: expected `{}`, found `{}`",
                    v.kind, v.name, expected, actual
                ),
            },
            Violation::DataColumns(v) => match &v.name {
                Some(name) => write!(f, "{} '{}' of table '{}' does not exist", v.kind, name, v.table),
                None => write!(f, "table '{}' does not exist", v.table),
            },
            Violation::NavIds(v) => write!(
                f,
                "{} [{}] {}.{} = {} has no {} row",
                v.class_name, v.instance_id, v.class_name, v.property_name, v.nav_id, v.target_class_name
            ),
            Violation::NavClassIds(v) => write!(
                f,
                "{} [{}] {}.RelECClassId = {} is not a {}",
                v.class_name, v.instance_id, v.property_name, v.rel_class_id, v.relationship_class_name
            ),
            Violation::LinktableIds(v) => write!(
                f,
                "{} [{}] {} id {} not found in {}",
                v.relationship_class_name, v.instance_id, v.end, v.missing_id, v.constraint_table
            ),
            Violation::LinktableClassIds(v) => write!(
                f,
                "{} [{}] {} class id {} is not a valid constraint class",
                v.relationship_class_name, v.instance_id, v.end, v.class_id
            ),
            Violation::ClassIds(v) => match v.class_id {
                Some(class_id) => write!(
                    f,
                    "{} table '{}' row {} has unknown class id {}",
                    v.table_role, v.table_name, v.instance_id, class_id
                ),
                None => write!(
                    f,
                    "{} table '{}' row {} has no class id",
                    v.table_role, v.table_name, v.instance_id
                ),
            },
            Violation::MissingChildRows(v) => write!(
                f,
                "{} [{}] has no row in '{}'",
                v.class_name, v.instance_id, v.table_name
            ),
            Violation::SchemaLoad(v) => write!(f, "schema '{}' does not load: {}", v.schema_name, v.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_display() {
        let violation = Violation::NavIds(NavIdViolation {
            instance_id: 2,
            class_name: "TestSchema:Widget".into(),
            property_name: "Owner".into(),
            nav_id: 999,
            target_class_name: "TestSchema:Owner".into(),
        });
        assert_eq!(
            violation.to_string(),
            "TestSchema:Widget [2] TestSchema:Widget.Owner = 999 has no TestSchema:Owner row"
        );

        let violation = Violation::ClassIds(ClassIdViolation {
            table_role: TableRole::Joined,
            table_name: "ts_Part".into(),
            instance_id: 4,
            class_id: None,
        });
        assert_eq!(violation.to_string(), "joined table 'ts_Part' row 4 has no class id");
    }

    #[test]
    fn test_violation_serializes_with_check_tag() {
        let violation = Violation::SchemaLoad(SchemaLoadViolation {
            schema_name: "TestSchema".into(),
            message: "broken".into(),
        });
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(json["check"], "schema-load");
        assert_eq!(json["schema_name"], "TestSchema");
    }
}

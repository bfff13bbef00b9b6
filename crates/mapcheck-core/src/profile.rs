//! Pinned DDL of the system tables, indexes and triggers.
//!
//! Two baselines exist: the `4.0.0.1` profile and the `4.0.0.2` profile,
//! which adds two indexes and a cache maintenance trigger. A file is compared
//! against the baseline of the profile version it declares in `be_Prop`.

use std::str::FromStr;

use serde::Serialize;

use crate::error::Error;
use crate::storage::{PhysicalObjectKind, Store};

/// Namespace of the profile version property in `be_Prop`.
pub const PROFILE_VERSION_NAMESPACE: &str = "ec_Db";

/// Name of the profile version property in `be_Prop`.
pub const PROFILE_VERSION_NAME: &str = "SchemaVersion";

/// A four-part profile version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProfileVersion {
    /// Major.
    pub major: u16,
    /// Minor.
    pub minor: u16,
    /// Sub 1.
    pub sub1: u16,
    /// Sub 2.
    pub sub2: u16,
}

impl ProfileVersion {
    /// First profile covered by the checker.
    pub const V4_0_0_1: ProfileVersion = ProfileVersion::new(4, 0, 0, 1);
    /// Profile adding the property map column index, the parent table index
    /// and the table delete trigger.
    pub const V4_0_0_2: ProfileVersion = ProfileVersion::new(4, 0, 0, 2);
    /// Newest known profile.
    pub const LATEST: ProfileVersion = ProfileVersion::V4_0_0_2;

    /// Create a version.
    pub const fn new(major: u16, minor: u16, sub1: u16, sub2: u16) -> Self {
        Self {
            major,
            minor,
            sub1,
            sub2,
        }
    }

    /// Read the profile version stored in a file.
    pub fn read(store: &Store) -> Result<ProfileVersion, Error> {
        if !store.table_exists("be_Prop")? {
            return Err(Error::NotFound("table 'be_Prop'".into()));
        }
        let value = store
            .query_optional_text(
                "SELECT StrData FROM be_Prop WHERE Namespace=?1 AND Name=?2",
                [PROFILE_VERSION_NAMESPACE, PROFILE_VERSION_NAME],
            )?
            .ok_or_else(|| Error::NotFound("profile version in 'be_Prop'".into()))?;
        value.parse()
    }
}

impl FromStr for ProfileVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u16> = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u16>())
            .collect::<Result<_, _>>()
            .map_err(|_| Error::InvalidProfileVersion(s.to_string()))?;
        match parts.as_slice() {
            [major, minor, sub1, sub2] => Ok(ProfileVersion::new(*major, *minor, *sub1, *sub2)),
            _ => Err(Error::InvalidProfileVersion(s.to_string())),
        }
    }
}

impl std::fmt::Display for ProfileVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.sub1, self.sub2)
    }
}

/// An object of the pinned system profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileObject {
    /// Object kind.
    pub kind: PhysicalObjectKind,
    /// Object name.
    pub name: &'static str,
    /// Expected DDL, as stored in `sqlite_master`.
    pub ddl: &'static str,
}

const fn table(name: &'static str, ddl: &'static str) -> ProfileObject {
    ProfileObject {
        kind: PhysicalObjectKind::Table,
        name,
        ddl,
    }
}

const fn index(name: &'static str, ddl: &'static str) -> ProfileObject {
    ProfileObject {
        kind: PhysicalObjectKind::Index,
        name,
        ddl,
    }
}

const fn trigger(name: &'static str, ddl: &'static str) -> ProfileObject {
    ProfileObject {
        kind: PhysicalObjectKind::Trigger,
        name,
        ddl,
    }
}

const BASE_PROFILE: &[ProfileObject] = &[
    table(
        "be_Prop",
        "CREATE TABLE be_Prop(Namespace TEXT NOT NULL COLLATE NOCASE,Name TEXT NOT NULL COLLATE NOCASE,StrData TEXT,PRIMARY KEY(Namespace,Name))",
    ),
    table(
        "ec_Schema",
        "CREATE TABLE ec_Schema(Id INTEGER PRIMARY KEY,Name TEXT UNIQUE NOT NULL COLLATE NOCASE,Alias TEXT UNIQUE NOT NULL COLLATE NOCASE)",
    ),
    table(
        "ec_Class",
        "CREATE TABLE ec_Class(Id INTEGER PRIMARY KEY,SchemaId INTEGER NOT NULL REFERENCES ec_Schema(Id) ON DELETE CASCADE,Name TEXT NOT NULL COLLATE NOCASE,Type INTEGER NOT NULL,Modifier INTEGER NOT NULL)",
    ),
    table(
        "ec_ClassHasBaseClasses",
        "CREATE TABLE ec_ClassHasBaseClasses(Id INTEGER PRIMARY KEY,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,BaseClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,Ordinal INTEGER NOT NULL)",
    ),
    table(
        "ec_Property",
        "CREATE TABLE ec_Property(Id INTEGER PRIMARY KEY,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,Name TEXT NOT NULL COLLATE NOCASE,Kind INTEGER NOT NULL,PrimitiveType INTEGER,StructClassId INTEGER REFERENCES ec_Class(Id) ON DELETE CASCADE,NavigationRelationshipClassId INTEGER REFERENCES ec_Class(Id) ON DELETE CASCADE,NavigationDirection INTEGER)",
    ),
    table(
        "ec_RelationshipConstraint",
        "CREATE TABLE ec_RelationshipConstraint(Id INTEGER PRIMARY KEY,RelationshipClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,RelationshipEnd INTEGER NOT NULL,MultiplicityLowerLimit INTEGER NOT NULL,MultiplicityUpperLimit INTEGER,IsPolymorphic BOOLEAN NOT NULL CHECK(IsPolymorphic IN (0,1)))",
    ),
    table(
        "ec_RelationshipConstraintClass",
        "CREATE TABLE ec_RelationshipConstraintClass(Id INTEGER PRIMARY KEY,ConstraintId INTEGER NOT NULL REFERENCES ec_RelationshipConstraint(Id) ON DELETE CASCADE,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE)",
    ),
    table(
        "ec_CustomAttribute",
        "CREATE TABLE ec_CustomAttribute(Id INTEGER PRIMARY KEY,ContainerId INTEGER NOT NULL,ContainerType INTEGER NOT NULL,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,Ordinal INTEGER NOT NULL DEFAULT 0,Instance TEXT)",
    ),
    table(
        "ec_ClassMap",
        "CREATE TABLE ec_ClassMap(ClassId INTEGER PRIMARY KEY REFERENCES ec_Class(Id) ON DELETE CASCADE,MapStrategy INTEGER NOT NULL,ShareColumnsMode INTEGER,MaxSharedColumnsBeforeOverflow INTEGER,JoinedTableInfo INTEGER)",
    ),
    table(
        "ec_PropertyPath",
        "CREATE TABLE ec_PropertyPath(Id INTEGER PRIMARY KEY,RootPropertyId INTEGER REFERENCES ec_Property(Id) ON DELETE CASCADE,AccessString TEXT NOT NULL COLLATE NOCASE)",
    ),
    table(
        "ec_Table",
        "CREATE TABLE ec_Table(Id INTEGER PRIMARY KEY,ParentTableId INTEGER REFERENCES ec_Table(Id) ON DELETE CASCADE,Name TEXT UNIQUE NOT NULL COLLATE NOCASE,Type INTEGER NOT NULL,ExclusiveRootClassId INTEGER REFERENCES ec_Class(Id) ON DELETE SET NULL,UpdatableViewName TEXT)",
    ),
    table(
        "ec_Column",
        "CREATE TABLE ec_Column(Id INTEGER PRIMARY KEY,TableId INTEGER NOT NULL REFERENCES ec_Table(Id) ON DELETE CASCADE,Name TEXT NOT NULL COLLATE NOCASE,Type INTEGER NOT NULL,IsVirtual BOOLEAN NOT NULL CHECK(IsVirtual IN (0,1)),Ordinal INTEGER NOT NULL,NotNullConstraint BOOLEAN NOT NULL DEFAULT 0,UniqueConstraint BOOLEAN NOT NULL DEFAULT 0,CheckConstraint TEXT,DefaultConstraint TEXT,CollationConstraint INTEGER NOT NULL DEFAULT 0,OrdinalInPrimaryKey INTEGER,ColumnKind INTEGER NOT NULL DEFAULT 0)",
    ),
    table(
        "ec_Index",
        "CREATE TABLE ec_Index(Id INTEGER PRIMARY KEY,Name TEXT UNIQUE NOT NULL COLLATE NOCASE,TableId INTEGER NOT NULL REFERENCES ec_Table(Id) ON DELETE CASCADE,ClassId INTEGER REFERENCES ec_Class(Id) ON DELETE CASCADE,IsUnique BOOLEAN NOT NULL CHECK(IsUnique IN (0,1)),AddNotNullWhereExp BOOLEAN NOT NULL DEFAULT 0,IsAutoGenerated BOOLEAN NOT NULL CHECK(IsAutoGenerated IN (0,1)))",
    ),
    table(
        "ec_IndexColumn",
        "CREATE TABLE ec_IndexColumn(Id INTEGER PRIMARY KEY,IndexId INTEGER NOT NULL REFERENCES ec_Index(Id) ON DELETE CASCADE,ColumnId INTEGER NOT NULL REFERENCES ec_Column(Id) ON DELETE CASCADE,Ordinal INTEGER NOT NULL)",
    ),
    table(
        "ec_PropertyMap",
        "CREATE TABLE ec_PropertyMap(Id INTEGER PRIMARY KEY,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,PropertyPathId INTEGER NOT NULL REFERENCES ec_PropertyPath(Id) ON DELETE CASCADE,ColumnId INTEGER NOT NULL REFERENCES ec_Column(Id) ON DELETE CASCADE)",
    ),
    table(
        "ec_cache_ClassHierarchy",
        "CREATE TABLE ec_cache_ClassHierarchy(Id INTEGER PRIMARY KEY,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,BaseClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE)",
    ),
    table(
        "ec_cache_ClassHasTables",
        "CREATE TABLE ec_cache_ClassHasTables(Id INTEGER PRIMARY KEY,ClassId INTEGER NOT NULL REFERENCES ec_Class(Id) ON DELETE CASCADE,TableId INTEGER NOT NULL REFERENCES ec_Table(Id) ON DELETE CASCADE)",
    ),
    index(
        "ix_ec_Class_SchemaId_Name",
        "CREATE INDEX ix_ec_Class_SchemaId_Name ON ec_Class(SchemaId,Name)",
    ),
    index(
        "uix_ec_ClassHasBaseClasses_ClassId_Ordinal",
        "CREATE UNIQUE INDEX uix_ec_ClassHasBaseClasses_ClassId_Ordinal ON ec_ClassHasBaseClasses(ClassId,Ordinal)",
    ),
    index(
        "ix_ec_ClassHasBaseClasses_BaseClassId",
        "CREATE INDEX ix_ec_ClassHasBaseClasses_BaseClassId ON ec_ClassHasBaseClasses(BaseClassId)",
    ),
    index(
        "uix_ec_Property_ClassId_Name",
        "CREATE UNIQUE INDEX uix_ec_Property_ClassId_Name ON ec_Property(ClassId,Name)",
    ),
    index(
        "uix_ec_RelationshipConstraint_RelationshipClassId_RelationshipEnd",
        "CREATE UNIQUE INDEX uix_ec_RelationshipConstraint_RelationshipClassId_RelationshipEnd ON ec_RelationshipConstraint(RelationshipClassId,RelationshipEnd)",
    ),
    index(
        "uix_ec_RelationshipConstraintClass_ConstraintId_ClassId",
        "CREATE UNIQUE INDEX uix_ec_RelationshipConstraintClass_ConstraintId_ClassId ON ec_RelationshipConstraintClass(ConstraintId,ClassId)",
    ),
    index(
        "ix_ec_CustomAttribute_ContainerId_ContainerType",
        "CREATE INDEX ix_ec_CustomAttribute_ContainerId_ContainerType ON ec_CustomAttribute(ContainerId,ContainerType)",
    ),
    index(
        "uix_ec_PropertyPath_RootPropertyId_AccessString",
        "CREATE UNIQUE INDEX uix_ec_PropertyPath_RootPropertyId_AccessString ON ec_PropertyPath(RootPropertyId,AccessString COLLATE NOCASE)",
    ),
    index(
        "ix_ec_Column_TableId",
        "CREATE INDEX ix_ec_Column_TableId ON ec_Column(TableId)",
    ),
    index(
        "ix_ec_Index_TableId",
        "CREATE INDEX ix_ec_Index_TableId ON ec_Index(TableId)",
    ),
    index(
        "ix_ec_IndexColumn_IndexId",
        "CREATE INDEX ix_ec_IndexColumn_IndexId ON ec_IndexColumn(IndexId)",
    ),
    index(
        "uix_ec_PropertyMap_ClassId_PropertyPathId_ColumnId",
        "CREATE UNIQUE INDEX uix_ec_PropertyMap_ClassId_PropertyPathId_ColumnId ON ec_PropertyMap(ClassId,PropertyPathId,ColumnId)",
    ),
    index(
        "ix_ec_cache_ClassHierarchy_ClassId",
        "CREATE INDEX ix_ec_cache_ClassHierarchy_ClassId ON ec_cache_ClassHierarchy(ClassId)",
    ),
    index(
        "ix_ec_cache_ClassHierarchy_BaseClassId",
        "CREATE INDEX ix_ec_cache_ClassHierarchy_BaseClassId ON ec_cache_ClassHierarchy(BaseClassId)",
    ),
    index(
        "ix_ec_cache_ClassHasTables_ClassId_TableId",
        "CREATE INDEX ix_ec_cache_ClassHasTables_ClassId_TableId ON ec_cache_ClassHasTables(ClassId,TableId)",
    ),
];

const PROFILE_4_0_0_2_ADDITIONS: &[ProfileObject] = &[
    index(
        "ix_ec_PropertyMap_ColumnId",
        "CREATE INDEX ix_ec_PropertyMap_ColumnId ON ec_PropertyMap(ColumnId)",
    ),
    index(
        "ix_ec_Table_ParentTableId",
        "CREATE INDEX ix_ec_Table_ParentTableId ON ec_Table(ParentTableId)",
    ),
    trigger(
        "ec_Table_delete_cache",
        "CREATE TRIGGER ec_Table_delete_cache AFTER DELETE ON ec_Table BEGIN DELETE FROM ec_cache_ClassHasTables WHERE TableId=OLD.Id; END",
    ),
];

/// The pinned objects of the given profile version.
///
/// Versions before `4.0.0.2` use the base profile; later ones include its
/// additions.
pub fn baseline(version: ProfileVersion) -> Vec<ProfileObject> {
    let mut objects = BASE_PROFILE.to_vec();
    if version >= ProfileVersion::V4_0_0_2 {
        objects.extend_from_slice(PROFILE_4_0_0_2_ADDITIONS);
    }
    objects
}

/// Collapse runs of whitespace so that DDL text compares by content.
pub fn normalize_ddl(ddl: &str) -> String {
    ddl.split_whitespace().collect::<Vec<_>>().join(" ")
}

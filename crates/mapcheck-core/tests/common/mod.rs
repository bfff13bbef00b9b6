//! Shared fixture: a mapped file with a small, consistent schema.
//!
//! Classes of schema `TestSchema` (alias `ts`):
//!
//! | id | class               | kind / strategy                          | tables            |
//! |----|---------------------|------------------------------------------|-------------------|
//! | 10 | Owner               | sealed entity, OwnTable                  | ts_Owner          |
//! | 11 | Widget              | sealed entity, OwnTable                  | ts_Widget         |
//! | 12 | OwnerOwnsWidgets    | relationship, foreign key in target      | virtual           |
//! | 13 | WidgetRefersToOwner | relationship, link table                 | ts_WidgetRefersToOwner |
//! | 14 | Element             | abstract entity, TablePerHierarchy       | ts_Element        |
//! | 15 | Part                | sealed Element subclass                  | + ts_Part, ts_Part_Overflow |
//! | 16 | Dimensions          | struct, not mapped                       |                   |
//! | 17 | ClassDocs           | custom attribute, not mapped             |                   |

#![allow(dead_code)]

use mapcheck_core::{
    Check, Error, IntegrityChecker, IntegrityConfig, MapValidator, MemoryIssueReporter, Store,
    Violation,
};

pub struct TestFile {
    pub store: Store,
    _dir: tempfile::TempDir,
}

impl TestFile {
    /// A file holding the pinned profile, the canned mapping and one row per
    /// concrete class.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("test.db")).unwrap();
        let file = Self { store, _dir: dir };
        file.execute("PRAGMA foreign_keys=OFF;");
        for object in mapcheck_core::profile::baseline(mapcheck_core::ProfileVersion::LATEST) {
            file.execute(object.ddl);
        }
        file.execute(
            "INSERT INTO be_Prop(Namespace,Name,StrData) VALUES ('ec_Db','SchemaVersion','4.0.0.2');",
        );
        file.execute(CATALOG);
        file.execute(&columns());
        file.execute(PROPERTY_MAPS);
        file.execute(PHYSICAL);
        file
    }

    pub fn execute(&self, sql: &str) {
        self.store.connection().execute_batch(sql).unwrap();
    }

    /// Run the validator and return its result with the reported messages.
    pub fn validate(&self) -> (Result<(), Error>, Vec<String>) {
        let reporter = MemoryIssueReporter::new();
        let result = MapValidator::new(&self.store, &reporter).validate();
        (result, reporter.messages())
    }

    pub fn checker(&self) -> IntegrityChecker<'_> {
        IntegrityChecker::new(&self.store, IntegrityConfig::default())
    }

    /// Every violation of a check.
    pub fn violations(&self, check: Check) -> Vec<Violation> {
        let mut rows = Vec::new();
        let delivered = self
            .checker()
            .run_check(check, |v| {
                rows.push(v);
                true
            })
            .unwrap();
        assert_eq!(delivered, rows.len());
        rows
    }
}

const CATALOG: &str = "
INSERT INTO ec_Schema(Id,Name,Alias) VALUES (1,'TestSchema','ts');

INSERT INTO ec_Class(Id,SchemaId,Name,Type,Modifier) VALUES
    (10,1,'Owner',0,2),
    (11,1,'Widget',0,2),
    (12,1,'OwnerOwnsWidgets',1,2),
    (13,1,'WidgetRefersToOwner',1,2),
    (14,1,'Element',0,1),
    (15,1,'Part',0,2),
    (16,1,'Dimensions',2,0),
    (17,1,'ClassDocs',3,2);

INSERT INTO ec_ClassHasBaseClasses(Id,ClassId,BaseClassId,Ordinal) VALUES (1,15,14,0);

INSERT INTO ec_Property(Id,ClassId,Name,Kind,PrimitiveType,StructClassId,NavigationRelationshipClassId,NavigationDirection) VALUES
    (100,10,'Name',0,2305,NULL,NULL,NULL),
    (101,10,'Size',1,NULL,16,NULL,NULL),
    (110,11,'Code',0,2305,NULL,NULL,NULL),
    (111,11,'Origin',0,1793,NULL,NULL,NULL),
    (112,11,'Owner',4,NULL,NULL,12,2),
    (130,13,'Note',0,2305,NULL,NULL,NULL),
    (140,14,'Label',0,2305,NULL,NULL,NULL),
    (150,15,'Mass',0,1025,NULL,NULL,NULL),
    (151,15,'Density',0,1025,NULL,NULL,NULL),
    (160,16,'Width',0,1025,NULL,NULL,NULL),
    (161,16,'Height',0,1025,NULL,NULL,NULL);

INSERT INTO ec_RelationshipConstraint(Id,RelationshipClassId,RelationshipEnd,MultiplicityLowerLimit,MultiplicityUpperLimit,IsPolymorphic) VALUES
    (1,12,0,0,1,0),
    (2,12,1,0,NULL,0),
    (3,13,0,0,NULL,0),
    (4,13,1,0,NULL,1);

INSERT INTO ec_RelationshipConstraintClass(Id,ConstraintId,ClassId) VALUES
    (1,1,10),
    (2,2,11),
    (3,3,11),
    (4,4,10);

INSERT INTO ec_CustomAttribute(Id,ContainerId,ContainerType,ClassId,Ordinal,Instance) VALUES
    (1,10,2,17,0,'<ClassDocs/>');

INSERT INTO ec_ClassMap(ClassId,MapStrategy) VALUES
    (10,1),
    (11,1),
    (12,10),
    (13,1),
    (14,2),
    (15,2),
    (16,0),
    (17,0);

INSERT INTO ec_Table(Id,ParentTableId,Name,Type,ExclusiveRootClassId) VALUES
    (1,NULL,'ts_Owner',0,10),
    (2,NULL,'ts_Widget',0,11),
    (3,NULL,'ts_OwnerOwnsWidgets',4,NULL),
    (4,NULL,'ts_WidgetRefersToOwner',0,13),
    (5,NULL,'ts_Element',0,14),
    (6,5,'ts_Part',1,14),
    (7,6,'ts_Part_Overflow',3,14);

INSERT INTO ec_Index(Id,Name,TableId,ClassId,IsUnique,AddNotNullWhereExp,IsAutoGenerated) VALUES
    (1,'ix_ts_Widget_OwnerId',2,11,0,0,1),
    (2,'ix_ts_Owner_Name',1,10,0,0,0);

INSERT INTO ec_IndexColumn(Id,IndexId,ColumnId,Ordinal) VALUES
    (1,1,2006,0),
    (2,2,1003,0);

INSERT INTO ec_cache_ClassHierarchy(Id,ClassId,BaseClassId) VALUES
    (1,10,10),
    (2,11,11),
    (3,12,12),
    (4,13,13),
    (5,14,14),
    (6,15,15),
    (7,16,16),
    (8,17,17),
    (9,15,14);

INSERT INTO ec_cache_ClassHasTables(Id,ClassId,TableId) VALUES
    (1,10,1),
    (2,11,2),
    (3,12,3),
    (4,13,4),
    (5,14,5),
    (6,15,5),
    (7,15,6),
    (8,15,7);
";

/// Column kinds.
const DEFAULT: i64 = 0;
const INSTANCE_ID: i64 = 1;
const CLASS_ID: i64 = 2;

/// Column types.
const INTEGER: i64 = 5;
const REAL: i64 = 4;
const TEXT: i64 = 6;

fn columns() -> String {
    // (id, table, name, type, virtual, kind)
    let columns: &[(i64, i64, &str, i64, bool, i64)] = &[
        (1001, 1, "Id", INTEGER, false, INSTANCE_ID),
        (1002, 1, "ECClassId", INTEGER, false, CLASS_ID),
        (1003, 1, "Name", TEXT, false, DEFAULT),
        (1004, 1, "Size_Width", REAL, false, DEFAULT),
        (1005, 1, "Size_Height", REAL, false, DEFAULT),
        (2001, 2, "Id", INTEGER, false, INSTANCE_ID),
        (2002, 2, "ECClassId", INTEGER, false, CLASS_ID),
        (2003, 2, "Code", TEXT, false, DEFAULT),
        (2004, 2, "Origin_X", REAL, false, DEFAULT),
        (2005, 2, "Origin_Y", REAL, false, DEFAULT),
        (2006, 2, "OwnerId", INTEGER, false, DEFAULT),
        (2007, 2, "OwnerRelECClassId", INTEGER, false, DEFAULT),
        (3001, 3, "Id", INTEGER, true, INSTANCE_ID),
        (3002, 3, "ECClassId", INTEGER, true, CLASS_ID),
        (3003, 3, "SourceId", INTEGER, true, DEFAULT),
        (3004, 3, "SourceECClassId", INTEGER, true, DEFAULT),
        (3005, 3, "TargetId", INTEGER, true, DEFAULT),
        (3006, 3, "TargetECClassId", INTEGER, true, DEFAULT),
        (4001, 4, "Id", INTEGER, false, INSTANCE_ID),
        (4002, 4, "ECClassId", INTEGER, false, CLASS_ID),
        (4003, 4, "SourceId", INTEGER, false, DEFAULT),
        (4004, 4, "SourceECClassId", INTEGER, true, DEFAULT),
        (4005, 4, "TargetId", INTEGER, false, DEFAULT),
        (4006, 4, "TargetECClassId", INTEGER, false, DEFAULT),
        (4007, 4, "Note", TEXT, false, DEFAULT),
        (5001, 5, "Id", INTEGER, false, INSTANCE_ID),
        (5002, 5, "ECClassId", INTEGER, false, CLASS_ID),
        (5003, 5, "Label", TEXT, false, DEFAULT),
        (6001, 6, "ElementId", INTEGER, false, INSTANCE_ID),
        (6002, 6, "ECClassId", INTEGER, false, CLASS_ID),
        (6003, 6, "Mass", REAL, false, DEFAULT),
        (7001, 7, "ElementId", INTEGER, false, INSTANCE_ID),
        (7002, 7, "ECClassId", INTEGER, false, CLASS_ID),
        (7003, 7, "Density", REAL, false, DEFAULT),
    ];

    let values: Vec<String> = columns
        .iter()
        .map(|(id, table, name, column_type, is_virtual, kind)| {
            format!(
                "({},{},'{}',{},{},{},0,0,0,{})",
                id,
                table,
                name,
                column_type,
                *is_virtual as i64,
                id % 1000,
                kind
            )
        })
        .collect();
    format!(
        "INSERT INTO ec_Column(Id,TableId,Name,Type,IsVirtual,Ordinal,NotNullConstraint,UniqueConstraint,CollationConstraint,ColumnKind) VALUES {};",
        values.join(",")
    )
}

const PROPERTY_MAPS: &str = "
INSERT INTO ec_PropertyPath(Id,RootPropertyId,AccessString) VALUES
    (1,NULL,'ECInstanceId'),
    (2,NULL,'ECClassId'),
    (3,NULL,'SourceECInstanceId'),
    (4,NULL,'SourceECClassId'),
    (5,NULL,'TargetECInstanceId'),
    (6,NULL,'TargetECClassId'),
    (10,100,'Name'),
    (11,101,'Size.Width'),
    (12,101,'Size.Height'),
    (13,110,'Code'),
    (14,111,'Origin.X'),
    (15,111,'Origin.Y'),
    (16,112,'Owner.Id'),
    (17,112,'Owner.RelECClassId'),
    (18,130,'Note'),
    (19,140,'Label'),
    (20,150,'Mass'),
    (21,151,'Density');

INSERT INTO ec_PropertyMap(Id,ClassId,PropertyPathId,ColumnId) VALUES
    (1,10,1,1001),(2,10,2,1002),(3,10,10,1003),(4,10,11,1004),(5,10,12,1005),
    (6,11,1,2001),(7,11,2,2002),(8,11,13,2003),(9,11,14,2004),(10,11,15,2005),
    (11,11,16,2006),(12,11,17,2007),
    (13,12,1,3001),(14,12,2,3002),(15,12,3,3003),(16,12,4,3004),(17,12,5,3005),(18,12,6,3006),
    (19,13,1,4001),(20,13,2,4002),(21,13,3,4003),(22,13,4,4004),(23,13,5,4005),(24,13,6,4006),
    (25,13,18,4007),
    (26,14,1,5001),(27,14,2,5002),(28,14,19,5003),
    (29,15,1,5001),(30,15,1,6001),(31,15,1,7001),
    (32,15,2,5002),(33,15,2,6002),(34,15,2,7002),
    (35,15,19,5003),(36,15,20,6003),(37,15,21,7003);
";

const PHYSICAL: &str = "
CREATE TABLE ts_Owner(Id INTEGER PRIMARY KEY,ECClassId INTEGER,Name TEXT,Size_Width REAL,Size_Height REAL);
CREATE TABLE ts_Widget(Id INTEGER PRIMARY KEY,ECClassId INTEGER,Code TEXT,Origin_X REAL,Origin_Y REAL,OwnerId INTEGER REFERENCES ts_Owner(Id),OwnerRelECClassId INTEGER);
CREATE TABLE ts_WidgetRefersToOwner(Id INTEGER PRIMARY KEY,ECClassId INTEGER,SourceId INTEGER,TargetId INTEGER,TargetECClassId INTEGER,Note TEXT);
CREATE TABLE ts_Element(Id INTEGER PRIMARY KEY,ECClassId INTEGER,Label TEXT);
CREATE TABLE ts_Part(ElementId INTEGER PRIMARY KEY,ECClassId INTEGER,Mass REAL);
CREATE TABLE ts_Part_Overflow(ElementId INTEGER PRIMARY KEY,ECClassId INTEGER,Density REAL);
CREATE INDEX ix_ts_Widget_OwnerId ON ts_Widget(OwnerId);
CREATE INDEX ix_ts_Owner_Name ON ts_Owner(Name);

INSERT INTO ts_Owner VALUES (1,10,'root',1.0,2.0);
INSERT INTO ts_Widget VALUES (2,11,'w',0.5,0.5,1,12);
INSERT INTO ts_WidgetRefersToOwner VALUES (3,13,2,1,10,'note');
INSERT INTO ts_Element VALUES (4,15,'part');
INSERT INTO ts_Part VALUES (4,15,3.5);
INSERT INTO ts_Part_Overflow VALUES (4,15,7.8);
";

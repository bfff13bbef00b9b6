//! Integration tests for the integrity checker.

mod common;

use common::TestFile;
use mapcheck_core::integrity::{
    ClassIdViolation, LinkTableClassIdViolation, LinkTableIdViolation, MissingChildRowViolation,
    NavClassIdViolation, NavIdViolation, PhysicalDriftViolation, ProfileIssue, TableRole,
};
use mapcheck_core::catalog::RelationshipEnd;
use mapcheck_core::storage::PhysicalObjectKind;
use mapcheck_core::{Check, CheckStatus, Error, IntegrityChecker, IntegrityConfig, Violation};

#[test]
fn test_consistent_file_passes_every_check() {
    let file = TestFile::new();
    for check in Check::ALL {
        assert!(
            file.violations(check).is_empty(),
            "{} reported {:?}",
            check,
            file.violations(check)
        );
    }

    let mut results = Vec::new();
    assert!(file.checker().quick_check(&Check::ALL, |r| results.push(r.clone())));
    assert_eq!(results.len(), Check::ALL.len());
    assert!(results.iter().all(|r| r.status == CheckStatus::Passed));
}

#[test]
fn test_dangling_navigation_id() {
    let file = TestFile::new();
    file.execute("UPDATE ts_Widget SET OwnerId=999 WHERE Id=2;");

    assert_eq!(
        file.violations(Check::NavIds),
        vec![Violation::NavIds(NavIdViolation {
            instance_id: 2,
            class_name: "TestSchema:Widget".into(),
            property_name: "Owner".into(),
            nav_id: 999,
            target_class_name: "TestSchema:Owner".into(),
        })]
    );
}

#[test]
fn test_null_navigation_id_is_not_reported() {
    let file = TestFile::new();
    file.execute("UPDATE ts_Widget SET OwnerId=NULL, OwnerRelECClassId=NULL WHERE Id=2;");

    assert!(file.violations(Check::NavIds).is_empty());
    assert!(file.violations(Check::NavClassIds).is_empty());
}

#[test]
fn test_root_row_exception_for_self_reference() {
    let file = TestFile::new();
    // Point the navigation property at widgets so that it refers back into its own table.
    file.execute(
        "UPDATE ec_RelationshipConstraintClass SET ClassId=11 WHERE Id=1;
         UPDATE ts_Widget SET OwnerId=555 WHERE Id=2;",
    );

    assert_eq!(file.violations(Check::NavIds).len(), 1);

    let checker = IntegrityChecker::new(&file.store, IntegrityConfig::new().with_root_row_id(2));
    assert_eq!(checker.check_nav_ids(|_| true).unwrap(), 0);

    let checker = IntegrityChecker::new(&file.store, IntegrityConfig::new().without_root_row());
    assert_eq!(checker.check_nav_ids(|_| true).unwrap(), 1);
}

#[test]
fn test_callback_stops_check_early() {
    let file = TestFile::new();
    file.execute(
        "INSERT INTO ts_Widget(Id,ECClassId,Code,OwnerId,OwnerRelECClassId) VALUES
             (5,11,'b',998,12),
             (6,11,'c',997,12);",
    );

    let mut seen = Vec::new();
    let delivered = file
        .checker()
        .check_nav_ids(|v| {
            seen.push(v.instance_id);
            false
        })
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(seen, vec![5]);

    let all: Vec<i64> = file
        .violations(Check::NavIds)
        .into_iter()
        .map(|v| match v {
            Violation::NavIds(v) => v.nav_id,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    assert_eq!(all, vec![998, 997]);
}

#[test]
fn test_invalid_navigation_relationship_class_id() {
    let file = TestFile::new();
    file.execute("UPDATE ts_Widget SET OwnerRelECClassId=10 WHERE Id=2;");

    assert_eq!(
        file.violations(Check::NavClassIds),
        vec![Violation::NavClassIds(NavClassIdViolation {
            instance_id: 2,
            class_name: "TestSchema:Widget".into(),
            property_name: "Owner".into(),
            rel_class_id: 10,
            relationship_class_name: "TestSchema:OwnerOwnsWidgets".into(),
        })]
    );
}

/// Abstract `Base` (20) is mapped to the virtual table `ts_Base` and declares
/// the navigation property `Ref`. Sealed `Concrete` (21) stores it in
/// `ts_Concrete`.
const INHERITED_NAVIGATION: &str = "
INSERT INTO ec_Class(Id,SchemaId,Name,Type,Modifier) VALUES (20,1,'Base',0,1),(21,1,'Concrete',0,2);
INSERT INTO ec_ClassHasBaseClasses(Id,ClassId,BaseClassId,Ordinal) VALUES (2,21,20,0);
INSERT INTO ec_Property(Id,ClassId,Name,Kind,PrimitiveType,StructClassId,NavigationRelationshipClassId,NavigationDirection) VALUES
    (200,20,'Ref',4,NULL,NULL,12,2);
INSERT INTO ec_ClassMap(ClassId,MapStrategy) VALUES (20,1),(21,1);
INSERT INTO ec_Table(Id,ParentTableId,Name,Type,ExclusiveRootClassId) VALUES
    (8,NULL,'ts_Base',4,NULL),
    (9,NULL,'ts_Concrete',0,21);
INSERT INTO ec_Column(Id,TableId,Name,Type,IsVirtual,Ordinal,NotNullConstraint,UniqueConstraint,CollationConstraint,ColumnKind) VALUES
    (8001,8,'Id',5,1,1,0,0,0,1),
    (8002,8,'ECClassId',5,1,2,0,0,0,2),
    (8003,8,'RefId',5,1,3,0,0,0,0),
    (8004,8,'RefRelECClassId',5,1,4,0,0,0,0),
    (9001,9,'Id',5,0,1,0,0,0,1),
    (9002,9,'ECClassId',5,0,2,0,0,0,2),
    (9003,9,'RefId',5,0,3,0,0,0,0),
    (9004,9,'RefRelECClassId',5,0,4,0,0,0,0);
INSERT INTO ec_PropertyPath(Id,RootPropertyId,AccessString) VALUES
    (22,200,'Ref.Id'),
    (23,200,'Ref.RelECClassId');
INSERT INTO ec_PropertyMap(Id,ClassId,PropertyPathId,ColumnId) VALUES
    (38,20,1,8001),(39,20,2,8002),(40,20,22,8003),(41,20,23,8004),
    (42,21,1,9001),(43,21,2,9002),(44,21,22,9003),(45,21,23,9004);
INSERT INTO ec_cache_ClassHierarchy(Id,ClassId,BaseClassId) VALUES (10,20,20),(11,21,21),(12,21,20);
INSERT INTO ec_cache_ClassHasTables(Id,ClassId,TableId) VALUES (9,20,8),(10,21,9);
CREATE TABLE ts_Concrete(Id INTEGER PRIMARY KEY,ECClassId INTEGER,RefId INTEGER,RefRelECClassId INTEGER);
INSERT INTO ts_Concrete VALUES (50,21,999,12),(51,21,1,10);
";

#[test]
fn test_navigation_inherited_from_virtual_base() {
    let file = TestFile::new();
    file.execute(INHERITED_NAVIGATION);

    assert_eq!(
        file.violations(Check::NavIds),
        vec![Violation::NavIds(NavIdViolation {
            instance_id: 50,
            class_name: "TestSchema:Concrete".into(),
            property_name: "Ref".into(),
            nav_id: 999,
            target_class_name: "TestSchema:Owner".into(),
        })]
    );
    assert_eq!(
        file.violations(Check::NavClassIds),
        vec![Violation::NavClassIds(NavClassIdViolation {
            instance_id: 51,
            class_name: "TestSchema:Concrete".into(),
            property_name: "Ref".into(),
            rel_class_id: 10,
            relationship_class_name: "TestSchema:OwnerOwnsWidgets".into(),
        })]
    );
}

#[test]
fn test_navigation_column_shared_by_hierarchy_is_checked_once() {
    let file = TestFile::new();
    // Element declares `Keeper`; Element and Part both map it onto ts_Element.
    file.execute(
        "INSERT INTO ec_Property(Id,ClassId,Name,Kind,PrimitiveType,StructClassId,NavigationRelationshipClassId,NavigationDirection) VALUES
             (141,14,'Keeper',4,NULL,NULL,12,2);
         INSERT INTO ec_Column(Id,TableId,Name,Type,IsVirtual,Ordinal,NotNullConstraint,UniqueConstraint,CollationConstraint,ColumnKind) VALUES
             (5004,5,'KeeperId',5,0,4,0,0,0,0),
             (5005,5,'KeeperRelECClassId',5,0,5,0,0,0,0);
         INSERT INTO ec_PropertyPath(Id,RootPropertyId,AccessString) VALUES
             (24,141,'Keeper.Id'),
             (25,141,'Keeper.RelECClassId');
         INSERT INTO ec_PropertyMap(Id,ClassId,PropertyPathId,ColumnId) VALUES
             (46,14,24,5004),(47,14,25,5005),(48,15,24,5004),(49,15,25,5005);
         ALTER TABLE ts_Element ADD COLUMN KeeperId INTEGER;
         ALTER TABLE ts_Element ADD COLUMN KeeperRelECClassId INTEGER;
         UPDATE ts_Element SET KeeperId=777, KeeperRelECClassId=12 WHERE Id=4;",
    );

    assert_eq!(
        file.violations(Check::NavIds),
        vec![Violation::NavIds(NavIdViolation {
            instance_id: 4,
            class_name: "TestSchema:Element".into(),
            property_name: "Keeper".into(),
            nav_id: 777,
            target_class_name: "TestSchema:Owner".into(),
        })]
    );
}

#[test]
fn test_profile_ddl_mismatch() {
    let file = TestFile::new();
    file.execute(
        "DROP INDEX uix_ec_PropertyPath_RootPropertyId_AccessString;
         CREATE UNIQUE INDEX uix_ec_PropertyPath_RootPropertyId_AccessString ON ec_PropertyPath(RootPropertyId,AccessString COLLATE RTRIM);",
    );

    let violations = file.violations(Check::EcProfile);
    assert_eq!(violations.len(), 1);
    match &violations[0] {
        Violation::EcProfile(v) => {
            assert_eq!(v.kind, PhysicalObjectKind::Index);
            assert_eq!(v.name, "uix_ec_PropertyPath_RootPropertyId_AccessString");
            match &v.issue {
                ProfileIssue::DdlMismatch { expected, actual } => {
                    assert!(expected.contains("COLLATE NOCASE"));
                    assert!(actual.contains("COLLATE RTRIM"));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_profile_whitespace_is_ignored() {
    let file = TestFile::new();
    file.execute(
        "DROP INDEX ix_ec_Column_TableId;
         CREATE INDEX   ix_ec_Column_TableId
             ON ec_Column(TableId);",
    );

    assert!(file.violations(Check::EcProfile).is_empty());
}

#[test]
fn test_profile_missing_objects() {
    let file = TestFile::new();
    file.execute("DROP TRIGGER ec_Table_delete_cache; DROP INDEX ix_ec_Table_ParentTableId;");

    let mut missing: Vec<String> = file
        .violations(Check::EcProfile)
        .into_iter()
        .map(|v| match v {
            Violation::EcProfile(v) => {
                assert_eq!(v.issue, ProfileIssue::Missing);
                v.name
            }
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    missing.sort();
    assert_eq!(missing, vec!["ec_Table_delete_cache", "ix_ec_Table_ParentTableId"]);
}

#[test]
fn test_profile_baseline_follows_declared_version() {
    let file = TestFile::new();
    file.execute(
        "DROP TRIGGER ec_Table_delete_cache;
         DROP INDEX ix_ec_Table_ParentTableId;
         DROP INDEX ix_ec_PropertyMap_ColumnId;
         UPDATE be_Prop SET StrData='4.0.0.1';",
    );

    assert!(file.violations(Check::EcProfile).is_empty());
}

#[test]
fn test_profile_without_version_is_an_error() {
    let file = TestFile::new();
    file.execute("DELETE FROM be_Prop;");

    let err = file.checker().check_ec_profile(|_| true).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_physical_drift() {
    let file = TestFile::new();
    file.execute(
        "ALTER TABLE ts_Part_Overflow DROP COLUMN Density;
         DROP INDEX ix_ts_Owner_Name;",
    );

    assert_eq!(
        file.violations(Check::DataColumns),
        vec![
            Violation::DataColumns(PhysicalDriftViolation {
                kind: PhysicalObjectKind::Index,
                table: "ts_Owner".into(),
                name: Some("ix_ts_Owner_Name".into()),
            }),
            Violation::DataColumns(PhysicalDriftViolation {
                kind: PhysicalObjectKind::Column,
                table: "ts_Part_Overflow".into(),
                name: Some("Density".into()),
            }),
        ]
    );
}

#[test]
fn test_missing_table_hides_its_columns() {
    let file = TestFile::new();
    file.execute("DROP TABLE ts_Part_Overflow;");

    assert_eq!(
        file.violations(Check::DataColumns),
        vec![Violation::DataColumns(PhysicalDriftViolation {
            kind: PhysicalObjectKind::Table,
            table: "ts_Part_Overflow".into(),
            name: None,
        })]
    );
}

#[test]
fn test_link_table_ids() {
    let file = TestFile::new();
    file.execute("UPDATE ts_WidgetRefersToOwner SET TargetId=77 WHERE Id=3;");

    assert_eq!(
        file.violations(Check::LinkTableIds),
        vec![Violation::LinktableIds(LinkTableIdViolation {
            instance_id: 3,
            relationship_class_name: "TestSchema:WidgetRefersToOwner".into(),
            end: RelationshipEnd::Target,
            missing_id: 77,
            constraint_table: "ts_Owner".into(),
        })]
    );
}

#[test]
fn test_link_table_class_ids() {
    let file = TestFile::new();
    file.execute("UPDATE ts_WidgetRefersToOwner SET TargetECClassId=11 WHERE Id=3;");

    assert_eq!(
        file.violations(Check::LinkTableClassIds),
        vec![Violation::LinktableClassIds(LinkTableClassIdViolation {
            instance_id: 3,
            relationship_class_name: "TestSchema:WidgetRefersToOwner".into(),
            end: RelationshipEnd::Target,
            class_id: 11,
        })]
    );
}

#[test]
fn test_class_ids() {
    let file = TestFile::new();
    file.execute(
        "UPDATE ts_Element SET ECClassId=999 WHERE Id=4;
         UPDATE ts_Part SET ECClassId=NULL WHERE ElementId=4;",
    );

    assert_eq!(
        file.violations(Check::ClassIds),
        vec![
            Violation::ClassIds(ClassIdViolation {
                table_role: TableRole::Primary,
                table_name: "ts_Element".into(),
                instance_id: 4,
                class_id: Some(999),
            }),
            Violation::ClassIds(ClassIdViolation {
                table_role: TableRole::Joined,
                table_name: "ts_Part".into(),
                instance_id: 4,
                class_id: None,
            }),
        ]
    );
}

#[test]
fn test_missing_child_rows() {
    let file = TestFile::new();
    file.execute("DELETE FROM ts_Part;");

    let expected = MissingChildRowViolation {
        instance_id: 4,
        class_id: 15,
        class_name: "TestSchema:Part".into(),
        table_name: "ts_Part".into(),
    };
    let mut rows = Vec::new();
    let delivered = file
        .checker()
        .check_missing_child_rows("ts_Element", |v| {
            rows.push(v);
            true
        })
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(rows, vec![expected.clone()]);

    assert_eq!(
        file.violations(Check::MissingChildRows),
        vec![Violation::MissingChildRows(expected)]
    );
}

#[test]
fn test_missing_child_rows_of_unknown_table() {
    let file = TestFile::new();
    let err = file
        .checker()
        .check_missing_child_rows("ts_Nothing", |_| true)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_schema_that_does_not_resolve() {
    let file = TestFile::new();
    file.execute("DELETE FROM ec_RelationshipConstraintClass WHERE Id=4;");

    let violations = file.violations(Check::SchemaLoad);
    assert_eq!(violations.len(), 1);
    match &violations[0] {
        Violation::SchemaLoad(v) => {
            assert_eq!(v.schema_name, "TestSchema");
            assert!(v.message.contains("WidgetRefersToOwner"), "{}", v.message);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_catalog_load_failure_reports_every_schema() {
    let file = TestFile::new();
    file.execute("UPDATE ec_Class SET Type=9 WHERE Id=16;");

    let violations = file.violations(Check::SchemaLoad);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].to_string().starts_with("schema 'TestSchema' does not load"));
}

#[test]
fn test_quick_check_continues_after_failures() {
    let file = TestFile::new();
    file.execute(
        "UPDATE ts_Widget SET OwnerId=999 WHERE Id=2;
         UPDATE ts_Part SET ECClassId=NULL WHERE ElementId=4;
         DELETE FROM be_Prop;",
    );

    let mut results = Vec::new();
    let passed = file.checker().quick_check(&Check::ALL, |r| results.push(r.clone()));
    assert!(!passed);

    let statuses: Vec<(Check, CheckStatus)> =
        results.into_iter().map(|r| (r.check, r.status)).collect();
    assert_eq!(statuses.len(), Check::ALL.len());
    for (check, status) in statuses {
        match check {
            Check::EcProfile => assert!(matches!(status, CheckStatus::Error(_))),
            Check::NavIds | Check::ClassIds => assert_eq!(status, CheckStatus::Failed),
            _ => assert_eq!(status, CheckStatus::Passed, "{}", check),
        }
    }
}

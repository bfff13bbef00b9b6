//! Property maps: how a class's properties land in columns.

use serde::Serialize;

use super::types::{ClassId, ColumnId, ColumnKind, NavigationDirection, PropertyId};

/// System properties every mapped class (or relationship) carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SystemPropertyKind {
    /// `ECInstanceId`.
    InstanceId,
    /// `ECClassId`.
    ClassId,
    /// `SourceECInstanceId`.
    SourceInstanceId,
    /// `SourceECClassId`.
    SourceClassId,
    /// `TargetECInstanceId`.
    TargetInstanceId,
    /// `TargetECClassId`.
    TargetClassId,
}

impl SystemPropertyKind {
    /// All system properties, in map order.
    pub const ALL: [SystemPropertyKind; 6] = [
        SystemPropertyKind::InstanceId,
        SystemPropertyKind::ClassId,
        SystemPropertyKind::SourceInstanceId,
        SystemPropertyKind::SourceClassId,
        SystemPropertyKind::TargetInstanceId,
        SystemPropertyKind::TargetClassId,
    ];

    /// The property access string.
    pub fn access_string(&self) -> &'static str {
        match self {
            SystemPropertyKind::InstanceId => "ECInstanceId",
            SystemPropertyKind::ClassId => "ECClassId",
            SystemPropertyKind::SourceInstanceId => "SourceECInstanceId",
            SystemPropertyKind::SourceClassId => "SourceECClassId",
            SystemPropertyKind::TargetInstanceId => "TargetECInstanceId",
            SystemPropertyKind::TargetClassId => "TargetECClassId",
        }
    }

    /// Parse an access string.
    pub fn from_access_string(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.access_string().eq_ignore_ascii_case(s))
    }

    /// Column kind the mapped columns must have, if constrained.
    pub fn required_column_kind(&self) -> Option<ColumnKind> {
        match self {
            SystemPropertyKind::InstanceId => Some(ColumnKind::InstanceId),
            SystemPropertyKind::ClassId => Some(ColumnKind::ClassId),
            _ => None,
        }
    }
}

impl std::fmt::Display for SystemPropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.access_string())
    }
}

/// A system property mapped to one column per table the class uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemPropertyMap {
    /// Which system property.
    pub kind: SystemPropertyKind,
    /// Mapped columns.
    pub columns: Vec<ColumnId>,
}

/// The navigation part of a data property map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationMap {
    /// Relationship class navigated.
    pub relationship: ClassId,
    /// Which end the property sits on.
    pub direction: NavigationDirection,
    /// `<prop>.Id` column.
    pub id: Option<ColumnId>,
    /// `<prop>.RelECClassId` column.
    pub rel_class_id: Option<ColumnId>,
    /// The id column carries a physical foreign key.
    pub physical_fk: bool,
    /// The referenced end is `1..1`.
    pub implies_not_null: bool,
    /// The owning end has an upper limit of one.
    pub implies_unique: bool,
}

/// Shape of a data property map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DataMapKind {
    /// Single-column property (primitives and arrays).
    Primitive {
        /// Mapped column.
        column: ColumnId,
    },
    /// 2D point.
    Point2d {
        /// `.X` column.
        x: Option<ColumnId>,
        /// `.Y` column.
        y: Option<ColumnId>,
    },
    /// 3D point.
    Point3d {
        /// `.X` column.
        x: Option<ColumnId>,
        /// `.Y` column.
        y: Option<ColumnId>,
        /// `.Z` column.
        z: Option<ColumnId>,
    },
    /// Embedded struct.
    Struct {
        /// Struct class.
        struct_class: ClassId,
        /// Member maps.
        members: Vec<DataPropertyMap>,
    },
    /// Navigation property.
    Navigation(NavigationMap),
}

/// Map of a business property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPropertyMap {
    /// Mapped property.
    pub property: PropertyId,
    /// Access string relative to the class, e.g. `Size.Width`.
    pub access_string: String,
    /// Shape.
    pub kind: DataMapKind,
}

impl DataPropertyMap {
    /// Every column the map (and its members) reference.
    pub fn columns(&self) -> Vec<ColumnId> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, out: &mut Vec<ColumnId>) {
        match &self.kind {
            DataMapKind::Primitive { column } => out.push(*column),
            DataMapKind::Point2d { x, y } => out.extend([x, y].into_iter().flatten()),
            DataMapKind::Point3d { x, y, z } => out.extend([x, y, z].into_iter().flatten()),
            DataMapKind::Struct { members, .. } => {
                for member in members {
                    member.collect_columns(out);
                }
            }
            DataMapKind::Navigation(nav) => out.extend([nav.id, nav.rel_class_id].into_iter().flatten()),
        }
    }
}

/// A property map of a class map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PropertyMap {
    /// System property.
    System(SystemPropertyMap),
    /// Business property.
    Data(DataPropertyMap),
}

impl PropertyMap {
    /// Every column referenced.
    pub fn columns(&self) -> Vec<ColumnId> {
        match self {
            PropertyMap::System(map) => map.columns.clone(),
            PropertyMap::Data(map) => map.columns(),
        }
    }

    /// Access string of the mapped property.
    pub fn access_string(&self) -> &str {
        match self {
            PropertyMap::System(map) => map.kind.access_string(),
            PropertyMap::Data(map) => &map.access_string,
        }
    }
}

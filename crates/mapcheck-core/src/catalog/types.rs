//! Persisted enumerations and identifier types of the catalog.
//!
//! Every enum here is stored as an integer code. Decoding an unknown code is
//! an error: a code this version does not understand must never be silently
//! treated as some other kind.

use serde::Serialize;

use crate::error::Error;

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

catalog_id!(
    /// Row id in `ec_Schema`.
    SchemaId
);
catalog_id!(
    /// Row id in `ec_Class`.
    ClassId
);
catalog_id!(
    /// Row id in `ec_Property`.
    PropertyId
);
catalog_id!(
    /// Row id in `ec_Table`.
    TableId
);
catalog_id!(
    /// Row id in `ec_Column`.
    ColumnId
);
catalog_id!(
    /// Row id in `ec_Index`.
    IndexId
);

macro_rules! persisted_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $label:literal {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in code order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Decode a persisted code.
            pub fn from_code(code: i64, context: impl Into<String>) -> Result<Self, Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    value => Err(Error::UnknownEnumValue {
                        kind: $label,
                        value,
                        context: context.into(),
                    }),
                }
            }

            /// The persisted code.
            pub fn code(&self) -> i64 {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($name::$variant => write!(f, stringify!($variant))),+
                }
            }
        }
    };
}

persisted_enum!(
    /// Logical type of a column.
    ColumnType as "column type" {
        /// Untyped.
        Any = 0,
        /// Boolean stored as integer.
        Boolean = 1,
        /// Binary data.
        Blob = 2,
        /// Julian day timestamp.
        Timestamp = 3,
        /// Floating point.
        Real = 4,
        /// 64-bit integer.
        Integer = 5,
        /// UTF-8 text.
        Text = 6,
    }
);

persisted_enum!(
    /// Role of a column in the mapping.
    ColumnKind as "column kind" {
        /// Ordinary data column.
        Default = 0,
        /// Instance id (row identity).
        InstanceId = 1,
        /// Class id of the row.
        ClassId = 2,
        /// Generic column shared by several properties.
        SharedData = 4,
    }
);

persisted_enum!(
    /// Collation declared on a column.
    Collation as "collation" {
        /// No collation declared.
        Unset = 0,
        /// Byte-wise comparison.
        Binary = 1,
        /// ASCII case-insensitive comparison.
        NoCase = 2,
        /// Comparison ignoring trailing spaces.
        RTrim = 3,
    }
);

persisted_enum!(
    /// Storage role of a table.
    TableType as "table type" {
        /// Root table of a class or hierarchy.
        Primary = 0,
        /// Table joined 1:1 to its parent for a subclass.
        Joined = 1,
        /// Table not created by the mapping.
        Existing = 2,
        /// Side table holding columns beyond the parent's budget.
        Overflow = 3,
        /// Table with no physical storage.
        Virtual = 4,
    }
);

persisted_enum!(
    /// Kind of a class definition.
    ClassType as "class type" {
        /// Entity class.
        Entity = 0,
        /// Relationship class.
        Relationship = 1,
        /// Struct class.
        Struct = 2,
        /// Custom attribute class.
        CustomAttribute = 3,
    }
);

persisted_enum!(
    /// Inheritance modifier of a class.
    ClassModifier as "class modifier" {
        /// Instantiable and derivable.
        None = 0,
        /// Not instantiable.
        Abstract = 1,
        /// Not derivable.
        Sealed = 2,
    }
);

persisted_enum!(
    /// Kind of a property definition.
    PropertyKind as "property kind" {
        /// Primitive scalar.
        Primitive = 0,
        /// Embedded struct.
        Struct = 1,
        /// Array of primitives.
        PrimitiveArray = 2,
        /// Array of structs.
        StructArray = 3,
        /// Navigation property.
        Navigation = 4,
    }
);

persisted_enum!(
    /// Primitive type of a primitive or primitive-array property.
    PrimitiveType as "primitive type" {
        /// Binary.
        Binary = 0x101,
        /// Boolean.
        Boolean = 0x201,
        /// Date and time.
        DateTime = 0x301,
        /// Double.
        Double = 0x401,
        /// 32-bit integer.
        Integer = 0x501,
        /// 64-bit integer.
        Long = 0x601,
        /// 2D point.
        Point2d = 0x701,
        /// 3D point.
        Point3d = 0x801,
        /// String.
        String = 0x901,
        /// Geometry blob.
        Geometry = 0xa01,
    }
);

persisted_enum!(
    /// Which end a navigation property points from.
    NavigationDirection as "navigation direction" {
        /// Property sits on the source end and points at the target.
        Forward = 1,
        /// Property sits on the target end and points at the source.
        Backward = 2,
    }
);

persisted_enum!(
    /// End of a relationship.
    RelationshipEnd as "relationship end" {
        /// Source end.
        Source = 0,
        /// Target end.
        Target = 1,
    }
);

persisted_enum!(
    /// How a class is mapped onto tables.
    MapStrategy as "map strategy" {
        /// Not mapped at all.
        NotMapped = 0,
        /// Class gets its own table.
        OwnTable = 1,
        /// Class and all subclasses share one table.
        TablePerHierarchy = 2,
        /// Class maps onto a table created outside the mapping.
        ExistingTable = 3,
        /// Relationship stored as a foreign key in the target end's table.
        ForeignKeyRelationshipInTargetTable = 10,
        /// Relationship stored as a foreign key in the source end's table.
        ForeignKeyRelationshipInSourceTable = 11,
    }
);

persisted_enum!(
    /// Container type of a custom attribute instance.
    CustomAttributeContainer as "custom attribute container type" {
        /// Schema.
        Schema = 1,
        /// Entity class.
        EntityClass = 2,
        /// Custom attribute class.
        CustomAttributeClass = 4,
        /// Struct class.
        StructClass = 8,
        /// Relationship class.
        RelationshipClass = 16,
        /// Primitive property.
        PrimitiveProperty = 32,
        /// Struct property.
        StructProperty = 64,
        /// Primitive array property.
        PrimitiveArrayProperty = 128,
        /// Struct array property.
        StructArrayProperty = 256,
        /// Navigation property.
        NavigationProperty = 512,
        /// Source constraint of a relationship.
        SourceRelationshipConstraint = 1024,
        /// Target constraint of a relationship.
        TargetRelationshipConstraint = 2048,
    }
);

impl CustomAttributeContainer {
    /// Catalog table holding the container rows.
    pub fn container_table(&self) -> &'static str {
        match self {
            CustomAttributeContainer::Schema => "ec_Schema",
            CustomAttributeContainer::EntityClass
            | CustomAttributeContainer::CustomAttributeClass
            | CustomAttributeContainer::StructClass
            | CustomAttributeContainer::RelationshipClass => "ec_Class",
            CustomAttributeContainer::PrimitiveProperty
            | CustomAttributeContainer::StructProperty
            | CustomAttributeContainer::PrimitiveArrayProperty
            | CustomAttributeContainer::StructArrayProperty
            | CustomAttributeContainer::NavigationProperty => "ec_Property",
            CustomAttributeContainer::SourceRelationshipConstraint
            | CustomAttributeContainer::TargetRelationshipConstraint => "ec_RelationshipConstraint",
        }
    }
}

impl MapStrategy {
    /// Whether the strategy stores a relationship as a foreign key.
    pub fn is_foreign_key(&self) -> bool {
        matches!(
            self,
            MapStrategy::ForeignKeyRelationshipInSourceTable
                | MapStrategy::ForeignKeyRelationshipInTargetTable
        )
    }
}

impl NavigationDirection {
    /// The relationship end the navigation property sits on.
    pub fn owning_end(&self) -> RelationshipEnd {
        match self {
            NavigationDirection::Forward => RelationshipEnd::Source,
            NavigationDirection::Backward => RelationshipEnd::Target,
        }
    }

    /// The relationship end the navigation property points at.
    pub fn referenced_end(&self) -> RelationshipEnd {
        self.owning_end().other()
    }

    /// Map strategy the relationship must use for this navigation direction.
    pub fn implied_strategy(&self) -> MapStrategy {
        match self {
            NavigationDirection::Forward => MapStrategy::ForeignKeyRelationshipInSourceTable,
            NavigationDirection::Backward => MapStrategy::ForeignKeyRelationshipInTargetTable,
        }
    }
}

impl RelationshipEnd {
    /// The opposite end.
    pub fn other(&self) -> RelationshipEnd {
        match self {
            RelationshipEnd::Source => RelationshipEnd::Target,
            RelationshipEnd::Target => RelationshipEnd::Source,
        }
    }
}

//! Schemas, classes, properties and relationships.

use serde::Serialize;

use super::types::{
    ClassId, ClassModifier, ClassType, NavigationDirection, PrimitiveType, PropertyId,
    PropertyKind, RelationshipEnd, SchemaId,
};

/// A schema definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDef {
    /// Catalog id.
    pub id: SchemaId,
    /// Schema name.
    pub name: String,
    /// Short alias.
    pub alias: String,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassDef {
    /// Catalog id.
    pub id: ClassId,
    /// Owning schema.
    pub schema: SchemaId,
    /// Class name.
    pub name: String,
    /// Qualified name, `Schema:Class`.
    pub full_name: String,
    /// Kind of class.
    pub class_type: ClassType,
    /// Inheritance modifier.
    pub modifier: ClassModifier,
    /// Direct base classes, in declaration order.
    pub base_classes: Vec<ClassId>,
    /// Whether the class is a mixin.
    pub is_mixin: bool,
}

impl ClassDef {
    /// Whether this is a relationship class.
    pub fn is_relationship(&self) -> bool {
        self.class_type == ClassType::Relationship
    }

    /// Whether the class cannot be derived from.
    pub fn is_sealed(&self) -> bool {
        self.modifier == ClassModifier::Sealed
    }
}

/// Navigation part of a property definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationDef {
    /// Relationship class the property navigates.
    pub relationship: ClassId,
    /// Which end the property sits on.
    pub direction: NavigationDirection,
}

/// A property definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDef {
    /// Catalog id.
    pub id: PropertyId,
    /// Declaring class.
    pub class: ClassId,
    /// Property name.
    pub name: String,
    /// Kind of property.
    pub kind: PropertyKind,
    /// Primitive type, for primitive and primitive array properties.
    pub primitive_type: Option<PrimitiveType>,
    /// Struct class, for struct and struct array properties.
    pub struct_class: Option<ClassId>,
    /// Navigation details, for navigation properties.
    pub navigation: Option<NavigationDef>,
}

/// One end of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipConstraint {
    /// Which end this is.
    pub end: RelationshipEnd,
    /// Multiplicity lower limit.
    pub lower: i64,
    /// Multiplicity upper limit. `None` means unbounded.
    pub upper: Option<i64>,
    /// Whether subclasses of the constraint classes are accepted.
    pub polymorphic: bool,
    /// Constraint classes.
    pub classes: Vec<ClassId>,
}

impl RelationshipConstraint {
    /// An unbounded, non-polymorphic constraint with no classes.
    pub fn empty(end: RelationshipEnd) -> Self {
        Self {
            end,
            lower: 0,
            upper: None,
            polymorphic: false,
            classes: Vec::new(),
        }
    }

    /// Multiplicity `1..1`.
    pub fn is_exactly_one(&self) -> bool {
        self.lower == 1 && self.upper == Some(1)
    }

    /// Multiplicity upper limit of one.
    pub fn is_at_most_one(&self) -> bool {
        self.upper == Some(1)
    }

    /// Multiplicity in `(lower..upper)` notation.
    pub fn multiplicity(&self) -> String {
        match self.upper {
            Some(upper) => format!("({}..{})", self.lower, upper),
            None => format!("({}..*)", self.lower),
        }
    }
}

/// Both ends of a relationship class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipDef {
    /// Relationship class.
    pub class: ClassId,
    /// Source end.
    pub source: RelationshipConstraint,
    /// Target end.
    pub target: RelationshipConstraint,
}

impl RelationshipDef {
    /// A relationship whose ends are not loaded yet.
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            source: RelationshipConstraint::empty(RelationshipEnd::Source),
            target: RelationshipConstraint::empty(RelationshipEnd::Target),
        }
    }

    /// The constraint of the given end.
    pub fn end(&self, end: RelationshipEnd) -> &RelationshipConstraint {
        match end {
            RelationshipEnd::Source => &self.source,
            RelationshipEnd::Target => &self.target,
        }
    }

    /// Mutable access to the constraint of the given end.
    pub fn end_mut(&mut self, end: RelationshipEnd) -> &mut RelationshipConstraint {
        match end {
            RelationshipEnd::Source => &mut self.source,
            RelationshipEnd::Target => &mut self.target,
        }
    }

    /// Whether any end lists the given class.
    pub fn references(&self, class: ClassId) -> bool {
        self.source.classes.contains(&class) || self.target.classes.contains(&class)
    }
}

//! Schema and instance handles.
//!
//! Handles are cheap, cloneable snapshots returned by a
//! [`GraphSession`](crate::GraphSession). They carry the concept's id plus
//! the label information callers usually need, so most operations never
//! have to round-trip to the store just to print or compare a concept.

use std::fmt;

// ---------------------------------------------------------------------------
// ConceptId
// ---------------------------------------------------------------------------

/// Store-assigned identifier of any concept (schema or instance).
///
/// Ids are allocated from a single monotonically increasing counter, so they
/// order by creation time within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConceptId(pub(crate) u64);

impl ConceptId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Formats as `V<n>`, e.g. `V42`.
impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Anything that can play a role in a relation.
pub trait Concept {
    fn id(&self) -> ConceptId;
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The kind of literal a [`ResourceType`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Long,
    Boolean,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::String => write!(f, "string"),
            DataType::Long => write!(f, "long"),
            DataType::Boolean => write!(f, "boolean"),
        }
    }
}

/// A literal held by a [`Resource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceValue {
    String(String),
    Long(i64),
    Boolean(bool),
}

impl ResourceValue {
    pub fn data_type(&self) -> DataType {
        match self {
            ResourceValue::String(_) => DataType::String,
            ResourceValue::Long(_) => DataType::Long,
            ResourceValue::Boolean(_) => DataType::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResourceValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceValue::String(s) => write!(f, "{s:?}"),
            ResourceValue::Long(n) => write!(f, "{n}"),
            ResourceValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ResourceValue {
    fn from(s: &str) -> Self {
        ResourceValue::String(s.to_string())
    }
}

impl From<String> for ResourceValue {
    fn from(s: String) -> Self {
        ResourceValue::String(s)
    }
}

impl From<i64> for ResourceValue {
    fn from(n: i64) -> Self {
        ResourceValue::Long(n)
    }
}

impl From<bool> for ResourceValue {
    fn from(b: bool) -> Self {
        ResourceValue::Boolean(b)
    }
}

// ---------------------------------------------------------------------------
// Schema concepts
// ---------------------------------------------------------------------------

/// A type whose instances are plain entities (graph vertices).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityType {
    pub(crate) id: ConceptId,
    pub(crate) label: String,
}

/// A named position in a relation, e.g. `arc-from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleType {
    pub(crate) id: ConceptId,
    pub(crate) label: String,
}

/// A relation type together with the roles it declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationType {
    pub(crate) id: ConceptId,
    pub(crate) label: String,
    pub(crate) roles: Vec<RoleType>,
}

/// A type whose instances are literal-valued resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceType {
    pub(crate) id: ConceptId,
    pub(crate) label: String,
    pub(crate) data_type: DataType,
}

impl EntityType {
    pub fn id(&self) -> ConceptId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl RoleType {
    pub fn id(&self) -> ConceptId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl RelationType {
    pub fn id(&self) -> ConceptId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The roles this relation type declares, in declaration order.
    pub fn roles(&self) -> &[RoleType] {
        &self.roles
    }

    pub fn has_role(&self, role: &RoleType) -> bool {
        self.roles.iter().any(|r| r.label == role.label)
    }
}

impl ResourceType {
    pub fn id(&self) -> ConceptId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

// ---------------------------------------------------------------------------
// Instances
// ---------------------------------------------------------------------------

/// An entity instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    pub(crate) id: ConceptId,
    pub(crate) type_label: String,
}

impl Instance {
    pub fn id(&self) -> ConceptId {
        self.id
    }

    /// Label of the entity type this instance belongs to.
    pub fn type_label(&self) -> &str {
        &self.type_label
    }
}

impl Concept for Instance {
    fn id(&self) -> ConceptId {
        self.id
    }
}

/// A resource instance: one literal value of one resource type.
///
/// Resources are deduplicated per `(type, value)`, so two calls to
/// [`put_resource`](crate::GraphSession::put_resource) with the same
/// arguments return the same resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Resource {
    pub(crate) id: ConceptId,
    pub(crate) type_label: String,
    pub(crate) value: ResourceValue,
}

impl Resource {
    pub fn id(&self) -> ConceptId {
        self.id
    }

    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    pub fn value(&self) -> &ResourceValue {
        &self.value
    }
}

impl Concept for Resource {
    fn id(&self) -> ConceptId {
        self.id
    }
}

impl Concept for ConceptId {
    fn id(&self) -> ConceptId {
        *self
    }
}

//! The graph store session contract.
//!
//! [`GraphSession`] is what fixtures and resolvers program against. A session
//! sees its own uncommitted writes; nothing becomes durable until
//! [`GraphSession::commit`] succeeds.

use crate::concept::{
    Concept, ConceptId, DataType, EntityType, Instance, RelationType, Resource, ResourceType,
    ResourceValue, RoleType,
};
use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Relation builder
// ---------------------------------------------------------------------------

/// A relation waiting to be inserted: its type plus `(role, player)` pairs.
///
/// ```rust,ignore
/// let edge = Relation::new(&arc)
///     .role_player(&arc_from, &parent)
///     .role_player(&arc_to, &child);
/// session.insert_relation(edge)?;
/// ```
#[derive(Debug, Clone)]
pub struct Relation {
    pub(crate) relation_type: RelationType,
    pub(crate) role_players: Vec<(RoleType, ConceptId)>,
}

impl Relation {
    pub fn new(relation_type: &RelationType) -> Self {
        Self {
            relation_type: relation_type.clone(),
            role_players: Vec::new(),
        }
    }

    /// Assign `player` to `role`. Validation happens on insert.
    pub fn role_player(mut self, role: &RoleType, player: &impl Concept) -> Self {
        self.role_players.push((role.clone(), player.id()));
        self
    }
}

/// A stored relation as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRecord {
    pub id: ConceptId,
    pub relation_type: String,
    /// `(role label, player id)` pairs in insertion order.
    pub role_players: Vec<(String, ConceptId)>,
}

impl RelationRecord {
    /// The player of `role`, if the relation assigns one.
    pub fn player(&self, role: &RoleType) -> Option<ConceptId> {
        self.role_players
            .iter()
            .find(|(label, _)| label == role.label())
            .map(|(_, id)| *id)
    }
}

/// Concept totals, used for progress reporting and fixture checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub entities: usize,
    pub relations: usize,
    pub resources: usize,
}

// ---------------------------------------------------------------------------
// GraphSession trait
// ---------------------------------------------------------------------------

/// One read/write session against a graph store.
///
/// Sessions use interior mutability so that several collaborators (an index
/// resolver and a fixture builder, say) can borrow the same session at once.
/// A session is assumed single-writer; implementations must still be
/// `Send + Sync` so a session can be shared with a server under test.
pub trait GraphSession: Send + Sync {
    // --- Schema --------------------------------------------------------------

    /// Define (or fetch) an entity type.
    fn put_entity_type(&self, label: &str) -> Result<EntityType, StoreError>;

    /// Define (or fetch) a role type.
    fn put_role_type(&self, label: &str) -> Result<RoleType, StoreError>;

    /// Define a relation type, or extend an existing one with extra roles.
    fn put_relation_type(
        &self,
        label: &str,
        roles: &[RoleType],
    ) -> Result<RelationType, StoreError>;

    /// Define (or fetch) a resource type. Redefining with a different data
    /// type fails with [`StoreError::TypeConflict`].
    fn put_resource_type(&self, label: &str, data_type: DataType)
        -> Result<ResourceType, StoreError>;

    fn entity_type(&self, label: &str) -> Result<EntityType, StoreError>;
    fn relation_type(&self, label: &str) -> Result<RelationType, StoreError>;
    fn role_type(&self, label: &str) -> Result<RoleType, StoreError>;
    fn resource_type(&self, label: &str) -> Result<ResourceType, StoreError>;

    // --- Data ----------------------------------------------------------------

    /// Create a new entity of `entity_type`.
    fn add_entity(&self, entity_type: &EntityType) -> Result<Instance, StoreError>;

    /// Insert a relation. Every role must be declared by the relation type,
    /// no role may appear twice, and every player must exist.
    fn insert_relation(&self, relation: Relation) -> Result<ConceptId, StoreError>;

    /// Return the resource holding `value` for `resource_type`, creating it
    /// if needed. Values are deduplicated per resource type.
    fn put_resource(
        &self,
        value: ResourceValue,
        resource_type: &ResourceType,
    ) -> Result<Resource, StoreError>;

    /// All resources, of any resource type, that hold `value`.
    fn resources_by_value(&self, value: &ResourceValue) -> Result<Vec<Resource>, StoreError>;

    /// The entities related to `resource` through any relation it plays in.
    fn owner_instances(&self, resource: &Resource) -> Result<Vec<Instance>, StoreError>;

    // --- Reads ---------------------------------------------------------------

    /// Every instance of `entity_type`, ordered by id.
    fn instances(&self, entity_type: &EntityType) -> Result<Vec<Instance>, StoreError>;

    /// Every relation of `relation_type`, ordered by id.
    fn relations(&self, relation_type: &RelationType) -> Result<Vec<RelationRecord>, StoreError>;

    /// Totals visible to this session, including uncommitted writes.
    fn counts(&self) -> Result<GraphCounts, StoreError>;

    // --- Transactions --------------------------------------------------------

    /// Validate and publish all staged writes.
    fn commit(&self) -> Result<(), StoreError>;

    /// Discard all staged writes.
    fn rollback(&self) -> Result<(), StoreError>;
}

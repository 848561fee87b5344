//! In-memory graph store.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the value is
//! dropped. Writes are staged in a working copy that the same session can
//! read back immediately; [`GraphSession::commit`] validates the working copy
//! and publishes it as the committed state, [`GraphSession::rollback`]
//! restores the working copy from the committed state.
//!
//! Two secondary indexes keep fixture-sized graphs fast:
//! - `by_value`: resource value → resource ids (for value lookups);
//! - `castings`: player id → ids of the relations it plays a role in.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::concept::{
    ConceptId, DataType, EntityType, Instance, RelationType, Resource, ResourceType,
    ResourceValue, RoleType,
};
use crate::error::StoreError;
use crate::session::{GraphCounts, GraphSession, Relation, RelationRecord};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum SchemaConcept {
    Entity(EntityType),
    Role(RoleType),
    Relation(RelationType),
    Resource(ResourceType),
}

impl SchemaConcept {
    fn kind(&self) -> &'static str {
        match self {
            SchemaConcept::Entity(_) => "entity",
            SchemaConcept::Role(_) => "role",
            SchemaConcept::Relation(_) => "relation",
            SchemaConcept::Resource(_) => "resource",
        }
    }
}

#[derive(Debug, Clone)]
struct ResourceRow {
    type_label: String,
    value: ResourceValue,
}

#[derive(Debug, Clone)]
struct RelationRow {
    type_label: String,
    role_players: Vec<(String, ConceptId)>,
}

#[derive(Debug, Clone, Default)]
struct GraphData {
    next_id: u64,
    schema: HashMap<String, SchemaConcept>,
    /// Entity id → entity type label.
    entities: BTreeMap<ConceptId, String>,
    resources: BTreeMap<ConceptId, ResourceRow>,
    /// `(resource type label, value)` → resource id. Enforces value dedup.
    resource_keys: HashMap<(String, ResourceValue), ConceptId>,
    by_value: HashMap<ResourceValue, Vec<ConceptId>>,
    relations: BTreeMap<ConceptId, RelationRow>,
    castings: HashMap<ConceptId, Vec<ConceptId>>,
}

impl GraphData {
    fn allocate(&mut self) -> ConceptId {
        self.next_id += 1;
        ConceptId(self.next_id)
    }

    fn contains(&self, id: ConceptId) -> bool {
        self.entities.contains_key(&id)
            || self.resources.contains_key(&id)
            || self.relations.contains_key(&id)
    }

    fn counts(&self) -> GraphCounts {
        GraphCounts {
            entities: self.entities.len(),
            relations: self.relations.len(),
            resources: self.resources.len(),
        }
    }

    fn resource(&self, id: ConceptId) -> Option<Resource> {
        self.resources.get(&id).map(|row| Resource {
            id,
            type_label: row.type_label.clone(),
            value: row.value.clone(),
        })
    }

    /// Every relation must have a player for every role its type declares.
    fn validate(&self) -> Result<(), StoreError> {
        for (id, row) in &self.relations {
            let Some(SchemaConcept::Relation(declared)) = self.schema.get(&row.type_label) else {
                return Err(StoreError::Validation(format!(
                    "relation {id} has undefined type {:?}",
                    row.type_label
                )));
            };
            for role in &declared.roles {
                if !row.role_players.iter().any(|(label, _)| *label == role.label) {
                    return Err(StoreError::Validation(format!(
                        "relation {id} of type {:?} has no player for role {:?}",
                        declared.label, role.label
                    )));
                }
            }
        }
        Ok(())
    }
}

struct Inner {
    committed: GraphData,
    working: GraphData,
}

// ---------------------------------------------------------------------------
// MemoryGraph
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`GraphSession`].
pub struct MemoryGraph {
    inner: RwLock<Inner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                committed: GraphData::default(),
                working: GraphData::default(),
            }),
        }
    }

    /// Totals of the last successful commit, ignoring staged writes.
    pub fn committed_counts(&self) -> GraphCounts {
        self.read().committed.counts()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown(kind: &'static str, label: &str) -> StoreError {
    StoreError::UnknownType {
        kind,
        label: label.to_string(),
    }
}

// ---------------------------------------------------------------------------
// GraphSession impl
// ---------------------------------------------------------------------------

impl GraphSession for MemoryGraph {
    // --- Schema --------------------------------------------------------------

    fn put_entity_type(&self, label: &str) -> Result<EntityType, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;
        match data.schema.get(label) {
            Some(SchemaConcept::Entity(t)) => return Ok(t.clone()),
            Some(other) => {
                return Err(StoreError::TypeConflict {
                    label: label.to_string(),
                    existing: other.kind(),
                })
            }
            None => {}
        }
        let t = EntityType {
            id: data.allocate(),
            label: label.to_string(),
        };
        data.schema
            .insert(label.to_string(), SchemaConcept::Entity(t.clone()));
        Ok(t)
    }

    fn put_role_type(&self, label: &str) -> Result<RoleType, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;
        match data.schema.get(label) {
            Some(SchemaConcept::Role(t)) => return Ok(t.clone()),
            Some(other) => {
                return Err(StoreError::TypeConflict {
                    label: label.to_string(),
                    existing: other.kind(),
                })
            }
            None => {}
        }
        let t = RoleType {
            id: data.allocate(),
            label: label.to_string(),
        };
        data.schema
            .insert(label.to_string(), SchemaConcept::Role(t.clone()));
        Ok(t)
    }

    fn put_relation_type(
        &self,
        label: &str,
        roles: &[RoleType],
    ) -> Result<RelationType, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;

        for role in roles {
            if !matches!(data.schema.get(&role.label), Some(SchemaConcept::Role(_))) {
                return Err(unknown("role", &role.label));
            }
        }

        match data.schema.get_mut(label) {
            Some(SchemaConcept::Relation(t)) => {
                for role in roles {
                    if !t.has_role(role) {
                        t.roles.push(role.clone());
                    }
                }
                return Ok(t.clone());
            }
            Some(other) => {
                return Err(StoreError::TypeConflict {
                    label: label.to_string(),
                    existing: other.kind(),
                })
            }
            None => {}
        }

        let mut declared: Vec<RoleType> = Vec::with_capacity(roles.len());
        for role in roles {
            if !declared.iter().any(|r| r.label == role.label) {
                declared.push(role.clone());
            }
        }
        let t = RelationType {
            id: data.allocate(),
            label: label.to_string(),
            roles: declared,
        };
        data.schema
            .insert(label.to_string(), SchemaConcept::Relation(t.clone()));
        Ok(t)
    }

    fn put_resource_type(
        &self,
        label: &str,
        data_type: DataType,
    ) -> Result<ResourceType, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;
        match data.schema.get(label) {
            Some(SchemaConcept::Resource(t)) if t.data_type == data_type => return Ok(t.clone()),
            Some(SchemaConcept::Resource(t)) => {
                return Err(StoreError::DataTypeMismatch {
                    label: label.to_string(),
                    expected: t.data_type,
                    actual: data_type,
                })
            }
            Some(other) => {
                return Err(StoreError::TypeConflict {
                    label: label.to_string(),
                    existing: other.kind(),
                })
            }
            None => {}
        }
        let t = ResourceType {
            id: data.allocate(),
            label: label.to_string(),
            data_type,
        };
        data.schema
            .insert(label.to_string(), SchemaConcept::Resource(t.clone()));
        Ok(t)
    }

    fn entity_type(&self, label: &str) -> Result<EntityType, StoreError> {
        match self.read().working.schema.get(label) {
            Some(SchemaConcept::Entity(t)) => Ok(t.clone()),
            _ => Err(unknown("entity", label)),
        }
    }

    fn relation_type(&self, label: &str) -> Result<RelationType, StoreError> {
        match self.read().working.schema.get(label) {
            Some(SchemaConcept::Relation(t)) => Ok(t.clone()),
            _ => Err(unknown("relation", label)),
        }
    }

    fn role_type(&self, label: &str) -> Result<RoleType, StoreError> {
        match self.read().working.schema.get(label) {
            Some(SchemaConcept::Role(t)) => Ok(t.clone()),
            _ => Err(unknown("role", label)),
        }
    }

    fn resource_type(&self, label: &str) -> Result<ResourceType, StoreError> {
        match self.read().working.schema.get(label) {
            Some(SchemaConcept::Resource(t)) => Ok(t.clone()),
            _ => Err(unknown("resource", label)),
        }
    }

    // --- Data ----------------------------------------------------------------

    fn add_entity(&self, entity_type: &EntityType) -> Result<Instance, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;
        if !matches!(
            data.schema.get(&entity_type.label),
            Some(SchemaConcept::Entity(_))
        ) {
            return Err(unknown("entity", &entity_type.label));
        }
        let id = data.allocate();
        data.entities.insert(id, entity_type.label.clone());
        Ok(Instance {
            id,
            type_label: entity_type.label.clone(),
        })
    }

    fn insert_relation(&self, relation: Relation) -> Result<ConceptId, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;

        let Some(SchemaConcept::Relation(declared)) =
            data.schema.get(&relation.relation_type.label)
        else {
            return Err(unknown("relation", &relation.relation_type.label));
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for (role, player) in &relation.role_players {
            if !declared.has_role(role) {
                return Err(StoreError::RoleNotInRelation {
                    role: role.label.clone(),
                    relation: declared.label.clone(),
                });
            }
            if !seen.insert(role.label.as_str()) {
                return Err(StoreError::DuplicateRole(role.label.clone()));
            }
            if !data.contains(*player) {
                return Err(StoreError::UnknownConcept(*player));
            }
        }
        let type_label = declared.label.clone();

        let id = data.allocate();
        for (_, player) in &relation.role_players {
            data.castings.entry(*player).or_default().push(id);
        }
        data.relations.insert(
            id,
            RelationRow {
                type_label,
                role_players: relation
                    .role_players
                    .iter()
                    .map(|(role, player)| (role.label.clone(), *player))
                    .collect(),
            },
        );
        Ok(id)
    }

    fn put_resource(
        &self,
        value: ResourceValue,
        resource_type: &ResourceType,
    ) -> Result<Resource, StoreError> {
        let mut inner = self.write();
        let data = &mut inner.working;

        let Some(SchemaConcept::Resource(declared)) = data.schema.get(&resource_type.label) else {
            return Err(unknown("resource", &resource_type.label));
        };
        if declared.data_type != value.data_type() {
            return Err(StoreError::DataTypeMismatch {
                label: declared.label.clone(),
                expected: declared.data_type,
                actual: value.data_type(),
            });
        }

        let key = (declared.label.clone(), value.clone());
        if let Some(id) = data.resource_keys.get(&key) {
            return Ok(Resource {
                id: *id,
                type_label: key.0,
                value,
            });
        }

        let id = data.allocate();
        data.resources.insert(
            id,
            ResourceRow {
                type_label: key.0.clone(),
                value: value.clone(),
            },
        );
        data.by_value.entry(value.clone()).or_default().push(id);
        data.resource_keys.insert(key.clone(), id);
        Ok(Resource {
            id,
            type_label: key.0,
            value,
        })
    }

    fn resources_by_value(&self, value: &ResourceValue) -> Result<Vec<Resource>, StoreError> {
        let inner = self.read();
        let data = &inner.working;
        Ok(data
            .by_value
            .get(value)
            .map(|ids| ids.iter().filter_map(|id| data.resource(*id)).collect())
            .unwrap_or_default())
    }

    fn owner_instances(&self, resource: &Resource) -> Result<Vec<Instance>, StoreError> {
        let inner = self.read();
        let data = &inner.working;
        if !data.resources.contains_key(&resource.id) {
            return Err(StoreError::UnknownConcept(resource.id));
        }

        let mut owners: BTreeSet<ConceptId> = BTreeSet::new();
        for relation_id in data.castings.get(&resource.id).into_iter().flatten() {
            let Some(row) = data.relations.get(relation_id) else {
                continue;
            };
            for (_, player) in &row.role_players {
                if *player != resource.id && data.entities.contains_key(player) {
                    owners.insert(*player);
                }
            }
        }

        Ok(owners
            .into_iter()
            .filter_map(|id| {
                data.entities.get(&id).map(|label| Instance {
                    id,
                    type_label: label.clone(),
                })
            })
            .collect())
    }

    // --- Reads ---------------------------------------------------------------

    fn instances(&self, entity_type: &EntityType) -> Result<Vec<Instance>, StoreError> {
        let inner = self.read();
        Ok(inner
            .working
            .entities
            .iter()
            .filter(|(_, label)| **label == entity_type.label)
            .map(|(id, label)| Instance {
                id: *id,
                type_label: label.clone(),
            })
            .collect())
    }

    fn relations(&self, relation_type: &RelationType) -> Result<Vec<RelationRecord>, StoreError> {
        let inner = self.read();
        Ok(inner
            .working
            .relations
            .iter()
            .filter(|(_, row)| row.type_label == relation_type.label)
            .map(|(id, row)| RelationRecord {
                id: *id,
                relation_type: row.type_label.clone(),
                role_players: row.role_players.clone(),
            })
            .collect())
    }

    fn counts(&self) -> Result<GraphCounts, StoreError> {
        Ok(self.read().working.counts())
    }

    // --- Transactions --------------------------------------------------------

    fn commit(&self) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner.working.validate()?;
        inner.committed = inner.working.clone();
        let counts = inner.committed.counts();
        tracing::debug!(
            entities = counts.entities,
            relations = counts.relations,
            resources = counts.resources,
            "graph committed"
        );
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut inner = self.write();
        inner.working = inner.committed.clone();
        tracing::debug!("graph rolled back to last commit");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

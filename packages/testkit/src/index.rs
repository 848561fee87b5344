//! Uniqueness index over string labels.
//!
//! Fixtures identify their nodes by string labels (`"a0"`, `"a2,3"`). Each
//! labelled instance owns exactly one `index` resource through a `has-index`
//! relation:
//!
//! ```text
//! (has-index-owner: <instance>, has-index-value: index "a2,3") isa has-index
//! ```
//!
//! The store deduplicates resource values, so a label maps to one resource;
//! uniqueness of the *owner* is a construction discipline, checked on every
//! [`IndexResolver::resolve`].

use std::collections::HashSet;

use grove_store::{
    ConceptId, DataType, EntityType, GraphSession, Instance, Relation, RelationType,
    ResourceType, ResourceValue, RoleType,
};

use crate::error::IndexError;

pub const INDEX: &str = "index";
pub const HAS_INDEX: &str = "has-index";
pub const HAS_INDEX_OWNER: &str = "has-index-owner";
pub const HAS_INDEX_VALUE: &str = "has-index-value";

/// Resolves labels to instances and attaches labels to new instances.
pub struct IndexResolver<'s, S: GraphSession + ?Sized> {
    session: &'s S,
    index: ResourceType,
    has_index: RelationType,
    owner: RoleType,
    value: RoleType,
}

impl<'s, S: GraphSession + ?Sized> IndexResolver<'s, S> {
    /// Define the index schema in `session` (idempotent) and return a resolver.
    pub fn define(session: &'s S) -> Result<Self, IndexError> {
        let index = session.put_resource_type(INDEX, DataType::String)?;
        let owner = session.put_role_type(HAS_INDEX_OWNER)?;
        let value = session.put_role_type(HAS_INDEX_VALUE)?;
        let has_index = session.put_relation_type(HAS_INDEX, &[owner.clone(), value.clone()])?;
        Ok(Self {
            session,
            index,
            has_index,
            owner,
            value,
        })
    }

    /// Return a resolver over an index schema that already exists.
    pub fn open(session: &'s S) -> Result<Self, IndexError> {
        Ok(Self {
            session,
            index: session.resource_type(INDEX)?,
            has_index: session.relation_type(HAS_INDEX)?,
            owner: session.role_type(HAS_INDEX_OWNER)?,
            value: session.role_type(HAS_INDEX_VALUE)?,
        })
    }

    /// The single instance indexed as `label`.
    pub fn resolve(&self, label: &str) -> Result<Instance, IndexError> {
        let value = ResourceValue::from(label);
        let mut seen: HashSet<ConceptId> = HashSet::new();
        let mut owners: Vec<Instance> = Vec::new();

        for resource in self.session.resources_by_value(&value)? {
            if resource.type_label() != self.index.label() {
                continue;
            }
            for owner in self.session.owner_instances(&resource)? {
                if seen.insert(owner.id()) {
                    owners.push(owner);
                }
            }
        }

        match owners.len() {
            0 => Err(IndexError::NotFound(label.to_string())),
            1 => Ok(owners.swap_remove(0)),
            n => Err(IndexError::Ambiguous {
                label: label.to_string(),
                owners: n,
            }),
        }
    }

    /// Index `instance` under `label`. Returns the `has-index` relation id.
    pub fn attach_index(&self, instance: &Instance, label: &str) -> Result<ConceptId, IndexError> {
        let resource = self.session.put_resource(label.into(), &self.index)?;
        let id = self.session.insert_relation(
            Relation::new(&self.has_index)
                .role_player(&self.owner, instance)
                .role_player(&self.value, &resource),
        )?;
        Ok(id)
    }

    /// Create an instance of `entity_type` and index it under `label`.
    pub fn put_entity(
        &self,
        label: &str,
        entity_type: &EntityType,
    ) -> Result<Instance, IndexError> {
        let instance = self.session.add_entity(entity_type)?;
        self.attach_index(&instance, label)?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_store::MemoryGraph;

    #[test]
    fn resolves_attached_label() {
        let g = MemoryGraph::new();
        let resolver = IndexResolver::define(&g).unwrap();
        let vertex = g.put_entity_type("vertex").unwrap();

        let a = resolver.put_entity("a0", &vertex).unwrap();
        let b = resolver.put_entity("a1,0", &vertex).unwrap();

        assert_eq!(resolver.resolve("a0").unwrap(), a);
        assert_eq!(resolver.resolve("a1,0").unwrap(), b);
    }

    #[test]
    fn unknown_label_is_not_found() {
        let g = MemoryGraph::new();
        let resolver = IndexResolver::define(&g).unwrap();
        assert_eq!(
            resolver.resolve("missing").unwrap_err(),
            IndexError::NotFound("missing".into())
        );
    }

    #[test]
    fn label_shared_by_two_owners_is_ambiguous() {
        let g = MemoryGraph::new();
        let resolver = IndexResolver::define(&g).unwrap();
        let vertex = g.put_entity_type("vertex").unwrap();
        resolver.put_entity("dup", &vertex).unwrap();
        resolver.put_entity("dup", &vertex).unwrap();

        // Both owners share one deduplicated resource.
        assert_eq!(g.resources_by_value(&"dup".into()).unwrap().len(), 1);
        assert_eq!(
            resolver.resolve("dup").unwrap_err(),
            IndexError::Ambiguous {
                label: "dup".into(),
                owners: 2
            }
        );
    }

    #[test]
    fn other_resource_types_do_not_count() {
        let g = MemoryGraph::new();
        let resolver = IndexResolver::define(&g).unwrap();
        let vertex = g.put_entity_type("vertex").unwrap();
        let a = resolver.put_entity("a0", &vertex).unwrap();

        let name = g.put_resource_type("name", DataType::String).unwrap();
        g.put_resource("a0".into(), &name).unwrap();

        assert_eq!(resolver.resolve("a0").unwrap(), a);
    }

    #[test]
    fn open_requires_existing_schema() {
        let g = MemoryGraph::new();
        assert!(matches!(
            IndexResolver::open(&g),
            Err(IndexError::Store(grove_store::StoreError::UnknownType { .. }))
        ));
        IndexResolver::define(&g).unwrap();
        assert!(IndexResolver::open(&g).is_ok());
    }
}

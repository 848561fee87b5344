//! Transactional in-memory graph store.
//!
//! The store models a typed graph in the style of a knowledge base: entities
//! are instances of an [`EntityType`], relations connect concepts through
//! named roles ([`RoleType`]), and resources hold literal values that other
//! concepts own through relations.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`concept`] | Schema and instance handles: [`EntityType`], [`RelationType`], [`Instance`], [`Resource`], … |
//! | [`session`] | The [`GraphSession`] contract and the [`Relation`] builder |
//! | [`memory`] | [`MemoryGraph`], a staged-write implementation of [`GraphSession`] |
//! | [`error`] | [`StoreError`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use grove_store::{GraphSession, MemoryGraph, Relation};
//!
//! let graph = MemoryGraph::new();
//! let person = graph.put_entity_type("person")?;
//! let friend = graph.put_role_type("friend")?;
//! let friendship = graph.put_relation_type("friendship", &[friend.clone()])?;
//!
//! let alice = graph.add_entity(&person)?;
//! graph.insert_relation(Relation::new(&friendship).role_player(&friend, &alice))?;
//! graph.commit()?;
//! ```

pub mod concept;
pub mod error;
pub mod memory;
pub mod session;

pub use concept::{
    Concept, ConceptId, DataType, EntityType, Instance, RelationType, Resource, ResourceType,
    ResourceValue, RoleType,
};
pub use error::StoreError;
pub use memory::MemoryGraph;
pub use session::{GraphCounts, GraphSession, Relation, RelationRecord};

//! Errors returned by [`GraphSession`](crate::GraphSession) operations.

use crate::concept::{ConceptId, DataType};

/// Errors that graph store operations can return.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StoreError {
    /// No schema concept with this label (or not of the requested kind).
    #[error("unknown {kind} type: {label:?}")]
    UnknownType { kind: &'static str, label: String },

    /// A label is already used by a schema concept of a different kind.
    #[error("label {label:?} is already defined as a {existing} type")]
    TypeConflict { label: String, existing: &'static str },

    /// The referenced concept does not exist in this session.
    #[error("unknown concept: {0}")]
    UnknownConcept(ConceptId),

    /// The role is not declared by the relation type it was used with.
    #[error("role {role:?} is not declared by relation type {relation:?}")]
    RoleNotInRelation { role: String, relation: String },

    /// The same role was given more than one player in a single relation.
    #[error("role {0:?} is played more than once in the same relation")]
    DuplicateRole(String),

    /// A resource value does not match its resource type's data type.
    #[error("resource type {label:?} holds {expected} values, got {actual}")]
    DataTypeMismatch {
        label: String,
        expected: DataType,
        actual: DataType,
    },

    /// Commit-time validation failed; nothing was published.
    #[error("validation failed: {0}")]
    Validation(String),
}

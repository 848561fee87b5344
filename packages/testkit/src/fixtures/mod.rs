//! Deterministic graph fixtures.

pub mod path;

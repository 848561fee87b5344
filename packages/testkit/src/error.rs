//! Error types for the harness, the index resolver, and fixtures.

use std::time::Duration;

use grove_engine::EngineError;
use grove_store::StoreError;

/// Failures of [`ServiceContext`](crate::ServiceContext) and [`ephemeral_port`](crate::ephemeral_port).
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// No port could be bound at all; the host is out of ephemeral ports.
    #[error("unable to allocate an ephemeral port: {0}")]
    NoEphemeralPort(#[source] std::io::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A context manages exactly one run.
    #[error("service context has already been started")]
    AlreadyStarted,

    /// The engine still held its port when the shutdown timeout elapsed.
    #[error("service on port {port} still running after {waited:?}")]
    ShutdownTimeout { port: u16, waited: Duration },
}

/// Failures of [`IndexResolver`](crate::IndexResolver).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IndexError {
    #[error("no instance is indexed as {0:?}")]
    NotFound(String),

    /// More than one instance owns the label; the fixture is corrupt.
    #[error("{owners} instances are indexed as {label:?}")]
    Ambiguous { label: String, owners: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of graph fixture builders.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FixtureError {
    #[error("branching factor must be at least 1")]
    InvalidBranching,

    /// The requested tree has more nodes than fit in a `u64`.
    #[error("a tree of depth {depth} with branching factor {branching} is too large")]
    TooLarge { depth: u32, branching: u64 },

    /// The store already holds a fixture; builds never merge.
    #[error("store already contains a fixture rooted at {0:?}")]
    AlreadyPopulated(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

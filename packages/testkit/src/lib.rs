//! Shared helpers for Grove test suites.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`port`] | [`ephemeral_port`]: ask the OS for a currently-free port |
//! | [`context`] | [`ServiceContext`]: start/stop an in-process engine on that port |
//! | [`index`] | [`IndexResolver`]: unique string labels → graph instances |
//! | [`fixtures`] | Deterministic graph fixtures such as [`PathGraph`] |
//!
//! Everything here is synchronous. The engine runs its own runtime on a
//! background thread, so tests are plain `#[test]` functions and talk to the
//! engine with a blocking HTTP client.

pub mod context;
pub mod error;
pub mod fixtures;
pub mod index;
pub mod port;

pub use context::{Lifecycle, ServiceContext};
pub use error::{FixtureError, HarnessError, IndexError};
pub use fixtures::path::{PathGraph, PathGraphSummary};
pub use index::IndexResolver;
pub use port::ephemeral_port;

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`; safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove_testkit=info,grove_engine=info".into()),
        )
        .with_test_writer()
        .try_init();
}

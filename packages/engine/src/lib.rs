//! Public surface for the `grove-engine` crate.
//!
//! Exposes the [`Service`] lifecycle, the [`EngineConfig`] map, and the
//! standard wiring ([`configure_service`]) so that test harnesses can spin
//! up an in-process engine without spawning a subprocess.

pub mod config;
pub mod error;
pub mod middleware;
pub mod router;
pub mod service;

pub use config::EngineConfig;
pub use error::{ApiError, EngineError, ErrorResponse};
pub use middleware::auth::{Claims, TokenError, TokenValidator};
pub use router::configure_service;
pub use service::Service;

//! trackforge library
//!
//! Rewrites tracking events emitted in the new event format into the legacy
//! schema still read by downstream consumers. The pieces are exposed for the
//! ingestion service, integration tests and embedding applications.

pub mod api;
pub mod config;
pub mod emitter;
pub mod error;
pub mod logging;
pub mod models;
pub mod processors;
pub mod shim;
pub mod signals;
pub mod sink;
pub mod stats;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use emitter::Emitter;
pub use error::{Error, Result};

pub use models::{Event, UsageKey, ValidationError, ValidationErrorKind};
pub use processors::{Pipeline, ProcessOutcome, Processor};
pub use shim::{EventShim, PrefixRegistry, RegisteredShim, ShimError, ShimRegistry};
pub use sink::{EventSink, JsonLinesSink, MemorySink, TracingSink};
pub use stats::PipelineStats;

// Re-export API server functions
pub use api::server::{create_router, create_server, shutdown_signal};

// Re-export health check types
pub use api::{AppState, BuildInfo, ComponentHealth, HealthResponse, HealthStatus, ReadyResponse};

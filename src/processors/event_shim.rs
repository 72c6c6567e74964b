//! Pipeline stage applying the registered shim for each event

use std::sync::Arc;

use super::{ProcessOutcome, Processor};
use crate::error::Result;
use crate::models::Event;
use crate::shim::{ShimError, ShimRegistry};

/// Looks up the shim for the event name and applies it.
///
/// Events with no registered shim pass through untouched.
#[derive(Debug, Clone)]
pub struct EventShimProcessor {
    registry: Arc<ShimRegistry>,
}

impl EventShimProcessor {
    /// Dispatch through the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(ShimRegistry::global())
    }

    pub fn with_registry(registry: Arc<ShimRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ShimRegistry {
        &self.registry
    }
}

impl Default for EventShimProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for EventShimProcessor {
    fn name(&self) -> &'static str {
        "event_shim"
    }

    fn process(&self, event: &mut Event) -> Result<ProcessOutcome> {
        let shim = match self.registry.create_shim(event) {
            Ok(shim) => shim,
            Err(ShimError::NoMatchingShim(name)) => {
                tracing::trace!(name = %name, "No shim registered");
                return Ok(ProcessOutcome::Skipped);
            },
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(shim = shim.label(), "Applying shim");
        shim.shim(event)?;
        Ok(ProcessOutcome::Modified)
    }
}

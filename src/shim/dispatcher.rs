//! Shim registration and dispatch
//!
//! The built-in shims are listed in a static table and loaded into a
//! process-wide [`ShimRegistry`] the first time it is requested. After that
//! the registry is only read, so it can be shared across worker threads
//! without locking.

use std::sync::{Arc, OnceLock};

use super::registry::PrefixRegistry;
use super::sequence::{NextSelectedShim, PreviousSelectedShim, TabSelectedShim};
use super::video::VideoEventShim;
use super::{EventShim, RegisteredShim, ShimError};
use crate::models::Event;

/// Constructor for a registered shim
pub type ShimFactory = fn() -> Box<dyn EventShim>;

fn instantiate<S: RegisteredShim>() -> Box<dyn EventShim> {
    Box::new(S::default())
}

/// Shims available to every process
const BUILTIN_SHIMS: [(&str, ShimFactory); 4] = [
    (TabSelectedShim::SHIM_NAME, instantiate::<TabSelectedShim> as ShimFactory),
    (NextSelectedShim::SHIM_NAME, instantiate::<NextSelectedShim> as ShimFactory),
    (PreviousSelectedShim::SHIM_NAME, instantiate::<PreviousSelectedShim> as ShimFactory),
    (VideoEventShim::SHIM_NAME, instantiate::<VideoEventShim> as ShimFactory),
];

static GLOBAL_REGISTRY: OnceLock<Arc<ShimRegistry>> = OnceLock::new();

/// Event name → shim table
#[derive(Clone, Default)]
pub struct ShimRegistry {
    shims: PrefixRegistry<ShimFactory>,
}

impl ShimRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in shims
    pub fn with_builtin_shims() -> Self {
        Self {
            shims: BUILTIN_SHIMS.into_iter().collect(),
        }
    }

    /// The process-wide registry, built on first use
    pub fn global() -> Arc<ShimRegistry> {
        GLOBAL_REGISTRY
            .get_or_init(|| {
                let registry = Self::with_builtin_shims();
                tracing::info!(shims = ?registry.names(), "Shim registry initialized");
                Arc::new(registry)
            })
            .clone()
    }

    /// Whether the process-wide registry has been built
    pub fn is_global_initialized() -> bool {
        GLOBAL_REGISTRY.get().is_some()
    }

    /// Add a shim under its declared name
    pub fn register<S: RegisteredShim>(&mut self) -> Result<(), ShimError> {
        if self.shims.is_registered(S::SHIM_NAME) {
            return Err(ShimError::DuplicateRegistration(S::SHIM_NAME.to_string()));
        }
        self.shims.set(S::SHIM_NAME, instantiate::<S> as ShimFactory);
        Ok(())
    }

    /// Build the shim responsible for `event`
    pub fn create_shim(&self, event: &Event) -> Result<Box<dyn EventShim>, ShimError> {
        let name = event
            .name()
            .ok_or_else(|| ShimError::NoMatchingShim(String::new()))?;
        let factory = self.shims.get(name)?;
        Ok(factory())
    }

    /// Registered names and prefixes
    pub fn names(&self) -> Vec<&str> {
        self.shims.keys()
    }

    pub fn len(&self) -> usize {
        self.shims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shims.is_empty()
    }
}

impl std::fmt::Debug for ShimRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShimRegistry")
            .field("names", &self.names())
            .finish()
    }
}

//! Event shims
//!
//! A shim rewrites one family of events into the form legacy consumers
//! expect. Shims are stateless: the dispatcher picks one by event name and
//! the shim is applied to the event with [`EventShim::shim`].
//!
//! Every shim follows the same sequence:
//!
//! 1. if [`EventShim::is_legacy_event`] holds, `event_type` is set to
//!    [`EventShim::legacy_event_type`] and
//!    [`EventShim::process_legacy_fields`] runs;
//! 2. [`EventShim::process_event`] always runs afterwards.
//!
//! Shims that should be reachable by name implement [`RegisteredShim`].
//! Names ending in `.` are prefix shims; see [`registry`] for how names are
//! resolved.

pub mod dispatcher;
pub mod registry;
pub mod sequence;
pub mod video;

pub use dispatcher::{ShimFactory, ShimRegistry};
pub use registry::{PrefixRegistry, RegistryError};
pub use sequence::{NextSelectedShim, PreviousSelectedShim, TabSelectedShim};
pub use video::VideoEventShim;

use thiserror::Error;

use crate::models::{Event, ValidationError};

/// Top-level key holding the legacy event type
pub const EVENT_TYPE: &str = "event_type";

/// Errors raised while resolving or applying a shim
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShimError {
    /// No shim is registered for the event's name
    #[error("No shim registered for event '{0}'")]
    NoMatchingShim(String),

    /// A shim is missing part of its contract
    #[error("{shim} does not implement {member}")]
    NotImplemented {
        shim: &'static str,
        member: &'static str,
    },

    /// Two shims claimed the same name
    #[error("A shim is already registered as '{0}'")]
    DuplicateRegistration(String),

    /// The event lacks a field the shim needs
    #[error(transparent)]
    Field(#[from] ValidationError),
}

impl From<RegistryError> for ShimError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(name) => ShimError::NoMatchingShim(name),
        }
    }
}

/// Legacy-compatibility rewrite for a family of events
pub trait EventShim: Send + Sync {
    /// Name used in logs and errors
    fn label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether legacy fields must be injected into this event
    fn is_legacy_event(&self, _event: &Event) -> Result<bool, ShimError> {
        Ok(false)
    }

    /// Value written to `event_type` for legacy events
    fn legacy_event_type(&self, _event: &Event) -> Result<&'static str, ShimError> {
        Err(ShimError::NotImplemented {
            shim: self.label(),
            member: "legacy_event_type",
        })
    }

    /// Rewrite the payload for legacy consumers; runs only for legacy events
    fn process_legacy_fields(&self, _event: &mut Event) -> Result<(), ShimError> {
        Ok(())
    }

    /// Unconditional rewrite; runs after any legacy processing
    fn process_event(&self, _event: &mut Event) -> Result<(), ShimError> {
        Ok(())
    }

    /// Apply the shim to `event`
    fn shim(&self, event: &mut Event) -> Result<(), ShimError> {
        if self.is_legacy_event(event)? {
            let legacy_type = self.legacy_event_type(event)?;
            event.insert(EVENT_TYPE, legacy_type);
            self.process_legacy_fields(event)?;
        }
        self.process_event(event)
    }
}

/// A shim bound to an event name or name prefix
pub trait RegisteredShim: EventShim + Default + 'static {
    /// Exact event name, or a prefix ending in `.`
    const SHIM_NAME: &'static str;
}

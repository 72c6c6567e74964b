//! Data models for trackforge
//!
//! The event value that flows through the pipeline, field-level validation
//! errors, payload field readers and course usage keys.

pub mod error;
pub mod event;
pub mod usage_key;
pub mod validation;

// Re-export commonly used types
pub use error::{ValidationError, ValidationErrorKind, ValidationErrors, ValidationResult};
pub use event::Event;
pub use usage_key::{UsageKey, UsageKeyError};

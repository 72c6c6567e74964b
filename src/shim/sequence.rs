//! Shims for courseware sequence navigation
//!
//! The new navigation events describe tab selection with `current_tab`,
//! `target_tab` and `tab_count`. Legacy consumers expect the older
//! `seq_goto` / `seq_next` / `seq_prev` events with `old` and `new` tab
//! numbers in the payload.

use serde_json::Value;

use super::{EventShim, RegisteredShim, ShimError};
use crate::models::validation::{require_i64, require_value};
use crate::models::{Event, ValidationError};

const CURRENT_TAB: &str = "current_tab";
const TARGET_TAB: &str = "target_tab";
const TAB_COUNT: &str = "tab_count";
const OLD: &str = "old";
const NEW: &str = "new";

/// `edx.ui.lms.sequence.tab_selected` → `seq_goto`
#[derive(Debug, Default, Clone, Copy)]
pub struct TabSelectedShim;

impl EventShim for TabSelectedShim {
    fn label(&self) -> &'static str {
        "TabSelectedShim"
    }

    fn is_legacy_event(&self, _event: &Event) -> Result<bool, ShimError> {
        Ok(true)
    }

    fn legacy_event_type(&self, _event: &Event) -> Result<&'static str, ShimError> {
        Ok("seq_goto")
    }

    fn process_legacy_fields(&self, event: &mut Event) -> Result<(), ShimError> {
        event
            .edit_payload(|payload| {
                let current = require_value(payload, CURRENT_TAB)?.clone();
                let target = require_value(payload, TARGET_TAB)?.clone();
                payload.insert(OLD.to_string(), current);
                payload.insert(NEW.to_string(), target);
                Ok(())
            })?
            .ok_or_else(|| ValidationError::missing(crate::models::event::PAYLOAD))?;
        Ok(())
    }
}

impl RegisteredShim for TabSelectedShim {
    const SHIM_NAME: &'static str = "edx.ui.lms.sequence.tab_selected";
}

/// Shared behaviour of the next/previous navigation shims.
///
/// Navigation that leaves the sequence has no legacy counterpart, so those
/// events are passed on without legacy fields.
trait LinearSequenceShim {
    /// Tab offset applied by the navigation
    const OFFSET: i64;

    /// Whether this navigation leaves the current sequence
    fn crosses_boundary(&self, payload: &serde_json::Map<String, Value>) -> Result<bool, ValidationError>;

    fn is_legacy(&self, event: &Event) -> Result<bool, ShimError> {
        let payload = event
            .decode_payload()?
            .ok_or_else(|| ValidationError::missing(crate::models::event::PAYLOAD))?;
        Ok(!self.crosses_boundary(&payload)?)
    }

    fn rewrite_tabs(&self, event: &mut Event) -> Result<(), ShimError> {
        event
            .edit_payload(|payload| {
                let new = require_i64(payload, CURRENT_TAB)?
                    .checked_add(Self::OFFSET)
                    .ok_or_else(|| ValidationError::wrong_type(CURRENT_TAB, "an integer in range"))?;
                let old = require_value(payload, CURRENT_TAB)?.clone();
                payload.insert(OLD.to_string(), old);
                payload.insert(NEW.to_string(), Value::from(new));
                Ok(())
            })?
            .ok_or_else(|| ValidationError::missing(crate::models::event::PAYLOAD))?;
        Ok(())
    }
}

/// `edx.ui.lms.sequence.next_selected` → `seq_next`
#[derive(Debug, Default, Clone, Copy)]
pub struct NextSelectedShim;

impl LinearSequenceShim for NextSelectedShim {
    const OFFSET: i64 = 1;

    fn crosses_boundary(&self, payload: &serde_json::Map<String, Value>) -> Result<bool, ValidationError> {
        Ok(require_i64(payload, CURRENT_TAB)? == require_i64(payload, TAB_COUNT)?)
    }
}

impl EventShim for NextSelectedShim {
    fn label(&self) -> &'static str {
        "NextSelectedShim"
    }

    fn is_legacy_event(&self, event: &Event) -> Result<bool, ShimError> {
        self.is_legacy(event)
    }

    fn legacy_event_type(&self, _event: &Event) -> Result<&'static str, ShimError> {
        Ok("seq_next")
    }

    fn process_legacy_fields(&self, event: &mut Event) -> Result<(), ShimError> {
        self.rewrite_tabs(event)
    }
}

impl RegisteredShim for NextSelectedShim {
    const SHIM_NAME: &'static str = "edx.ui.lms.sequence.next_selected";
}

/// `edx.ui.lms.sequence.previous_selected` → `seq_prev`
#[derive(Debug, Default, Clone, Copy)]
pub struct PreviousSelectedShim;

impl LinearSequenceShim for PreviousSelectedShim {
    const OFFSET: i64 = -1;

    fn crosses_boundary(&self, payload: &serde_json::Map<String, Value>) -> Result<bool, ValidationError> {
        Ok(require_i64(payload, CURRENT_TAB)? == 1)
    }
}

impl EventShim for PreviousSelectedShim {
    fn label(&self) -> &'static str {
        "PreviousSelectedShim"
    }

    fn is_legacy_event(&self, event: &Event) -> Result<bool, ShimError> {
        self.is_legacy(event)
    }

    fn legacy_event_type(&self, _event: &Event) -> Result<&'static str, ShimError> {
        Ok("seq_prev")
    }

    fn process_legacy_fields(&self, event: &mut Event) -> Result<(), ShimError> {
        self.rewrite_tabs(event)
    }
}

impl RegisteredShim for PreviousSelectedShim {
    const SHIM_NAME: &'static str = "edx.ui.lms.sequence.previous_selected";
}

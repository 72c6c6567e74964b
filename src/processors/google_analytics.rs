//! Annotations required by the Google Analytics integration

use serde_json::Value;

use super::{ProcessOutcome, Processor};
use crate::error::Result;
use crate::models::Event;

/// Adds the `label` and `nonInteraction` fields Google Analytics expects.
///
/// Analytics sinks receive an annotated copy; the canonical event is never
/// touched by this processor outside of an explicit [`Processor::process`]
/// call.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleAnalyticsProcessor;

impl GoogleAnalyticsProcessor {
    /// Annotated copy of `event`
    pub fn annotate(&self, event: &Event) -> Event {
        let mut copy = event.clone();
        if let Some(course_id) = event.context().and_then(|c| c.get("course_id")) {
            if !course_id.is_null() {
                copy.insert("label", course_id.clone());
            }
        }
        // Events emitted by the platform never count towards bounce rate
        copy.insert("nonInteraction", Value::from(1));
        copy
    }
}

impl Processor for GoogleAnalyticsProcessor {
    fn name(&self) -> &'static str {
        "google_analytics"
    }

    fn process(&self, event: &mut Event) -> Result<ProcessOutcome> {
        *event = self.annotate(event);
        Ok(ProcessOutcome::Modified)
    }
}

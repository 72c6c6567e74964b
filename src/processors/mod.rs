//! Event processors
//!
//! Each processor is one stage of the canonical pipeline. Stages run in a
//! fixed order and each one sees the event as left by the previous stage:
//!
//! 1. [`LegacyFieldMappingProcessor`] promotes context fields and
//!    normalizes the payload and timestamps;
//! 2. [`VideoEventProcessor`] rewrites mobile video events;
//! 3. [`EventShimProcessor`] applies the shim registered for the event name.
//!
//! [`GoogleAnalyticsProcessor`] is not part of the canonical pipeline; it
//! produces annotated copies for analytics sinks only.

pub mod event_shim;
pub mod google_analytics;
pub mod legacy_fields;
pub mod video;

pub use event_shim::EventShimProcessor;
pub use google_analytics::GoogleAnalyticsProcessor;
pub use legacy_fields::{LegacyFieldMappingProcessor, CONTEXT_FIELDS_TO_INCLUDE};
pub use video::VideoEventProcessor;

use std::sync::Arc;

use crate::config::ProcessingConfig;
use crate::error::Result;
use crate::logging::Timer;
use crate::models::Event;
use crate::stats::PipelineStats;

/// What a processor did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The processor rewrote the event
    Modified,
    /// The processor does not apply to this event and left it untouched
    Skipped,
}

/// One stage of event processing
pub trait Processor: Send + Sync {
    /// Stage name used in logs and metrics
    fn name(&self) -> &'static str;

    /// Process `event` in place
    fn process(&self, event: &mut Event) -> Result<ProcessOutcome>;
}

/// Ordered chain of processors
#[derive(Default)]
pub struct Pipeline {
    processors: Vec<Box<dyn Processor>>,
    stats: Option<Arc<PipelineStats>>,
}

impl Pipeline {
    /// An empty pipeline that returns events unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Field mapping, video rewrite and shim dispatch, in that order
    pub fn canonical() -> Self {
        Self::new()
            .with_processor(LegacyFieldMappingProcessor)
            .with_processor(VideoEventProcessor)
            .with_processor(EventShimProcessor::new())
    }

    /// The canonical pipeline minus the stages disabled in `config`
    pub fn from_config(config: &ProcessingConfig) -> Self {
        let mut pipeline = Self::new().with_processor(LegacyFieldMappingProcessor);
        if config.enable_video_processor {
            pipeline = pipeline.with_processor(VideoEventProcessor);
        }
        if config.enable_event_shims {
            pipeline = pipeline.with_processor(EventShimProcessor::new());
        }
        pipeline
    }

    /// Append a stage
    pub fn with_processor<P: Processor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Record stage outcomes into `stats`
    pub fn with_stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Stage names in execution order
    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run every stage over `event`
    pub fn process(&self, mut event: Event) -> Result<Event> {
        let span = crate::event_span!(event.name().unwrap_or_default());
        let _guard = span.enter();
        let timer = Timer::start("pipeline");

        for processor in &self.processors {
            match processor.process(&mut event) {
                Ok(outcome) => {
                    if let Some(stats) = &self.stats {
                        stats.record_stage(processor.name(), outcome);
                    }
                },
                Err(err) => {
                    crate::log_error!(err, "Processor failed", stage = processor.name());
                    if let Some(stats) = &self.stats {
                        stats.record_failed();
                    }
                    return Err(err);
                },
            }
        }

        if let Some(event_type) = event.get(crate::shim::EVENT_TYPE).and_then(|v| v.as_str()) {
            span.record("event_type", event_type);
        }
        timer.stop();
        Ok(event)
    }

    /// Process each event independently
    pub fn process_batch(&self, events: Vec<Event>) -> Vec<Result<Event>> {
        events.into_iter().map(|event| self.process(event)).collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("processors", &self.processor_names())
            .finish()
    }
}
